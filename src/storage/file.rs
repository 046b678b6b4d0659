//! Directory-backed session storage.

use super::SessionStorage;
use crate::error::{Result, WatchError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for value files.
const VALUE_MAGIC: &[u8; 4] = b"RWS\0";

/// Current value file format version.
const VALUE_VERSION: u8 = 1;

/// Session storage kept as one file per key.
///
/// Each file holds magic, version, payload length, payload and a CRC32 of
/// the payload. The directory is locked exclusively for the lifetime of
/// the handle, so two hosts never interleave writes to the same session.
pub struct FileStorage {
    /// Directory holding the value files.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let lock_file = Self::acquire_lock(&path)?;

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove every stored value, keeping the directory and its lock.
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.path().extension().map_or(false, |ext| ext == "val") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| WatchError::Locked)?;

        Ok(lock_file)
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{}.val", encode_key(key)))
    }

    fn read_value(file: &mut File) -> Result<Vec<u8>> {
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != VALUE_MAGIC {
            return Err(WatchError::Corruption("Invalid value file magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != VALUE_VERSION {
            return Err(WatchError::Corruption(format!(
                "Unsupported value file version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; len];
        file.read_exact(&mut payload)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&payload);

        if stored_checksum != computed_checksum {
            return Err(WatchError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        Ok(payload)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match File::open(self.value_path(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Self::read_value(&mut file).map(Some)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let final_path = self.value_path(key);
        let tmp_path = final_path.with_extension("tmp");

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;

        file.write_all(VALUE_MAGIC)?;
        file.write_all(&[VALUE_VERSION])?;
        file.write_all(&(value.len() as u64).to_le_bytes())?;
        file.write_all(value)?;
        file.write_all(&crc32fast::hash(value).to_le_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &final_path)?;
        tracing::trace!(key, bytes = value.len(), "stored session value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Escape a storage key into a flat file name.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{:02x}", b));
        }
    }
    out
}
