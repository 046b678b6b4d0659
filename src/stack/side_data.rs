//! Ephemeral per-page data supplied by lazy producers.

use crate::error::WatchError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Error type a producer may fail with.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync>;

type ProducerFn = dyn Fn() -> std::result::Result<Value, ProducerError> + Send + Sync;

/// Outcome of running one producer.
#[derive(Clone, Debug, PartialEq)]
pub enum Produced {
    Ok(Value),
    Failed(String),
}

impl Produced {
    /// Collapse to the read-side value: failures read as `null`.
    pub fn into_value(self) -> Value {
        match self {
            Produced::Ok(value) => value,
            Produced::Failed(_) => Value::Null,
        }
    }
}

/// A zero-argument producer invoked every time the data is read.
#[derive(Clone)]
pub struct Producer {
    f: Arc<ProducerFn>,
}

impl Producer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> std::result::Result<Value, ProducerError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Run the producer; a failure is logged and reported, never propagated.
    pub fn produce(&self, key: &str) -> Produced {
        match (self.f)() {
            Ok(value) => Produced::Ok(value),
            Err(e) => {
                let error = WatchError::Producer(e.to_string());
                tracing::error!(key, %error, "page data read as null");
                Produced::Failed(e.to_string())
            }
        }
    }
}

/// Page data keyed by name. Never persisted.
#[derive(Clone, Default)]
pub struct SideData {
    producers: BTreeMap<String, Producer>,
}

impl SideData {
    pub fn insert(&mut self, key: impl Into<String>, producer: Producer) {
        self.producers.insert(key.into(), producer);
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.producers.keys().map(String::as_str)
    }

    /// Run one producer. `None` if nothing was attached under `key`.
    pub fn produce(&self, key: &str) -> Option<Produced> {
        self.producers.get(key).map(|p| p.produce(key))
    }

    /// Value for `key`, `null` if its producer failed.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.produce(key).map(Produced::into_value)
    }

    /// Every value, each key evaluated independently.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.producers
            .iter()
            .map(|(key, producer)| (key.clone(), producer.produce(key).into_value()))
            .collect()
    }
}

impl fmt::Debug for SideData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.producers.keys()).finish()
    }
}

/// Producers are opaque, so two side data sets compare by key set.
impl PartialEq for SideData {
    fn eq(&self, other: &Self) -> bool {
        self.producers.keys().eq(other.producers.keys())
    }
}
