//! Correlation store shared by the two passes.
//!
//! Binding discovery seeds the store with bindings and the consumer/filter
//! names they reference. Detail correlation then fills in the detail sets for
//! those names. Overlapping windows see the same record many times, so detail
//! sets are keyed by a content hash of the record.

use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One `__FilterToConsumerBinding` identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BindingRecord {
    pub id: String,
    pub consumer_name: String,
    pub filter_name: String,
}

impl BindingRecord {
    pub fn new(consumer_name: &str, filter_name: &str) -> Self {
        Self {
            id: binding_id(consumer_name, filter_name),
            consumer_name: consumer_name.to_string(),
            filter_name: filter_name.to_string(),
        }
    }
}

pub fn binding_id(consumer_name: &str, filter_name: &str) -> String {
    format!("{}-{}", consumer_name, filter_name)
}

/// Structured `CommandLineEventConsumer` record.
///
/// Fields are declared in key order so the serialized form is canonical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CommandLineConsumer {
    pub consumer_arguments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_name: Option<String>,
    pub consumer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

/// A consumer entry as reported for a binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ConsumerDetail {
    CommandLine(CommandLineConsumer),
    /// `type ~ name ~ field ~ field` for consumer classes without a known layout.
    Composite(String),
    /// Bare consumer name, reported when no record was recovered.
    Unresolved(String),
}

impl ConsumerDetail {
    pub fn composite(consumer_type: &str, name: &str, first: &str, second: &str) -> Self {
        ConsumerDetail::Composite(format!(
            "{} ~ {} ~ {} ~ {}",
            consumer_type, name, first, second
        ))
    }
}

/// One `__EventFilter` record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FilterDetail {
    pub filter_name: String,
    pub filter_query: String,
}

/// Hex blake3 digest of a record's JSON form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of<T: Serialize>(record: &T) -> Result<Self> {
        let canonical = serde_json::to_vec(record)?;
        Ok(Self(blake3::hash(&canonical).to_hex().to_string()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records recovered for one name, deduplicated by content.
#[derive(Debug, Clone)]
pub struct DetailSet<T> {
    entries: BTreeMap<ContentHash, T>,
}

impl<T> Default for DetailSet<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Serialize> DetailSet<T> {
    /// Insert `record`; returns false when identical content was already present.
    pub fn insert(&mut self, record: T) -> Result<bool> {
        let key = ContentHash::of(&record)?;
        if self.entries.contains_key(&key) {
            tracing::trace!(hash = %key, "Collapsed duplicate record");
            return Ok(false);
        }
        self.entries.insert(key, record);
        Ok(true)
    }
}

impl<T> DetailSet<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Ord + Clone> DetailSet<T> {
    /// Records in their natural order, independent of hash order.
    pub fn sorted(&self) -> Vec<T> {
        let mut records: Vec<T> = self.entries.values().cloned().collect();
        records.sort();
        records
    }
}

/// Everything learned about bindings during one run.
#[derive(Debug, Clone, Default)]
pub struct CorrelationStore {
    bindings: BTreeMap<String, BindingRecord>,
    consumers: BTreeMap<String, DetailSet<ConsumerDetail>>,
    filters: BTreeMap<String, DetailSet<FilterDetail>>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding and seed empty detail sets for its names.
    ///
    /// Returns false when the binding id was already known.
    pub fn record_binding(&mut self, consumer_name: &str, filter_name: &str) -> bool {
        self.consumers.entry(consumer_name.to_string()).or_default();
        self.filters.entry(filter_name.to_string()).or_default();

        let record = BindingRecord::new(consumer_name, filter_name);
        if self.bindings.contains_key(&record.id) {
            return false;
        }
        self.bindings.insert(record.id.clone(), record);
        true
    }

    pub fn add_consumer_detail(&mut self, consumer_name: &str, detail: ConsumerDetail) -> Result<bool> {
        self.consumers
            .entry(consumer_name.to_string())
            .or_default()
            .insert(detail)
    }

    pub fn add_filter_detail(&mut self, filter_name: &str, detail: FilterDetail) -> Result<bool> {
        self.filters
            .entry(filter_name.to_string())
            .or_default()
            .insert(detail)
    }

    /// Bindings ordered by id.
    pub fn bindings(&self) -> impl Iterator<Item = &BindingRecord> {
        self.bindings.values()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn consumer_names(&self) -> impl Iterator<Item = &str> {
        self.consumers.keys().map(String::as_str)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn consumer_details(&self, consumer_name: &str) -> Option<&DetailSet<ConsumerDetail>> {
        self.consumers.get(consumer_name)
    }

    pub fn filter_details(&self, filter_name: &str) -> Option<&DetailSet<FilterDetail>> {
        self.filters.get(filter_name)
    }
}
