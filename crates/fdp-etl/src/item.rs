//! Work items
//!
//! A [`WorkItem`] is the unit of ETL work: how to fetch a payload, where its
//! raw bytes are cached, and where the transformed rows are loaded. Items are
//! created by dataset configuration or by a fan-out callback during extract,
//! and are consumed exactly once by the orchestrator.

use std::collections::HashMap;

use crate::fetch::Fetcher;
use crate::store::CacheStore;

/// Recognized metadata keys
///
/// The metadata bag is open, but these keys have meaning to the core and the
/// dataset drivers.
pub mod meta {
    /// `bool`: force a refetch under [`ReplaceOnFlagStrategy`](crate::strategy::ReplaceOnFlagStrategy)
    pub const REPLACE: &str = "replace";
    /// `string`: season label carried between pipeline stages
    pub const SEASON: &str = "season";
    /// `string`: item kind discriminator for fan-out callbacks
    pub const KIND: &str = "kind";
}

/// Conflict handling for the load phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// `DO UPDATE SET col = EXCLUDED.col, ...`
    Update,
    /// `DO NOTHING`
    Nothing,
}

/// A named uniqueness constraint and what to do when it fires
///
/// Constraint name and action always travel together; a destination without
/// a `Conflict` is a plain insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub constraint: String,
    pub action: ConflictAction,
}

impl Conflict {
    pub fn update(constraint: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            action: ConflictAction::Update,
        }
    }

    pub fn nothing(constraint: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            action: ConflictAction::Nothing,
        }
    }
}

/// Load destination: schema-qualified table plus optional conflict handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub schema: String,
    pub table: String,
    pub conflict: Option<Conflict>,
}

impl Destination {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            conflict: None,
        }
    }

    pub fn with_conflict(mut self, conflict: Conflict) -> Self {
        self.conflict = Some(conflict);
        self
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One fetchable, cacheable, loadable unit of work
pub struct WorkItem {
    /// Retrieves raw bytes from the remote source
    pub fetcher: Box<dyn Fetcher>,
    /// Durable cache for the raw payload
    pub store: Box<dyn CacheStore>,
    /// Where transformed rows are loaded; `None` for cache-only items
    pub destination: Option<Destination>,
    /// Open key-value bag for out-of-band flags between stages
    pub meta: HashMap<String, serde_json::Value>,
}

impl WorkItem {
    pub fn new(fetcher: Box<dyn Fetcher>, store: Box<dyn CacheStore>) -> Self {
        Self {
            fetcher,
            store,
            destination: None,
            meta: HashMap::new(),
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Identity used in logs: the cache key
    pub fn label(&self) -> String {
        self.store.key()
    }

    /// The `replace` metadata flag, false when absent or not a bool
    pub fn replace_flag(&self) -> bool {
        self.meta
            .get(meta::REPLACE)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// The `season` metadata label, if present
    pub fn season(&self) -> Option<&str> {
        self.meta.get(meta::SEASON).and_then(serde_json::Value::as_str)
    }

    /// The `kind` metadata discriminator, if present
    pub fn kind(&self) -> Option<&str> {
        self.meta.get(meta::KIND).and_then(serde_json::Value::as_str)
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("store", &self.store.key())
            .field("destination", &self.destination)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
