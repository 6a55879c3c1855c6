//! Per-resource cache entries and their freshness state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::domain::resource::Resource;

/// The materialized public shape of a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Key/value view used by `settings`.
    Mapping(Map<String, Value>),
    /// Ordered records used by every other resource.
    Records(Vec<Value>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Mapping(map) => map.len(),
            Payload::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_records(&self) -> Option<&[Value]> {
        match self {
            Payload::Records(records) => Some(records),
            Payload::Mapping(_) => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Mapping(map) => Some(map),
            Payload::Records(_) => None,
        }
    }
}

/// Why an entry can or cannot be served from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Never populated, invalidated, or populated with an empty collection.
    Empty,
    Fresh,
    /// Populated but older than the freshness window.
    Stale,
}

impl EntryState {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryState::Empty => "empty",
            EntryState::Fresh => "fresh",
            EntryState::Stale => "stale",
        }
    }
}

/// Last known-good snapshot of one resource.
#[derive(Debug)]
pub struct CacheEntry {
    resource: Resource,
    payload: Option<Arc<Payload>>,
    fetched_at: Option<Instant>,
    generation: u64,
}

impl CacheEntry {
    pub(crate) fn empty(resource: Resource) -> Self {
        Self {
            resource,
            payload: None,
            fetched_at: None,
            generation: 0,
        }
    }

    /// Invalidation counter; a fetch may only install under the generation it started with.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// An empty payload reads as `Empty` even right after a fetch, so an empty
    /// settings mapping is re-fetched on every read rather than served from memory.
    pub fn state(&self, now: Instant, window: Duration) -> EntryState {
        match (&self.payload, self.fetched_at) {
            (Some(payload), Some(fetched_at)) if !payload.is_empty() => {
                if now.saturating_duration_since(fetched_at) < window {
                    EntryState::Fresh
                } else {
                    EntryState::Stale
                }
            }
            _ => EntryState::Empty,
        }
    }

    pub(crate) fn fresh_payload(&self, now: Instant, window: Duration) -> Option<Arc<Payload>> {
        match self.state(now, window) {
            EntryState::Fresh => self.payload.clone(),
            EntryState::Empty | EntryState::Stale => None,
        }
    }

    pub(crate) fn install(&mut self, payload: Arc<Payload>, fetched_at: Instant) {
        self.payload = Some(payload);
        self.fetched_at = Some(fetched_at);
    }

    pub(crate) fn clear(&mut self) {
        self.payload = None;
        self.fetched_at = None;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn snapshot(&self, now: Instant, window: Duration) -> EntrySnapshot {
        EntrySnapshot {
            resource: self.resource,
            state: self.state(now, window),
            items: self.payload.as_ref().map_or(0, |payload| payload.len()),
            age_ms: self
                .fetched_at
                .map(|fetched_at| now.saturating_duration_since(fetched_at).as_millis() as u64),
        }
    }
}

/// Diagnostic view of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    pub resource: Resource,
    pub state: EntryState,
    pub items: usize,
    pub age_ms: Option<u64>,
}
