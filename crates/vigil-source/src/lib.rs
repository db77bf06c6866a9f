//! The consumed boundary between the health engine and whatever collects
//! metrics: windowed aggregation queries, topology discovery and
//! per-entity collection metadata.
//!
//! The engine only ever talks to a [`MetricSource`]; [`memory::MemorySource`]
//! is the in-process implementation used by tests and embedders that feed
//! samples directly.

pub mod error;
pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::broadcast;
use vigil_common::pattern::SimplePattern;
use vigil_common::types::{Aggregation, Alignment, DimensionMatch, Entity};

pub use error::{Result, SourceError};

/// A topology change pushed to subscribers.
#[derive(Debug, Clone)]
pub enum TopologyEvent {
    EntityAppeared(Entity),
    EntityRemoved(String),
}

/// One windowed aggregation request.
#[derive(Debug, Clone)]
pub struct LookupQuery {
    pub entity_id: String,
    /// Dimension filter, matched by name or id per `dimension_match`.
    pub dimensions: SimplePattern,
    pub dimension_match: DimensionMatch,
    pub window_secs: u64,
    pub alignment: Alignment,
    pub aggregation: Aggregation,
    /// Fewer matching samples than this yields [`LookupResult::NoData`].
    pub min_samples: usize,
    /// Query instant the window is anchored to.
    pub now: DateTime<Utc>,
}

/// Outcome of a lookup: one scalar, or a distinguished "no data" marker
/// that the engine maps to UNDEFINED (never a numeric zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookupResult {
    Value(f64),
    NoData,
}

/// The metric/topology source the engine consumes.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Current topology snapshot.
    async fn entities(&self) -> Vec<Entity>;

    /// Subscribe to topology changes.
    fn subscribe(&self) -> broadcast::Receiver<TopologyEvent>;

    /// Execute one windowed aggregation. May suspend on I/O; the engine
    /// bounds it with a timeout.
    async fn query(&self, query: &LookupQuery) -> Result<LookupResult>;

    /// When the entity's metric was last collected.
    async fn last_collected(&self, entity_id: &str) -> Option<DateTime<Utc>>;

    /// Latest collected value per dimension, resolvable from formulas as
    /// `$<dimension>`.
    async fn latest_values(&self, entity_id: &str) -> HashMap<String, f64>;
}
