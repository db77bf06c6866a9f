//! In-memory metric source backed by per-dimension ring buffers.

use crate::{LookupQuery, LookupResult, MetricSource, Result, SourceError, TopologyEvent};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::{broadcast, RwLock};
use vigil_common::types::{Aggregation, Alignment, Entity};

#[derive(Debug, Clone, Copy)]
struct Sample {
    timestamp: DateTime<Utc>,
    value: f64,
}

struct EntityState {
    entity: Entity,
    samples: HashMap<String, VecDeque<Sample>>,
    last_collected: Option<DateTime<Utc>>,
}

/// Metric source holding samples in memory, evicting anything older than
/// the retention window. Feeds the engine in tests and in embedders that
/// push samples directly.
pub struct MemorySource {
    inner: RwLock<HashMap<String, EntityState>>,
    events: broadcast::Sender<TopologyEvent>,
    retention_secs: i64,
}

impl MemorySource {
    pub fn new(retention_secs: u64) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(HashMap::new()),
            events,
            retention_secs: retention_secs as i64,
        }
    }

    /// Register an entity and announce it to subscribers. Re-adding an
    /// existing id replaces its descriptor but keeps its samples.
    pub async fn add_entity(&self, entity: Entity) {
        let mut inner = self.inner.write().await;
        let id = entity.id.clone();
        inner
            .entry(id)
            .and_modify(|state| state.entity = entity.clone())
            .or_insert_with(|| EntityState {
                entity: entity.clone(),
                samples: HashMap::new(),
                last_collected: None,
            });
        drop(inner);
        tracing::debug!(entity_id = %entity.id, context = %entity.context, "Entity registered");
        let _ = self.events.send(TopologyEvent::EntityAppeared(entity));
    }

    /// Drop an entity and announce its removal.
    pub async fn remove_entity(&self, entity_id: &str) {
        let mut inner = self.inner.write().await;
        if inner.remove(entity_id).is_some() {
            drop(inner);
            tracing::debug!(entity_id, "Entity removed");
            let _ = self
                .events
                .send(TopologyEvent::EntityRemoved(entity_id.to_string()));
        }
    }

    /// Record one sample for a dimension of an entity.
    pub async fn record(
        &self,
        entity_id: &str,
        dimension: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner
            .get_mut(entity_id)
            .ok_or_else(|| SourceError::UnknownEntity(entity_id.to_string()))?;

        let window = state
            .samples
            .entry(dimension.to_string())
            .or_insert_with(VecDeque::new);
        window.push_back(Sample { timestamp, value });

        let cutoff = timestamp - Duration::seconds(self.retention_secs);
        while let Some(front) = window.front() {
            if front.timestamp < cutoff {
                window.pop_front();
            } else {
                break;
            }
        }

        state.last_collected = Some(match state.last_collected {
            Some(prev) => prev.max(timestamp),
            None => timestamp,
        });
        Ok(())
    }
}

#[async_trait]
impl MetricSource for MemorySource {
    async fn entities(&self) -> Vec<Entity> {
        let inner = self.inner.read().await;
        inner.values().map(|state| state.entity.clone()).collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<TopologyEvent> {
        self.events.subscribe()
    }

    async fn query(&self, query: &LookupQuery) -> Result<LookupResult> {
        let inner = self.inner.read().await;
        let state = inner
            .get(&query.entity_id)
            .ok_or_else(|| SourceError::UnknownEntity(query.entity_id.clone()))?;

        let (start, end) = window_bounds(query);

        // Dimension names double as ids here; both match modes see the
        // same key space.
        let mut values: Vec<f64> = Vec::new();
        for (dimension, samples) in &state.samples {
            if !query.dimensions.matches(dimension) {
                continue;
            }
            for sample in samples {
                if sample.timestamp > start && sample.timestamp <= end {
                    values.push(sample.value);
                }
            }
        }

        if values.len() < query.min_samples.max(1) {
            return Ok(LookupResult::NoData);
        }

        let value = match query.aggregation {
            Aggregation::Average => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Last => *values.last().unwrap_or(&0.0),
        };
        Ok(LookupResult::Value(value))
    }

    async fn last_collected(&self, entity_id: &str) -> Option<DateTime<Utc>> {
        let inner = self.inner.read().await;
        inner.get(entity_id).and_then(|state| state.last_collected)
    }

    async fn latest_values(&self, entity_id: &str) -> HashMap<String, f64> {
        let inner = self.inner.read().await;
        let Some(state) = inner.get(entity_id) else {
            return HashMap::new();
        };
        state
            .samples
            .iter()
            .filter_map(|(dimension, samples)| {
                samples.back().map(|s| (dimension.clone(), s.value))
            })
            .collect()
    }
}

/// Window bounds for a query: `(start, end]`. Unaligned windows trail the
/// query instant; aligned windows snap both edges to wall-clock multiples
/// of the window duration, so they cover complete buckets only.
fn window_bounds(query: &LookupQuery) -> (DateTime<Utc>, DateTime<Utc>) {
    let window_secs = query.window_secs.max(1) as i64;
    let window = Duration::seconds(window_secs);
    match query.alignment {
        Alignment::Unaligned => (query.now - window, query.now),
        Alignment::Aligned => {
            let now_ts = query.now.timestamp();
            let aligned_end = now_ts - now_ts.rem_euclid(window_secs);
            let end = DateTime::from_timestamp(aligned_end, 0).unwrap_or(query.now);
            (end - window, end)
        }
    }
}
