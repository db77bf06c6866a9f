use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use vigil_common::types::Entity;
use vigil_source::{LookupQuery, LookupResult, MetricSource};
use vigil_template::lookup::LookupSpec;

/// Build the source query for one instance's lookup at `now`.
pub fn build_query(spec: &LookupSpec, entity: &Entity, now: DateTime<Utc>) -> LookupQuery {
    LookupQuery {
        entity_id: entity.id.clone(),
        dimensions: spec.dimensions.clone(),
        dimension_match: spec.dimension_match,
        window_secs: spec.window_secs,
        alignment: spec.alignment,
        aggregation: spec.aggregation,
        min_samples: spec.min_samples,
        now,
    }
}

/// Execute one lookup with a hard timeout. Timeouts and query errors both
/// degrade to "no data" so a slow or broken source never blocks the
/// generation; the instance goes UNDEFINED for the cycle and retries on
/// the next one.
pub async fn run_lookup(
    source: &Arc<dyn MetricSource>,
    query: &LookupQuery,
    timeout: Duration,
) -> LookupResult {
    match tokio::time::timeout(timeout, source.query(query)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!(entity_id = %query.entity_id, error = %e, "Lookup query failed");
            LookupResult::NoData
        }
        Err(_) => {
            tracing::warn!(
                entity_id = %query.entity_id,
                timeout_secs = timeout.as_secs(),
                "Lookup query timed out"
            );
            LookupResult::NoData
        }
    }
}
