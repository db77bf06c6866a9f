use crate::memory::MemorySource;
use crate::{LookupQuery, LookupResult, MetricSource, TopologyEvent};
use chrono::{DateTime, Duration, Utc};
use vigil_common::pattern::SimplePattern;
use vigil_common::types::{Aggregation, Alignment, DimensionMatch, Entity};

fn entity(id: &str, context: &str) -> Entity {
    Entity {
        id: id.to_string(),
        context: context.to_string(),
        host: "web-01".to_string(),
        os: "linux".to_string(),
        family: "cpu".to_string(),
        update_every: 10,
        units: "%".to_string(),
        dimensions: vec!["user".to_string(), "system".to_string()],
    }
}

fn query(entity_id: &str, now: DateTime<Utc>) -> LookupQuery {
    LookupQuery {
        entity_id: entity_id.to_string(),
        dimensions: SimplePattern::match_all(),
        dimension_match: DimensionMatch::Names,
        window_secs: 60,
        alignment: Alignment::Unaligned,
        aggregation: Aggregation::Average,
        min_samples: 1,
        now,
    }
}

#[tokio::test]
async fn average_over_unaligned_window() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let now = Utc::now();
    for (secs_ago, value) in [(50, 10.0), (30, 20.0), (10, 30.0)] {
        source
            .record(
                "system.cpu_web01",
                "user",
                now - Duration::seconds(secs_ago),
                value,
            )
            .await
            .unwrap();
    }

    let result = source.query(&query("system.cpu_web01", now)).await.unwrap();
    assert_eq!(result, LookupResult::Value(20.0));
}

#[tokio::test]
async fn samples_outside_window_are_excluded() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let now = Utc::now();
    source
        .record("system.cpu_web01", "user", now - Duration::seconds(300), 99.0)
        .await
        .unwrap();
    source
        .record("system.cpu_web01", "user", now - Duration::seconds(10), 1.0)
        .await
        .unwrap();

    let result = source.query(&query("system.cpu_web01", now)).await.unwrap();
    assert_eq!(result, LookupResult::Value(1.0));
}

#[tokio::test]
async fn insufficient_samples_yield_no_data() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let now = Utc::now();
    source
        .record("system.cpu_web01", "user", now - Duration::seconds(10), 50.0)
        .await
        .unwrap();

    let mut q = query("system.cpu_web01", now);
    q.min_samples = 5;
    let result = source.query(&q).await.unwrap();
    assert_eq!(result, LookupResult::NoData);
}

#[tokio::test]
async fn empty_window_yields_no_data() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let result = source
        .query(&query("system.cpu_web01", Utc::now()))
        .await
        .unwrap();
    assert_eq!(result, LookupResult::NoData);
}

#[tokio::test]
async fn dimension_pattern_filters_samples() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let now = Utc::now();
    source
        .record("system.cpu_web01", "user", now - Duration::seconds(10), 40.0)
        .await
        .unwrap();
    source
        .record("system.cpu_web01", "system", now - Duration::seconds(10), 10.0)
        .await
        .unwrap();

    let mut q = query("system.cpu_web01", now);
    q.dimensions = SimplePattern::parse("user");
    q.aggregation = Aggregation::Sum;
    let result = source.query(&q).await.unwrap();
    assert_eq!(result, LookupResult::Value(40.0));
}

#[tokio::test]
async fn aligned_window_covers_complete_buckets_only() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    // now = 130s into the epoch-aligned minute grid: the aligned 60s
    // window is (60, 120]; the sample at t=125 must not be visible.
    let now = DateTime::from_timestamp(130, 0).unwrap();
    source
        .record(
            "system.cpu_web01",
            "user",
            DateTime::from_timestamp(90, 0).unwrap(),
            10.0,
        )
        .await
        .unwrap();
    source
        .record(
            "system.cpu_web01",
            "user",
            DateTime::from_timestamp(125, 0).unwrap(),
            90.0,
        )
        .await
        .unwrap();

    let mut q = query("system.cpu_web01", now);
    q.alignment = Alignment::Aligned;
    let result = source.query(&q).await.unwrap();
    assert_eq!(result, LookupResult::Value(10.0));
}

#[tokio::test]
async fn min_and_max_and_last_aggregations() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let now = Utc::now();
    for (secs_ago, value) in [(40, 5.0), (20, 50.0), (5, 25.0)] {
        source
            .record(
                "system.cpu_web01",
                "user",
                now - Duration::seconds(secs_ago),
                value,
            )
            .await
            .unwrap();
    }

    let mut q = query("system.cpu_web01", now);
    q.aggregation = Aggregation::Min;
    assert_eq!(source.query(&q).await.unwrap(), LookupResult::Value(5.0));
    q.aggregation = Aggregation::Max;
    assert_eq!(source.query(&q).await.unwrap(), LookupResult::Value(50.0));
    q.aggregation = Aggregation::Last;
    assert_eq!(source.query(&q).await.unwrap(), LookupResult::Value(25.0));
}

#[tokio::test]
async fn unknown_entity_is_an_error() {
    let source = MemorySource::new(3600);
    assert!(source.query(&query("nope", Utc::now())).await.is_err());
    assert!(source
        .record("nope", "user", Utc::now(), 1.0)
        .await
        .is_err());
}

#[tokio::test]
async fn topology_events_are_broadcast() {
    let source = MemorySource::new(3600);
    let mut rx = source.subscribe();

    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;
    source.remove_entity("system.cpu_web01").await;

    match rx.recv().await.unwrap() {
        TopologyEvent::EntityAppeared(e) => assert_eq!(e.id, "system.cpu_web01"),
        other => panic!("expected appearance, got {other:?}"),
    }
    match rx.recv().await.unwrap() {
        TopologyEvent::EntityRemoved(id) => assert_eq!(id, "system.cpu_web01"),
        other => panic!("expected removal, got {other:?}"),
    }
}

#[tokio::test]
async fn latest_values_track_newest_sample_per_dimension() {
    let source = MemorySource::new(3600);
    source.add_entity(entity("system.cpu_web01", "system.cpu")).await;

    let now = Utc::now();
    source
        .record("system.cpu_web01", "user", now - Duration::seconds(20), 10.0)
        .await
        .unwrap();
    source
        .record("system.cpu_web01", "user", now, 30.0)
        .await
        .unwrap();
    source
        .record("system.cpu_web01", "system", now, 7.0)
        .await
        .unwrap();

    let latest = source.latest_values("system.cpu_web01").await;
    assert_eq!(latest.get("user"), Some(&30.0));
    assert_eq!(latest.get("system"), Some(&7.0));
    assert_eq!(source.last_collected("system.cpu_web01").await, Some(now));
}
