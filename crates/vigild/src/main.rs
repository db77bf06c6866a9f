//! Demo daemon for the vigil health engine.
//!
//! Compiles a template directory (or the built-in demo templates), feeds
//! a synthetic CPU entity through an in-memory metric source and logs
//! every committed transition. Useful for watching hysteresis and
//! flap-damping behave against live-ish data.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;
use vigil_common::types::{Entity, NotificationEvent};
use vigil_engine::{EngineConfig, Health};
use vigil_notify::Notifier;
use vigil_source::memory::MemorySource;
use vigil_template::TemplateSet;

const DEMO_TEMPLATES: &str = r#"
template: demo_cpu_usage
      on: system.cpu
    calc: $user + $system
   units: %
   every: 2s
    warn: $this > (($status >= $WARNING) ? (60) : (70))
    crit: $this > (($status == $CRITICAL) ? (80) : (90))
   delay: up 10s down 30s multiplier 1.5 max 2m
    info: total cpu utilization of the demo entity
      to: sysadmin
"#;

/// Logs transitions instead of delivering them anywhere.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, event: &NotificationEvent) -> vigil_notify::Result<()> {
        tracing::warn!(
            template = %event.template,
            entity_id = %event.entity_id,
            from = %event.previous,
            to = %event.current,
            value = ?event.value,
            recipient = %event.recipient,
            "ALERT {}",
            event.info
        );
        Ok(())
    }
}

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vigild [templates-dir] [config.toml]    Run the demo engine");
    eprintln!();
    eprintln!("Without a templates directory, a built-in demo template is used.");
}

#[tokio::main]
async fn main() -> Result<()> {
    vigil_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(|s| s.as_str()), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let templates = match args.get(1) {
        Some(dir) => {
            let set = TemplateSet::load_dir(Path::new(dir))?;
            tracing::info!(dir = %dir, count = set.len(), "Templates loaded");
            set
        }
        None => TemplateSet::compile(DEMO_TEMPLATES),
    };

    let config = match args.get(2) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let source = Arc::new(MemorySource::new(3600));
    source
        .add_entity(Entity {
            id: "system.cpu_demo".to_string(),
            context: "system.cpu".to_string(),
            host: "demo-host".to_string(),
            os: "linux".to_string(),
            family: "cpu".to_string(),
            update_every: 2,
            units: "%".to_string(),
            dimensions: vec!["user".to_string(), "system".to_string()],
        })
        .await;

    // Synthetic feeder: a bounded random walk that wanders in and out of
    // the demo thresholds.
    let feeder_source = source.clone();
    tokio::spawn(async move {
        let mut user: f64 = 30.0;
        let mut system: f64 = 10.0;
        let mut tick = interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            {
                let mut rng = rand::thread_rng();
                user = (user + rng.gen_range(-8.0..9.0)).clamp(0.0, 85.0);
                system = (system + rng.gen_range(-3.0..3.5)).clamp(0.0, 25.0);
            }
            let now = Utc::now();
            for (dimension, value) in [("user", user), ("system", system)] {
                if let Err(e) = feeder_source
                    .record("system.cpu_demo", dimension, now, value)
                    .await
                {
                    tracing::error!(error = %e, "Failed to record demo sample");
                }
            }
        }
    });

    let (health, dispatch_handle) =
        Health::with_notifier(config, templates, source, Arc::new(LogNotifier));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine = tokio::spawn(health.run(shutdown_rx));

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    let _ = shutdown_tx.send(true);
    let _ = engine.await;
    let _ = dispatch_handle.await;
    tracing::info!("vigild stopped");

    Ok(())
}
