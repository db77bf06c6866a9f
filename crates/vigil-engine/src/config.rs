use serde::{Deserialize, Serialize};

/// Runtime knobs for the health engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scheduler tick; instances whose cadence elapsed on the same tick
    /// form one generation.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Topology re-scan cadence, decoupled from evaluation.
    #[serde(default = "default_discovery_interval_secs")]
    pub discovery_interval_secs: u64,

    /// Hard bound on a single lookup query; a timeout is "no data".
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    /// Delivery attempts per notification before it is dropped.
    #[serde(default = "default_dispatch_attempts")]
    pub dispatch_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            discovery_interval_secs: default_discovery_interval_secs(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            dispatch_attempts: default_dispatch_attempts(),
        }
    }
}

fn default_tick_secs() -> u64 {
    1
}

fn default_discovery_interval_secs() -> u64 {
    10
}

fn default_lookup_timeout_secs() -> u64 {
    5
}

fn default_max_concurrent_lookups() -> usize {
    16
}

fn default_dispatch_attempts() -> u32 {
    3
}

impl EngineConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
