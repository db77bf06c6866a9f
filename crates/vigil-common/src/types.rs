use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of an alert instance, ordered from least to most severe.
///
/// The ordering drives hysteresis direction: a candidate above the
/// committed status is a raise (`up` delay), below it a recovery
/// (`down` delay).
///
/// # Examples
///
/// ```
/// use vigil_common::types::Status;
///
/// let status: Status = "warning".parse().unwrap();
/// assert_eq!(status, Status::Warning);
/// assert!(Status::Critical > Status::Warning);
/// assert!(Status::Warning > Status::Clear);
/// assert_eq!(status.code(), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Terminal state dispatched when an instance is torn down.
    Removed,
    /// The formulas could not produce a usable status this cycle.
    Undefined,
    /// No evaluation has completed yet.
    Uninitialized,
    Clear,
    Warning,
    Critical,
}

impl Status {
    /// Numeric code visible to formulas through `$status` and the status
    /// constants (`$WARNING` = 2, `$CRITICAL` = 3).
    pub fn code(&self) -> f64 {
        match self {
            Status::Removed => -2.0,
            Status::Undefined => -1.0,
            Status::Uninitialized => 0.0,
            Status::Clear => 1.0,
            Status::Warning => 2.0,
            Status::Critical => 3.0,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Removed => write!(f, "removed"),
            Status::Undefined => write!(f, "undefined"),
            Status::Uninitialized => write!(f, "uninitialized"),
            Status::Clear => write!(f, "clear"),
            Status::Warning => write!(f, "warning"),
            Status::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "removed" => Ok(Status::Removed),
            "undefined" => Ok(Status::Undefined),
            "uninitialized" => Ok(Status::Uninitialized),
            "clear" => Ok(Status::Clear),
            "warning" => Ok(Status::Warning),
            "critical" => Ok(Status::Critical),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// One monitored chart instance as reported by the metric source.
///
/// Templates select entities by `context` (the `on:` field) and filter on
/// `host`, `os` and `family`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique entity id (e.g. `"btrfs.disk_sda"`).
    pub id: String,
    /// Entity type the `on:` selector matches (e.g. `"btrfs.disk"`).
    pub context: String,
    pub host: String,
    pub os: String,
    pub family: String,
    /// Collection interval in seconds; also the default evaluation cadence.
    pub update_every: u64,
    pub units: String,
    /// Dimension names, referencable from formulas as `$<dimension>`.
    pub dimensions: Vec<String>,
}

/// Windowed aggregation function applied by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Average,
    Sum,
    Min,
    Max,
    Last,
}

impl std::str::FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average" | "avg" | "mean" => Ok(Self::Average),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "last" => Ok(Self::Last),
            _ => Err(format!("unknown aggregation: {s}")),
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Average => write!(f, "average"),
            Self::Sum => write!(f, "sum"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// Whether a lookup window trails the query instant or snaps to
/// wall-clock multiples of the window duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Aligned,
    Unaligned,
}

/// Which identifier the lookup dimension pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionMatch {
    Names,
    Ids,
}

/// One committed status transition, handed to the external notifier.
///
/// Ephemeral: produced per transition, queued for at-least-once handoff,
/// and not retained afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub instance_id: String,
    /// Template name the instance was created from.
    pub template: String,
    pub entity_id: String,
    pub host: String,
    pub previous: Status,
    pub current: Status,
    /// Instance value at the time of the transition, if one was produced.
    pub value: Option<f64>,
    pub units: String,
    pub info: String,
    /// Recipient role from the template's `to:` field.
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}
