//! The `delay:` line: `up <dur> down <dur> multiplier <float> max <dur>`.
//!
//! All clauses are optional and may appear in any order. When `max` is
//! omitted it defaults to the larger baseline delay scaled once by the
//! multiplier, so a single escalation is always representable.

use crate::duration::parse_duration;
use crate::error::{Result, TemplateError};

/// Asymmetric hysteresis timing for one template.
#[derive(Debug, Clone, PartialEq)]
pub struct DelaySpec {
    /// Required persistence when the candidate is more severe.
    pub up_secs: u64,
    /// Required persistence when the candidate is less severe.
    pub down_secs: u64,
    /// Escalation factor applied on each abandoned-and-returned pending
    /// candidate. Always >= 1.
    pub multiplier: f64,
    /// Upper bound on any escalated wait.
    pub max_secs: u64,
}

impl Default for DelaySpec {
    fn default() -> Self {
        Self {
            up_secs: 0,
            down_secs: 0,
            multiplier: 1.0,
            max_secs: 0,
        }
    }
}

impl DelaySpec {
    /// Baseline wait for a candidate relative to the committed status.
    pub fn baseline_secs(&self, raising: bool) -> u64 {
        if raising {
            self.up_secs
        } else {
            self.down_secs
        }
    }
}

impl std::str::FromStr for DelaySpec {
    type Err = TemplateError;

    fn from_str(line: &str) -> Result<Self> {
        let bad = |reason: &str| TemplateError::Delay {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let mut spec = DelaySpec::default();
        let mut explicit_max = false;
        let mut tokens = line.split_whitespace();

        while let Some(keyword) = tokens.next() {
            let value = tokens
                .next()
                .ok_or_else(|| bad(&format!("'{keyword}' requires a value")))?;
            match keyword {
                "up" => spec.up_secs = parse_duration(value)?,
                "down" => spec.down_secs = parse_duration(value)?,
                "multiplier" => {
                    spec.multiplier = value.parse().map_err(|_| bad("bad multiplier"))?;
                    if spec.multiplier < 1.0 {
                        return Err(bad("multiplier must be >= 1"));
                    }
                }
                "max" => {
                    spec.max_secs = parse_duration(value)?;
                    explicit_max = true;
                }
                other => return Err(bad(&format!("unknown keyword '{other}'"))),
            }
        }

        if !explicit_max {
            let baseline = spec.up_secs.max(spec.down_secs);
            spec.max_secs = (baseline as f64 * spec.multiplier).round() as u64;
        }

        Ok(spec)
    }
}
