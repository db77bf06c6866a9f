//! The `lookup:` line:
//! `<agg> <window><unit> [unaligned] [match-names|match-ids] [min <n>] of <pattern>`.
//!
//! Everything after the aggregation and window is optional. The window may
//! carry a leading `-` ("the last N"), matching the original notation.

use crate::duration::parse_duration;
use crate::error::{Result, TemplateError};
use vigil_common::pattern::SimplePattern;
use vigil_common::types::{Aggregation, Alignment, DimensionMatch};

/// Compiled windowed aggregation query, executed once per cycle for each
/// instance whose template declares it.
#[derive(Debug, Clone)]
pub struct LookupSpec {
    pub aggregation: Aggregation,
    pub window_secs: u64,
    pub alignment: Alignment,
    pub dimension_match: DimensionMatch,
    /// Dimension filter; matches everything when `of` is omitted.
    pub dimensions: SimplePattern,
    /// Fewer samples than this in the window yields "no data".
    pub min_samples: usize,
}

impl std::str::FromStr for LookupSpec {
    type Err = TemplateError;

    fn from_str(line: &str) -> Result<Self> {
        let bad = |reason: &str| TemplateError::Lookup {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens = line.split_whitespace();

        let aggregation: Aggregation = tokens
            .next()
            .ok_or_else(|| bad("missing aggregation"))?
            .parse()
            .map_err(|e: String| bad(&e))?;

        let window_secs = parse_duration(tokens.next().ok_or_else(|| bad("missing window"))?)?;
        if window_secs == 0 {
            return Err(bad("window must be positive"));
        }

        let mut alignment = Alignment::Aligned;
        let mut dimension_match = DimensionMatch::Names;
        let mut min_samples = 1usize;
        let mut dimensions = SimplePattern::match_all();

        while let Some(token) = tokens.next() {
            match token {
                "unaligned" => alignment = Alignment::Unaligned,
                "match-names" => dimension_match = DimensionMatch::Names,
                "match-ids" => dimension_match = DimensionMatch::Ids,
                "min" => {
                    min_samples = tokens
                        .next()
                        .ok_or_else(|| bad("min requires a sample count"))?
                        .parse()
                        .map_err(|_| bad("min requires an integer"))?;
                }
                "of" => {
                    let rest: Vec<&str> = tokens.collect();
                    if rest.is_empty() {
                        return Err(bad("of requires a dimension pattern"));
                    }
                    // Dimensions are comma- or space-separated globs.
                    let joined = rest.join(" ").replace(',', " ");
                    dimensions = SimplePattern::parse(&joined);
                    break;
                }
                other => return Err(bad(&format!("unknown option '{other}'"))),
            }
        }

        Ok(Self {
            aggregation,
            window_secs,
            alignment,
            dimension_match,
            dimensions,
            min_samples,
        })
    }
}
