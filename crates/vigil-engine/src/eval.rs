//! Per-instance formula evaluation against the generation environment.

use crate::instance::AlertInstance;
use crate::snapshot::GenerationSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use vigil_common::types::Status;
use vigil_source::LookupResult;
use vigil_template::expr::{EvalError, Scope};

/// Variable names resolved before dimensions and cross-references.
pub const BUILTINS: &[&str] = &[
    "this",
    "status",
    "now",
    "last_collected_t",
    "update_every",
    "REMOVED",
    "UNDEFINED",
    "UNINITIALIZED",
    "CLEAR",
    "WARNING",
    "CRITICAL",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Why an instance's candidate was forced to UNDEFINED this cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalFault {
    #[error("lookup produced no data")]
    NoData,

    #[error("cyclic cross-reference")]
    Cycle,

    #[error(transparent)]
    Expression(#[from] EvalError),
}

/// Inputs gathered for one instance before evaluation starts.
#[derive(Debug, Default)]
pub struct InstanceInputs {
    pub lookup: Option<LookupResult>,
    pub dimensions: HashMap<String, f64>,
    pub last_collected: Option<DateTime<Utc>>,
}

/// The environment one formula evaluation sees. Resolution order:
/// builtins, then the entity's latest dimension values, then named
/// cross-references against the published snapshot. Anything else is an
/// evaluation fault.
pub struct EvalScope<'a> {
    pub this: Option<f64>,
    pub status: Status,
    pub now: DateTime<Utc>,
    pub last_collected: Option<DateTime<Utc>>,
    pub update_every: u64,
    pub dimensions: &'a HashMap<String, f64>,
    pub entity_id: &'a str,
    pub published: &'a GenerationSnapshot,
}

impl Scope for EvalScope<'_> {
    fn resolve(&self, name: &str) -> Option<f64> {
        match name {
            "this" => self.this,
            "status" => Some(self.status.code()),
            "now" => Some(self.now.timestamp() as f64),
            "last_collected_t" => self.last_collected.map(|t| t.timestamp() as f64),
            "update_every" => Some(self.update_every as f64),
            "REMOVED" => Some(Status::Removed.code()),
            "UNDEFINED" => Some(Status::Undefined.code()),
            "UNINITIALIZED" => Some(Status::Uninitialized.code()),
            "CLEAR" => Some(Status::Clear.code()),
            "WARNING" => Some(Status::Warning.code()),
            "CRITICAL" => Some(Status::Critical.code()),
            _ => self
                .dimensions
                .get(name)
                .copied()
                .or_else(|| self.published.value_of(name, self.entity_id)),
        }
    }
}

fn scope<'a>(
    instance: &'a AlertInstance,
    this: Option<f64>,
    inputs: &'a InstanceInputs,
    published: &'a GenerationSnapshot,
    now: DateTime<Utc>,
) -> EvalScope<'a> {
    EvalScope {
        this,
        status: instance.committed(),
        now,
        last_collected: inputs.last_collected,
        update_every: instance.entity.update_every,
        dimensions: &inputs.dimensions,
        entity_id: &instance.entity.id,
        published,
    }
}

/// Phase 1: produce `$this` for one instance — the lookup scalar, run
/// through `calc` when present, or the `calc` result alone.
pub fn phase1_value(
    instance: &AlertInstance,
    inputs: &InstanceInputs,
    published: &GenerationSnapshot,
    now: DateTime<Utc>,
) -> Result<Option<f64>, EvalFault> {
    let base = match (&instance.template.lookup, &inputs.lookup) {
        (Some(_), Some(LookupResult::Value(v))) => Some(*v),
        (Some(_), _) => return Err(EvalFault::NoData),
        (None, _) => None,
    };

    match &instance.template.calc {
        Some(calc) => {
            let value = calc.eval(&scope(instance, base, inputs, published, now))?;
            Ok(Some(value))
        }
        None => Ok(base),
    }
}

/// Phase 2: reduce `warn`/`crit` to a candidate status, reading only the
/// frozen phase-1 snapshot. `crit` wins over `warn`; a fault in either
/// forces UNDEFINED.
pub fn phase2_candidate(
    instance: &AlertInstance,
    value: Option<f64>,
    inputs: &InstanceInputs,
    published: &GenerationSnapshot,
    now: DateTime<Utc>,
) -> Result<Status, EvalFault> {
    let scope = scope(instance, value, inputs, published, now);

    if let Some(crit) = &instance.template.crit {
        if crit.eval(&scope)? != 0.0 {
            return Ok(Status::Critical);
        }
    }
    if let Some(warn) = &instance.template.warn {
        if warn.eval(&scope)? != 0.0 {
            return Ok(Status::Warning);
        }
    }
    Ok(Status::Clear)
}
