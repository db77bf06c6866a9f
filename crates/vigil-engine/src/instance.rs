use crate::hysteresis::DelayController;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use vigil_common::types::{Entity, Status};
use vigil_template::TemplateDef;

/// (template name, entity id) — the identity of a bound instance.
pub type InstanceKey = (String, String);

/// One template bound to one entity: the unit of evaluation and state.
///
/// Owned by the matcher; only the evaluation loop touches the status and
/// value fields, and never concurrently for the same instance within a
/// generation.
#[derive(Debug)]
pub struct AlertInstance {
    pub id: String,
    pub template: Arc<TemplateDef>,
    pub entity: Entity,
    /// Hysteresis state: committed status, pending candidate, re-arm.
    pub delay: DelayController,
    /// Value produced by the last evaluation, if any.
    pub value: Option<f64>,
    pub last_eval: Option<DateTime<Utc>>,
    pub last_collected: Option<DateTime<Utc>>,
}

impl AlertInstance {
    pub fn new(template: Arc<TemplateDef>, entity: Entity) -> Self {
        Self {
            id: vigil_common::id::next_id(),
            template,
            entity,
            delay: DelayController::new(),
            value: None,
            last_eval: None,
            last_collected: None,
        }
    }

    pub fn key(&self) -> InstanceKey {
        (self.template.name.clone(), self.entity.id.clone())
    }

    pub fn committed(&self) -> Status {
        self.delay.committed()
    }

    /// Evaluation period: the template's `every`, falling back to the
    /// entity's collection interval.
    pub fn every_secs(&self) -> u64 {
        self.template
            .every_secs
            .unwrap_or(self.entity.update_every)
            .max(1)
    }

    /// Whether this instance participates in a generation at `now`.
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.last_eval {
            None => true,
            Some(last) => (now - last).num_seconds() >= self.every_secs() as i64,
        }
    }
}
