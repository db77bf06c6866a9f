use crate::hysteresis::Transition;
use crate::instance::{AlertInstance, InstanceKey};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use vigil_common::types::{Entity, Status};
use vigil_template::TemplateSet;

/// Outcome of retiring one instance. When the instance was not already
/// clear, `transition` carries its forced move to the terminal removed
/// state so dashboards never keep a stale non-clear status.
#[derive(Debug)]
pub struct Retired {
    pub instance: AlertInstance,
    pub transition: Option<Transition>,
}

/// Owns the instance set and reconciles it against templates and
/// topology. Binding is idempotent: re-matching an existing
/// (template, entity) pair is a no-op.
#[derive(Debug, Default)]
pub struct InstanceMatcher {
    instances: HashMap<InstanceKey, AlertInstance>,
}

impl InstanceMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// One discovery pass: tear down instances whose template or entity
    /// vanished, then bind every matching pair not yet bound. Returns the
    /// number of created instances and the retired ones.
    pub fn reconcile(
        &mut self,
        templates: &TemplateSet,
        entities: &[Entity],
        now: DateTime<Utc>,
    ) -> (usize, Vec<Retired>) {
        let entity_ids: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();

        let stale: Vec<InstanceKey> = self
            .instances
            .keys()
            .filter(|(template, entity)| {
                !templates.contains(template) || !entity_ids.contains(entity.as_str())
            })
            .cloned()
            .collect();

        let mut retired = Vec::with_capacity(stale.len());
        for key in stale {
            if let Some(mut instance) = self.instances.remove(&key) {
                let transition = match instance.committed() {
                    Status::Clear | Status::Uninitialized | Status::Removed => None,
                    _ => Some(instance.delay.retire(now)),
                };
                tracing::info!(
                    template = %key.0,
                    entity_id = %key.1,
                    final_notification = transition.is_some(),
                    "Retiring alert instance"
                );
                retired.push(Retired {
                    instance,
                    transition,
                });
            }
        }

        let mut created = 0;
        for entity in entities {
            for template in templates.iter() {
                if !template.selector.matches(entity) {
                    continue;
                }
                let key = (template.name.clone(), entity.id.clone());
                if self.instances.contains_key(&key) {
                    continue;
                }
                tracing::info!(
                    template = %template.name,
                    entity_id = %entity.id,
                    host = %entity.host,
                    "Created alert instance"
                );
                self.instances
                    .insert(key, AlertInstance::new(template.clone(), entity.clone()));
                created += 1;
            }
        }

        (created, retired)
    }

    pub fn get(&self, key: &InstanceKey) -> Option<&AlertInstance> {
        self.instances.get(key)
    }

    pub fn get_mut(&mut self, key: &InstanceKey) -> Option<&mut AlertInstance> {
        self.instances.get_mut(key)
    }

    pub fn contains(&self, key: &InstanceKey) -> bool {
        self.instances.contains_key(key)
    }

    pub fn instances(&self) -> &HashMap<InstanceKey, AlertInstance> {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
