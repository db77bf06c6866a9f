use crate::config::EngineConfig;
use crate::eval::{self, EvalFault, InstanceInputs};
use crate::graph;
use crate::hysteresis::Transition;
use crate::instance::{AlertInstance, InstanceKey};
use crate::lookup;
use crate::matcher::InstanceMatcher;
use crate::snapshot::{GenerationSnapshot, PublishedEntry, PublishedStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::time::interval;
use vigil_common::types::{NotificationEvent, Status};
use vigil_notify::Dispatcher;
use vigil_source::MetricSource;
use vigil_template::TemplateSet;

/// The health engine runtime.
///
/// Owns the template set, the instance matcher and the published
/// snapshot, and runs discovery and evaluation on their own cadences
/// within one task, so instance state is never touched concurrently.
/// Lookups fan out across tasks; everything else in a generation is a
/// deterministic two-phase pass.
pub struct Health {
    config: EngineConfig,
    templates: TemplateSet,
    source: Arc<dyn MetricSource>,
    dispatcher: Dispatcher,
    matcher: InstanceMatcher,
    published: PublishedStore,
    generation: u64,
}

impl Health {
    pub fn new(
        config: EngineConfig,
        templates: TemplateSet,
        source: Arc<dyn MetricSource>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            config,
            templates,
            source,
            dispatcher,
            matcher: InstanceMatcher::new(),
            published: PublishedStore::new(),
            generation: 0,
        }
    }

    /// Wire the engine to a notifier, spawning the dispatch worker with
    /// the configured redelivery attempts. The returned handle completes
    /// once the engine has stopped and the queue has drained.
    pub fn with_notifier(
        config: EngineConfig,
        templates: TemplateSet,
        source: Arc<dyn MetricSource>,
        notifier: Arc<dyn vigil_notify::Notifier>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (dispatcher, handle) = Dispatcher::spawn(notifier, config.dispatch_attempts);
        (Self::new(config, templates, source, dispatcher), handle)
    }

    /// Swap in a freshly compiled template set. Instances of vanished
    /// templates are retired on the next discovery pass.
    pub fn replace_templates(&mut self, templates: TemplateSet) {
        tracing::info!(count = templates.len(), "Replacing template set");
        self.templates = templates;
    }

    pub fn matcher(&self) -> &InstanceMatcher {
        &self.matcher
    }

    pub fn published(&self) -> Arc<GenerationSnapshot> {
        self.published.load()
    }

    /// One discovery pass: reconcile instances against the current
    /// topology, dispatching the terminal notification for every retired
    /// instance that was not already clear.
    pub async fn discover(&mut self, now: DateTime<Utc>) {
        let entities = self.source.entities().await;
        let (created, retired) = self.matcher.reconcile(&self.templates, &entities, now);

        for r in &retired {
            if let Some(transition) = &r.transition {
                self.emit(&r.instance, transition);
            }
        }

        if created > 0 || !retired.is_empty() {
            tracing::info!(
                created,
                retired = retired.len(),
                instances = self.matcher.len(),
                "Discovery pass reconciled instances"
            );
        }
    }

    /// Evaluate one generation at `now`: every due instance, two-phase.
    /// Returns the number of instances evaluated.
    pub async fn run_generation(&mut self, now: DateTime<Utc>) -> usize {
        let due: Vec<InstanceKey> = {
            let mut due: Vec<InstanceKey> = self
                .matcher
                .instances()
                .iter()
                .filter(|(_, instance)| instance.due(now))
                .map(|(key, _)| key.clone())
                .collect();
            due.sort();
            due
        };
        if due.is_empty() {
            return 0;
        }

        self.generation += 1;
        let generation = self.generation;
        tracing::debug!(generation, instances = due.len(), "Generation starting");

        let inputs = self.gather_inputs(&due, now).await;

        // Phase 1: publish every due instance's calc value in dependency
        // order, into a fresh copy of the previous snapshot.
        let order = graph::calc_order(self.matcher.instances(), &due);
        let previous = self.published.load();
        let mut next = GenerationSnapshot::next(&previous, generation, &|key| {
            self.matcher.contains(key)
        });

        let mut values: HashMap<InstanceKey, Result<Option<f64>, EvalFault>> = HashMap::new();
        let empty = InstanceInputs::default();

        for key in &order.sorted {
            let Some(instance) = self.matcher.get(key) else {
                continue;
            };
            let input = inputs.get(key).unwrap_or(&empty);
            let result = eval::phase1_value(instance, input, &next, now);
            next.publish(
                key.clone(),
                PublishedEntry {
                    value: result.as_ref().ok().copied().flatten(),
                    status: instance.committed(),
                },
            );
            values.insert(key.clone(), result);
        }
        for key in &order.cyclic {
            tracing::warn!(
                template = %key.0,
                entity_id = %key.1,
                "Cyclic cross-reference; instance is undefined this cycle"
            );
            if let Some(instance) = self.matcher.get(key) {
                next.publish(
                    key.clone(),
                    PublishedEntry {
                        value: None,
                        status: instance.committed(),
                    },
                );
            }
            values.insert(key.clone(), Err(EvalFault::Cycle));
        }

        let frozen = Arc::new(next);
        self.published.store(frozen.clone());

        // Phase 2: reduce warn/crit against the frozen snapshot, then run
        // each candidate through hysteresis.
        let evaluated = due.len();
        for key in &due {
            let Some(instance) = self.matcher.get_mut(key) else {
                continue;
            };
            let input = inputs.get(key).unwrap_or(&empty);

            let (value, candidate) = match values.remove(key) {
                Some(Ok(value)) => {
                    match eval::phase2_candidate(instance, value, input, &frozen, now) {
                        Ok(status) => (value, status),
                        Err(fault) => {
                            tracing::debug!(
                                template = %key.0,
                                entity_id = %key.1,
                                fault = %fault,
                                "Evaluation fault; candidate undefined"
                            );
                            (value, Status::Undefined)
                        }
                    }
                }
                Some(Err(fault)) => {
                    tracing::debug!(
                        template = %key.0,
                        entity_id = %key.1,
                        fault = %fault,
                        "Evaluation fault; candidate undefined"
                    );
                    (None, Status::Undefined)
                }
                None => (None, Status::Undefined),
            };

            instance.value = value;
            instance.last_eval = Some(now);
            instance.last_collected = input.last_collected;

            let spec = instance.template.delay.clone();
            if let Some(transition) = instance.delay.observe(candidate, now, &spec) {
                tracing::info!(
                    template = %key.0,
                    entity_id = %key.1,
                    from = %transition.from,
                    to = %transition.to,
                    value = ?value,
                    "Status transition committed"
                );
                if let Some(instance) = self.matcher.get(key) {
                    self.emit(instance, &transition);
                }
            }
        }

        tracing::debug!(generation, evaluated, "Generation finished");
        evaluated
    }

    /// Fan out input gathering for the generation: lookups (bounded by
    /// the configured timeout and concurrency), latest dimension values
    /// and collection timestamps.
    async fn gather_inputs(
        &self,
        due: &[InstanceKey],
        now: DateTime<Utc>,
    ) -> HashMap<InstanceKey, InstanceInputs> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_lookups.max(1)));
        let timeout = Duration::from_secs(self.config.lookup_timeout_secs.max(1));
        let mut handles = Vec::with_capacity(due.len());

        for key in due {
            let Some(instance) = self.matcher.get(key) else {
                continue;
            };
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let source = self.source.clone();
            let entity_id = instance.entity.id.clone();
            let query = instance
                .template
                .lookup
                .as_ref()
                .map(|spec| lookup::build_query(spec, &instance.entity, now));
            let key = key.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let lookup = match &query {
                    Some(query) => Some(lookup::run_lookup(&source, query, timeout).await),
                    None => None,
                };
                let dimensions = source.latest_values(&entity_id).await;
                let last_collected = source.last_collected(&entity_id).await;
                (
                    key,
                    InstanceInputs {
                        lookup,
                        dimensions,
                        last_collected,
                    },
                )
            }));
        }

        let mut inputs = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((key, input)) => {
                    inputs.insert(key, input);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Input gathering task failed");
                }
            }
        }
        inputs
    }

    fn emit(&self, instance: &AlertInstance, transition: &Transition) {
        let event = NotificationEvent {
            id: vigil_common::id::next_id(),
            instance_id: instance.id.clone(),
            template: instance.template.name.clone(),
            entity_id: instance.entity.id.clone(),
            host: instance.entity.host.clone(),
            previous: transition.from,
            current: transition.to,
            value: instance.value,
            units: instance.template.units.clone(),
            info: instance.template.info.clone(),
            recipient: instance.template.to.clone(),
            timestamp: transition.at,
        };
        if let Err(e) = self.dispatcher.dispatch(event) {
            tracing::error!(
                instance_id = %instance.id,
                error = %e,
                "Failed to enqueue notification"
            );
        }
    }

    /// Run until `shutdown` flips to true. Evaluation and discovery tick
    /// on their own cadences; topology events trigger an immediate
    /// discovery pass. A generation in flight always drains to completion
    /// before shutdown is honored.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            tick_secs = self.config.tick_secs,
            discovery_interval_secs = self.config.discovery_interval_secs,
            templates = self.templates.len(),
            "Health engine started"
        );

        let mut topology = self.source.subscribe();
        let mut topology_open = true;
        let mut eval_tick = interval(Duration::from_secs(self.config.tick_secs.max(1)));
        let mut discovery_tick =
            interval(Duration::from_secs(self.config.discovery_interval_secs.max(1)));

        self.discover(Utc::now()).await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = eval_tick.tick() => {
                    self.run_generation(Utc::now()).await;
                }
                _ = discovery_tick.tick() => {
                    self.discover(Utc::now()).await;
                }
                event = topology.recv(), if topology_open => {
                    match event {
                        Ok(_) => self.discover(Utc::now()).await,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "Topology events lagged; rescanning");
                            self.discover(Utc::now()).await;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            // Source is gone; periodic discovery still runs.
                            topology_open = false;
                        }
                    }
                }
            }
        }

        tracing::info!(generations = self.generation, "Health engine stopped");
    }
}
