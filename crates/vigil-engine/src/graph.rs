//! Dependency ordering for phase 1.
//!
//! `calc` formulas may reference other instances by template name; those
//! must have published before the referencing instance evaluates. The
//! graph is rebuilt per generation over the due instances only —
//! references to instances outside the generation read their last
//! published value and impose no ordering. Instances caught in a cycle
//! are reported and degrade to UNDEFINED for the cycle.

use crate::eval::is_builtin;
use crate::instance::{AlertInstance, InstanceKey};
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug)]
pub struct CalcOrder {
    /// Dependency-respecting evaluation order.
    pub sorted: Vec<InstanceKey>,
    /// Instances in a cross-reference cycle, excluded from `sorted`.
    pub cyclic: Vec<InstanceKey>,
}

pub fn calc_order(
    instances: &HashMap<InstanceKey, AlertInstance>,
    due: &[InstanceKey],
) -> CalcOrder {
    let mut by_name: HashMap<&str, Vec<&InstanceKey>> = HashMap::new();
    for key in due {
        by_name.entry(key.0.as_str()).or_default().push(key);
    }

    // dependents[dep] = keys that must wait for dep; indegree = #deps.
    let mut dependents: HashMap<&InstanceKey, Vec<&InstanceKey>> = HashMap::new();
    let mut indegree: HashMap<&InstanceKey, usize> = due.iter().map(|k| (k, 0)).collect();

    for key in due {
        let Some(instance) = instances.get(key) else {
            continue;
        };
        let Some(calc) = &instance.template.calc else {
            continue;
        };

        let mut vars = BTreeSet::new();
        calc.variables(&mut vars);

        for var in &vars {
            if is_builtin(var)
                || *var == instance.template.name
                || instance.entity.dimensions.iter().any(|d| d == var)
            {
                continue;
            }
            let Some(deps) = by_name.get(var.as_str()) else {
                continue;
            };
            for dep in deps {
                if *dep == key {
                    continue;
                }
                dependents.entry(*dep).or_default().push(key);
                *indegree.entry(key).or_insert(0) += 1;
            }
        }
    }

    // Kahn's algorithm, deterministic via sorted seeds.
    let mut ready: Vec<&InstanceKey> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(key, _)| *key)
        .collect();
    ready.sort();
    let mut queue: VecDeque<&InstanceKey> = ready.into();

    let mut sorted = Vec::with_capacity(due.len());
    while let Some(key) = queue.pop_front() {
        sorted.push(key.clone());
        if let Some(deps) = dependents.get(key) {
            for dependent in deps {
                if let Some(deg) = indegree.get_mut(*dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
    }

    let mut cyclic: Vec<InstanceKey> = indegree
        .into_iter()
        .filter(|(_, deg)| *deg > 0)
        .map(|(key, _)| key.clone())
        .collect();
    cyclic.sort();

    CalcOrder { sorted, cyclic }
}
