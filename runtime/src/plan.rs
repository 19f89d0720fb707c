//! Dependency planning.
//!
//! Each case reads some keys and writes others (see
//! [`TestCase::reads`]/[`TestCase::writes`]). For every key a case reads, the
//! planner picks the producer it depends on:
//!
//! 1. the nearest producer declared *before* the case
//! 2. otherwise nothing, if the key is already available (baseline
//!    environment or variables scope)
//! 3. otherwise the first producer declared *after* the case
//! 4. otherwise nothing; the runner skips the case if the key is still
//!    missing when its turn comes
//!
//! Every other producer of the key is kept off the path between the chosen
//! producer and the reader: earlier ones run before the chosen producer,
//! later ones after the reader. The reader therefore sees exactly the value
//! it depends on, however the cases are reordered.
//!
//! Cases are then ordered topologically. Ties go to declaration order, so a
//! suite whose declaration order already satisfies every dependency runs in
//! exactly that order.

use crate::case::TestCase;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use thiserror::Error;

/// Errors from building a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Two cases share a name.
    #[error("Duplicate case name: {name}")]
    DuplicateCase {
        /// The repeated name
        name: String,
    },

    /// The dependency graph has a cycle.
    #[error("Dependency cycle between cases: {}", cases.join(" -> "))]
    Cycle {
        /// Cases on or behind the cycle, in declaration order
        cases: Vec<String>,
    },
}

/// An edge: `case` reads `key` written by `producer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The key
    pub key: String,
    /// Index of the producing case
    pub producer: usize,
}

/// Execution order for a list of cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    order: Vec<usize>,
    dependencies: Vec<Vec<Dependency>>,
}

impl Plan {
    /// Plan `cases`. `available` reports keys defined before the run starts.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] on duplicate names or cycles. A read nobody
    /// satisfies is not an error here; it simply gets no dependency.
    pub fn build(cases: &[TestCase], available: &dyn Fn(&str) -> bool) -> Result<Self, PlanError> {
        let mut names = HashSet::new();
        for case in cases {
            if !names.insert(case.name()) {
                return Err(PlanError::DuplicateCase {
                    name: case.name().to_string(),
                });
            }
        }

        let mut producers: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, case) in cases.iter().enumerate() {
            for key in case.writes() {
                producers.entry(key).or_default().push(index);
            }
        }

        let mut dependencies = vec![Vec::new(); cases.len()];
        // index -> cases that must run before it
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); cases.len()];
        for (index, case) in cases.iter().enumerate() {
            for key in case.reads() {
                let candidates: &[usize] = producers.get(&key).map(Vec::as_slice).unwrap_or_default();
                let earlier = candidates.iter().rev().find(|&&p| p < index);
                let later = candidates.iter().find(|&&p| p > index);

                let producer = match (earlier, later) {
                    (Some(&p), _) => Some(p),
                    (None, _) if available(&key) => None,
                    (None, Some(&p)) => Some(p),
                    (None, None) => {
                        tracing::debug!(case = case.name(), key = key.as_str(), "No producer for key");
                        None
                    }
                };

                for &other in candidates {
                    if other == index || Some(other) == producer {
                        continue;
                    }
                    match producer {
                        Some(p) if other < p => predecessors[p].push(other),
                        _ => predecessors[other].push(index),
                    }
                }

                if let Some(producer) = producer {
                    predecessors[index].push(producer);
                    dependencies[index].push(Dependency { key, producer });
                }
            }
        }

        let order = topological_order(cases, &predecessors)?;
        tracing::debug!(cases = cases.len(), "Built execution plan");

        Ok(Self {
            order,
            dependencies,
        })
    }

    /// Case indices in execution order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Dependencies of the case at `index`.
    #[must_use]
    pub fn dependencies(&self, index: usize) -> &[Dependency] {
        self.dependencies.get(index).map(Vec::as_slice).unwrap_or_default()
    }
}

fn topological_order(
    cases: &[TestCase],
    predecessors: &[Vec<usize>],
) -> Result<Vec<usize>, PlanError> {
    let mut indegree = vec![0_usize; cases.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); cases.len()];

    for (index, before) in predecessors.iter().enumerate() {
        let mut seen = HashSet::new();
        for &predecessor in before {
            if seen.insert(predecessor) {
                indegree[index] += 1;
                dependents[predecessor].push(index);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    let mut order = Vec::with_capacity(cases.len());
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for &dependent in &dependents[index] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < cases.len() {
        let cases = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(index, _)| cases[index].name().to_string())
            .collect();
        return Err(PlanError::Cycle { cases });
    }

    Ok(order)
}
