//! Enforcement core (E): capability verification against a git diff, and
//! restart-strategy derivation when a task fails.

use crate::graph::OwnershipIndex;
use crate::plan::{Task, Touches};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

pub const OUTSIDE_ALL_COMPONENTS: &str = "outside all components";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub path: PathBuf,
    pub declared_component: Option<String>,
    pub actual_component: String,
}

/// For each file in `diff_paths`, find its owning component by longest-prefix
/// match. A path is a violation if either no component owns it and the task
/// declared at least one write, or a component owns it and that component
/// is outside `touches.writes` (§4.6.1).
pub fn verify_capabilities(
    ownership: &OwnershipIndex,
    touches: &Touches,
    diff_paths: &[PathBuf],
) -> (bool, Vec<Violation>) {
    let has_writes = !touches.writes.is_empty();
    let writes: HashSet<&str> = touches.writes.iter().map(|s| s.as_str()).collect();

    let mut violations = Vec::new();
    for path in diff_paths {
        match ownership.owner_of(path) {
            Some(owner) if writes.contains(owner) => {}
            Some(owner) => violations.push(Violation {
                path: path.clone(),
                declared_component: None,
                actual_component: owner.to_string(),
            }),
            None => {
                if has_writes {
                    violations.push(Violation {
                        path: path.clone(),
                        declared_component: None,
                        actual_component: OUTSIDE_ALL_COMPONENTS.to_string(),
                    });
                }
            }
        }
    }

    (violations.is_empty(), violations)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RestartStrategy {
    IsolatedRetry {
        reason: String,
    },
    CascadeRestart {
        reason: String,
        affected_tasks: HashSet<String>,
    },
    Escalate {
        reason: String,
        affected_tasks: HashSet<String>,
    },
}

/// Derive a restart strategy for a failed task per the five-step procedure
/// in §4.6.2.
pub fn derive_restart_strategy(
    failed_task: &Task,
    all_tasks: &[Task],
    completed: &HashSet<String>,
    dispatched: &HashSet<String>,
) -> RestartStrategy {
    if failed_task.touches.writes.is_empty() {
        return RestartStrategy::IsolatedRetry {
            reason: "failed task has no write set; output-free restart is always safe".to_string(),
        };
    }

    let failed_writes: HashSet<&str> = failed_task.touches.writes.iter().map(|s| s.as_str()).collect();
    let downstream: HashSet<String> = all_tasks
        .iter()
        .filter(|t| t.id != failed_task.id)
        .filter(|t| t.touches.reads.iter().any(|r| failed_writes.contains(r.as_str())))
        .map(|t| t.id.clone())
        .collect();

    let completed_downstream: HashSet<String> =
        downstream.intersection(completed).cloned().collect();
    if !completed_downstream.is_empty() {
        return RestartStrategy::Escalate {
            reason: "a downstream consumer already completed and observed the failed task's output"
                .to_string(),
            affected_tasks: completed_downstream,
        };
    }

    let dispatched_downstream: HashSet<String> =
        downstream.intersection(dispatched).cloned().collect();
    if !dispatched_downstream.is_empty() {
        return RestartStrategy::CascadeRestart {
            reason: "in-flight downstream consumers must be cancelled and re-run".to_string(),
            affected_tasks: dispatched_downstream,
        };
    }

    RestartStrategy::IsolatedRetry {
        reason: "no downstream consumer has observed the failed task's output yet".to_string(),
    }
}
