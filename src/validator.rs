//! Plan validator (V): cross-checks a Plan against a Manifest and the
//! derived hazard/import analyses, accumulating all errors and warnings
//! instead of failing on the first problem (§4.4).

use crate::graph::OwnershipIndex;
use crate::imports::ImportReport;
use crate::manifest::Manifest;
use crate::plan::Plan;
use crate::scheduler::detect_hazards;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate `plan` against `manifest`, using `imports` (if supplied) for the
/// "inferred edge not declared" warning (§4.4).
pub fn validate_plan(manifest: &Manifest, plan: &Plan, imports: Option<&ImportReport>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_touches_resolve(manifest, plan, &mut errors);
    check_duplicate_task_ids(plan, &mut errors);
    check_budgets(plan, &mut errors);
    check_illegal_reads(manifest, plan, &mut errors, &mut warnings);

    if let Some(imports) = imports {
        for dep in &imports.missing_deps {
            warnings.push(format!(
                "import analysis found an undeclared edge {} -> {}",
                dep.0, dep.1
            ));
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_touches_resolve(manifest: &Manifest, plan: &Plan, errors: &mut Vec<String>) {
    for task in &plan.tasks {
        for component in task.touches.reads.iter().chain(task.touches.writes.iter()) {
            if !manifest.contains(component) {
                errors.push(format!(
                    "task '{}' touches unknown component '{}'",
                    task.id, component
                ));
            }
        }
    }
}

fn check_duplicate_task_ids(plan: &Plan, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for task in &plan.tasks {
        if !seen.insert(task.id.as_str()) {
            errors.push(format!("duplicate task id '{}'", task.id));
        }
    }
}

fn check_budgets(plan: &Plan, errors: &mut Vec<String>) {
    for task in &plan.tasks {
        if task.budget.tokens == 0 || task.budget.minutes == 0 {
            errors.push(format!(
                "task '{}' has a non-positive budget field",
                task.id
            ));
        }
    }
}

/// A task writing `w` and reading `r` is illegal unless `r` is reachable
/// from `w` via forward `deps`. Also emits the two §4.4 warnings: isolated
/// writes, and hazards whose paired tasks otherwise touch nothing
/// `deps`-connected to the hazard's own component.
fn check_illegal_reads(
    manifest: &Manifest,
    plan: &Plan,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let forward: HashMap<&str, HashSet<&str>> = manifest
        .names()
        .map(|name| {
            let deps = manifest
                .get(name)
                .map(|c| c.deps.iter().map(|d| d.as_str()).collect())
                .unwrap_or_default();
            (name, deps)
        })
        .collect();

    for task in &plan.tasks {
        for w in &task.touches.writes {
            for r in &task.touches.reads {
                if r == w {
                    continue;
                }
                if !manifest.contains(w) || !manifest.contains(r) {
                    continue; // already reported by check_touches_resolve
                }
                if !reachable(&forward, w, r) {
                    errors.push(format!(
                        "task '{}' writes '{}' and reads '{}', but '{}' is not reachable from '{}' via deps",
                        task.id, w, r, r, w
                    ));
                }
            }

            if !manifest.contains(w) {
                continue;
            }
            let has_reverse_reader = plan.tasks.iter().any(|other| {
                other.touches.reads.iter().any(|r| r == w)
            });
            if !has_reverse_reader {
                warnings.push(format!("write target '{}' has no reader in the plan (possibly isolated write)", w));
            }
        }
    }

    let hazards = detect_hazards(&plan.tasks);
    let tasks_by_id: HashMap<&str, &crate::plan::Task> =
        plan.tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    for hazard in &hazards {
        let (Some(&source), Some(&target)) = (
            tasks_by_id.get(hazard.source.as_str()),
            tasks_by_id.get(hazard.target.as_str()),
        ) else {
            continue;
        };
        if !manifest.contains(&hazard.component) {
            continue;
        }

        let mut others: HashSet<&str> = HashSet::new();
        others.extend(source.touches.all_components());
        others.extend(target.touches.all_components());
        others.remove(hazard.component.as_str());

        if others.is_empty() {
            continue;
        }
        let connected = others.iter().any(|&other| {
            manifest.contains(other)
                && (reachable(&forward, &hazard.component, other)
                    || reachable(&forward, other, &hazard.component))
        });
        if !connected {
            warnings.push(format!(
                "hazard on '{}' between '{}' and '{}' crosses otherwise-disconnected components",
                hazard.component, hazard.source, hazard.target
            ));
        }
    }
}

fn reachable(forward: &HashMap<&str, HashSet<&str>>, from: &str, to: &str) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        if let Some(deps) = forward.get(node) {
            stack.extend(deps.iter().copied());
        }
    }
    false
}

/// Build the ownership index once for both capability enforcement and the
/// validator's import-edge comparison, as §4.10's "compute once" idiom
/// applies here too.
pub fn ownership_index(manifest: &Manifest) -> OwnershipIndex {
    OwnershipIndex::build(manifest)
}
