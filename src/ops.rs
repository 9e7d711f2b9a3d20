//! External interface (§6): one function per named operation, each taking
//! a JSON-shaped argument and returning a JSON-shaped result. This is the
//! thin facade a host transport calls; every function here is a pure
//! composition of the primitive modules.

use crate::composites::{ack_freshness, coupling, health, schedule, suggest_touches, AckResult, HealthMode, HealthResult, ScheduleMode, ScheduleResult};
use crate::config::Config;
use crate::enforcement::{derive_restart_strategy, verify_capabilities, RestartStrategy, Violation};
use crate::error::Result;
use crate::freshness::{check_freshness, ComponentFreshness};
use crate::graph::{detect_cycles, invalidation_cascade, CycleReport, OwnershipIndex};
use crate::imports::{infer_imports, AliasTable, ImportReport};
use crate::links::{scan_links, LinkReport};
use crate::manifest::{parse_manifest, Manifest};
use crate::plan::{parse_plan, Plan, Task};
use crate::validator::{validate_plan, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct ParseManifestArgs {
    pub manifest_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ParseManifestResult {
    pub manifest: Manifest,
    pub valid: bool,
    pub cycles: Option<CycleReport>,
}

pub fn op_parse_manifest(args: ParseManifestArgs) -> Result<ParseManifestResult> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let cycles = detect_cycles(&manifest);
    let valid = cycles.acyclic;
    Ok(ParseManifestResult {
        manifest,
        valid,
        cycles: if valid { None } else { Some(cycles) },
    })
}

#[derive(Debug, Deserialize)]
pub struct ResolveDocsArgs {
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolvedDoc {
    pub component: String,
    pub doc: String,
    pub path: PathBuf,
}

/// `resolve_docs`: README-only for `reads`, all attached docs for `writes`
/// (a reader only needs the gist, a writer should see everything).
pub fn op_resolve_docs(args: ResolveDocsArgs) -> Result<Vec<ResolvedDoc>> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let mut out = Vec::new();

    for name in &args.reads {
        if let Some(component) = manifest.get(name) {
            if let Some(readme) = component.docs.iter().find(|d| {
                d.file_name().and_then(|n| n.to_str()) == Some("README.md")
            }) {
                out.push(ResolvedDoc {
                    component: name.clone(),
                    doc: "README.md".to_string(),
                    path: readme.clone(),
                });
            }
        }
    }

    for name in &args.writes {
        if let Some(component) = manifest.get(name) {
            for doc in &component.docs {
                out.push(ResolvedDoc {
                    component: name.clone(),
                    doc: doc
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("")
                        .to_string(),
                    path: doc.clone(),
                });
            }
        }
    }

    Ok(out)
}

#[derive(Debug, Deserialize)]
pub struct InvalidationCascadeArgs {
    pub manifest_path: PathBuf,
    pub changed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InvalidationCascadeResult {
    pub affected: Vec<String>,
}

pub fn op_invalidation_cascade(args: InvalidationCascadeArgs) -> Result<InvalidationCascadeResult> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let changed: HashSet<String> = args.changed.into_iter().collect();
    let mut affected: Vec<String> = invalidation_cascade(&manifest, &changed).into_iter().collect();
    affected.sort();
    Ok(InvalidationCascadeResult { affected })
}

#[derive(Debug, Deserialize)]
pub struct CheckFreshnessArgs {
    pub manifest_path: PathBuf,
}

pub fn op_check_freshness(
    args: CheckFreshnessArgs,
) -> Result<HashMap<String, ComponentFreshness>> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let config = Config::resolve(&args.manifest_path)?;
    Ok(check_freshness(&manifest, &config))
}

#[derive(Debug, Deserialize)]
pub struct AckFreshnessArgs {
    pub manifest_path: PathBuf,
    pub components: Vec<String>,
    #[serde(default)]
    pub doc: Option<String>,
}

pub fn op_ack_freshness(args: AckFreshnessArgs) -> Result<AckResult> {
    let config = Config::resolve(&args.manifest_path)?;
    ack_freshness(&args.manifest_path, &config, &args.components, args.doc.as_deref())
}

#[derive(Debug, Deserialize)]
pub struct ParsePlanArgs {
    pub path: PathBuf,
}

pub fn op_parse_plan(args: ParsePlanArgs) -> Result<Plan> {
    parse_plan(&args.path)
}

#[derive(Debug, Deserialize)]
pub struct ValidatePlanArgs {
    pub plan_path: PathBuf,
    pub manifest_path: PathBuf,
}

pub fn op_validate_plan(args: ValidatePlanArgs) -> Result<ValidationResult> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let plan = parse_plan(&args.plan_path)?;
    let aliases = AliasTable::default();
    let imports = infer_imports(&manifest, &aliases);
    Ok(validate_plan(&manifest, &plan, Some(&imports)))
}

#[derive(Debug, Serialize)]
pub struct TaskDiff {
    pub id: String,
    pub change: TaskChange,
}

#[derive(Debug, Serialize)]
pub enum TaskChange {
    Added,
    Removed,
    TouchesChanged { before: Vec<String>, after: Vec<String> },
    BudgetChanged { before: (u64, u64), after: (u64, u64) },
}

#[derive(Debug, Deserialize)]
pub struct DiffPlanArgs {
    pub plan_a: PathBuf,
    pub plan_b: PathBuf,
}

/// `diff_plan`: structural diff between two plans by task id, following the
/// same "accumulate a list of differences" shape the validator uses.
pub fn op_diff_plan(args: DiffPlanArgs) -> Result<Vec<TaskDiff>> {
    let a = parse_plan(&args.plan_a)?;
    let b = parse_plan(&args.plan_b)?;
    Ok(diff_tasks(&a.tasks, &b.tasks))
}

fn diff_tasks(a: &[Task], b: &[Task]) -> Vec<TaskDiff> {
    let mut diffs = Vec::new();
    let a_by_id: HashMap<&str, &Task> = a.iter().map(|t| (t.id.as_str(), t)).collect();
    let b_by_id: HashMap<&str, &Task> = b.iter().map(|t| (t.id.as_str(), t)).collect();

    for task in a {
        if !b_by_id.contains_key(task.id.as_str()) {
            diffs.push(TaskDiff {
                id: task.id.clone(),
                change: TaskChange::Removed,
            });
        }
    }
    for task in b {
        match a_by_id.get(task.id.as_str()) {
            None => diffs.push(TaskDiff {
                id: task.id.clone(),
                change: TaskChange::Added,
            }),
            Some(before) => {
                let before_touches = before.touches.all_components();
                let after_touches = task.touches.all_components();
                if before_touches != after_touches {
                    diffs.push(TaskDiff {
                        id: task.id.clone(),
                        change: TaskChange::TouchesChanged {
                            before: before_touches.iter().map(|s| s.to_string()).collect(),
                            after: after_touches.iter().map(|s| s.to_string()).collect(),
                        },
                    });
                }
                if before.budget != task.budget {
                    diffs.push(TaskDiff {
                        id: task.id.clone(),
                        change: TaskChange::BudgetChanged {
                            before: (before.budget.tokens, before.budget.minutes),
                            after: (task.budget.tokens, task.budget.minutes),
                        },
                    });
                }
            }
        }
    }

    diffs
}

#[derive(Debug, Deserialize)]
pub struct ScheduleArgs {
    pub tasks: Vec<Task>,
    pub mode: String,
}

pub fn op_schedule(args: ScheduleArgs) -> Result<ScheduleResult> {
    let mode = match args.mode.as_str() {
        "waves" => ScheduleMode::Waves,
        "hazards" => ScheduleMode::Hazards,
        "critical_path" => ScheduleMode::CriticalPath,
        _ => ScheduleMode::All,
    };
    schedule(&args.tasks, mode)
}

#[derive(Debug, Deserialize)]
pub struct VerifyCapabilitiesArgs {
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
    pub diff_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct VerifyCapabilitiesResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

pub fn op_verify_capabilities(args: VerifyCapabilitiesArgs) -> Result<VerifyCapabilitiesResult> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let ownership = OwnershipIndex::build(&manifest);
    let touches = crate::plan::Touches {
        reads: args.reads,
        writes: args.writes,
    };
    let (valid, violations) = verify_capabilities(&ownership, &touches, &args.diff_paths);
    Ok(VerifyCapabilitiesResult { valid, violations })
}

#[derive(Debug, Deserialize)]
pub struct DeriveRestartStrategyArgs {
    pub failed_task: Task,
    pub all_tasks: Vec<Task>,
    pub completed_task_ids: Vec<String>,
    pub dispatched_task_ids: Vec<String>,
}

pub fn op_derive_restart_strategy(args: DeriveRestartStrategyArgs) -> RestartStrategy {
    let completed: HashSet<String> = args.completed_task_ids.into_iter().collect();
    let dispatched: HashSet<String> = args.dispatched_task_ids.into_iter().collect();
    derive_restart_strategy(&args.failed_task, &args.all_tasks, &completed, &dispatched)
}

#[derive(Debug, Deserialize)]
pub struct InferImportsArgs {
    pub manifest_path: PathBuf,
}

pub fn op_infer_imports(args: InferImportsArgs) -> Result<ImportReport> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let alias_path = args
        .manifest_path
        .parent()
        .map(|p| p.join("tsconfig.json"))
        .unwrap_or_default();
    let aliases = AliasTable::load(&alias_path);
    Ok(infer_imports(&manifest, &aliases))
}

#[derive(Debug, Deserialize)]
pub struct ScanLinksArgs {
    pub manifest_path: PathBuf,
}

pub fn op_scan_links(args: ScanLinksArgs) -> Result<LinkReport> {
    let manifest = parse_manifest(&args.manifest_path)?;
    Ok(scan_links(&manifest))
}

#[derive(Debug, Deserialize)]
pub struct SuggestTouchesArgs {
    pub manifest_path: PathBuf,
    pub file_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SuggestTouchesResult {
    pub reads: Vec<String>,
    pub writes: Vec<String>,
}

/// `suggest_touches`: every owning component is reported as both a
/// candidate read and a candidate write — the planner decides which role
/// fits each task; this core only narrows the candidate set.
pub fn op_suggest_touches(args: SuggestTouchesArgs) -> Result<SuggestTouchesResult> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let owners = suggest_touches(&manifest, &args.file_paths);
    Ok(SuggestTouchesResult {
        reads: owners.clone(),
        writes: owners,
    })
}

#[derive(Debug, Deserialize)]
pub struct ScopedTestsArgs {
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_read_tests: bool,
}

#[derive(Debug, Serialize)]
pub struct ScopedTestsResult {
    pub test_files: Vec<String>,
    pub components_covered: Vec<String>,
    pub run_command: String,
    pub required_env: Vec<String>,
}

/// `scoped_tests`: union of named components (plus reads, if
/// `include_read_tests`), optionally narrowed by `tags`, each contributing
/// its `test` override (or a path-based default) and `env` requirements.
/// This core reports `run_command` as data; it never executes it.
pub fn op_scoped_tests(args: ScopedTestsArgs) -> Result<ScopedTestsResult> {
    let manifest = parse_manifest(&args.manifest_path)?;

    let mut covered: Vec<String> = args.writes.clone();
    covered.extend(args.reads.iter().cloned());
    if !args.include_read_tests {
        covered.retain(|name| !args.reads.contains(name) || args.writes.contains(name));
    }
    covered.sort();
    covered.dedup();

    if !args.tags.is_empty() {
        let tag_set: HashSet<&str> = args.tags.iter().map(|s| s.as_str()).collect();
        covered.retain(|name| {
            manifest
                .get(name)
                .map(|c| c.tags.iter().any(|t| tag_set.contains(t.as_str())))
                .unwrap_or(false)
        });
    }

    let mut commands = Vec::new();
    let mut test_files = Vec::new();
    let mut required_env: HashSet<String> = HashSet::new();
    for name in &covered {
        if let Some(component) = manifest.get(name) {
            let command = component
                .test
                .clone()
                .unwrap_or_else(|| format!("test {}", component.path.as_slice()[0].display()));
            commands.push(command);
            test_files.extend(
                component
                    .path
                    .as_slice()
                    .iter()
                    .map(|p| p.display().to_string()),
            );
            required_env.extend(component.env.iter().cloned());
        }
    }

    let mut required_env: Vec<String> = required_env.into_iter().collect();
    required_env.sort();

    Ok(ScopedTestsResult {
        test_files,
        components_covered: covered,
        run_command: commands.join(" && "),
        required_env,
    })
}

#[derive(Debug, Deserialize)]
pub struct VerifyEnvArgs {
    pub manifest_path: PathBuf,
    pub components: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyEnvResult {
    pub required: Vec<String>,
    pub set: Vec<String>,
    pub missing: Vec<String>,
}

pub fn op_verify_env(args: VerifyEnvArgs) -> Result<VerifyEnvResult> {
    let manifest = parse_manifest(&args.manifest_path)?;

    let mut required: HashSet<String> = HashSet::new();
    for name in &args.components {
        if let Some(component) = manifest.get(name) {
            required.extend(component.env.iter().cloned());
        }
    }

    let mut set = Vec::new();
    let mut missing = Vec::new();
    for var in &required {
        if std::env::var(var).is_ok() {
            set.push(var.clone());
        } else {
            missing.push(var.clone());
        }
    }

    let mut required: Vec<String> = required.into_iter().collect();
    required.sort();
    set.sort();
    missing.sort();

    Ok(VerifyEnvResult { required, set, missing })
}

#[derive(Debug, Deserialize)]
pub struct HealthArgs {
    pub manifest_path: PathBuf,
    pub mode: String,
}

pub fn op_health(args: HealthArgs) -> Result<HealthResult> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let config = Config::resolve(&args.manifest_path)?;
    let alias_path = args
        .manifest_path
        .parent()
        .map(|p| p.join("tsconfig.json"))
        .unwrap_or_default();
    let aliases = AliasTable::load(&alias_path);
    let mode = match args.mode.as_str() {
        "manifest" => HealthMode::Manifest,
        "freshness" => HealthMode::Freshness,
        "lint" => HealthMode::Lint,
        _ => HealthMode::All,
    };
    Ok(health(&manifest, &config, &aliases, mode))
}

#[derive(Debug, Deserialize)]
pub struct CouplingArgs {
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub co_change_edges: Vec<(String, String)>,
}

pub fn op_coupling(args: CouplingArgs) -> Result<Vec<(String, String, u32)>> {
    let manifest = parse_manifest(&args.manifest_path)?;
    let alias_path = args
        .manifest_path
        .parent()
        .map(|p| p.join("tsconfig.json"))
        .unwrap_or_default();
    let aliases = AliasTable::load(&alias_path);
    Ok(coupling(&manifest, &aliases, &args.co_change_edges))
}
