//! Composites (C): orchestrate the primitive modules behind a `mode`
//! selector, plus the shared ownership/touches-suggestion utilities (R)
//! and the single persisted-state write path (§4.10, §6).

use crate::config::Config;
use crate::error::Result;
use crate::freshness::{check_freshness, ComponentFreshness};
use crate::graph::{detect_cycles, CycleReport, OwnershipIndex};
use crate::imports::{infer_imports, AliasTable, ImportReport};
use crate::links::{scan_links, LinkReport};
use crate::manifest::Manifest;
use crate::plan::Task;
use crate::scheduler::{assign_waves, critical_path, detect_hazards, CriticalPath, Hazard, Wave};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    Waves,
    Hazards,
    CriticalPath,
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleResult {
    pub hazards: Option<Vec<Hazard>>,
    pub waves: Option<Vec<Wave>>,
    pub critical_path: Option<CriticalPath>,
}

/// `schedule(tasks, mode)`: computes hazards once and reuses them for
/// whichever of `waves`/`critical_path` the caller asked for.
pub fn schedule(tasks: &[Task], mode: ScheduleMode) -> Result<ScheduleResult> {
    let needs_hazards = matches!(
        mode,
        ScheduleMode::Hazards | ScheduleMode::Waves | ScheduleMode::CriticalPath | ScheduleMode::All
    );
    let hazards = if needs_hazards {
        Some(detect_hazards(tasks))
    } else {
        None
    };

    let waves = if matches!(mode, ScheduleMode::Waves | ScheduleMode::All) {
        Some(assign_waves(tasks, hazards.as_ref().unwrap())?)
    } else {
        None
    };

    let path = if matches!(mode, ScheduleMode::CriticalPath | ScheduleMode::All) {
        Some(critical_path(tasks, hazards.as_ref().unwrap())?)
    } else {
        None
    };

    Ok(ScheduleResult {
        hazards: if matches!(mode, ScheduleMode::Hazards | ScheduleMode::All) {
            hazards
        } else {
            None
        },
        waves,
        critical_path: path,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthMode {
    Manifest,
    Freshness,
    Lint,
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthResult {
    pub cycles: Option<CycleReport>,
    pub freshness: Option<HashMap<String, ComponentFreshness>>,
    pub import_lint: Option<ImportReport>,
    pub link_lint: Option<LinkReport>,
}

/// `health(manifest, mode)`: bundles parser-level cycle detection, doc
/// freshness, and the import/link "lint" analyses behind one call.
pub fn health(manifest: &Manifest, config: &Config, aliases: &AliasTable, mode: HealthMode) -> HealthResult {
    let cycles = if matches!(mode, HealthMode::Manifest | HealthMode::All) {
        Some(detect_cycles(manifest))
    } else {
        None
    };
    let freshness = if matches!(mode, HealthMode::Freshness | HealthMode::All) {
        Some(check_freshness(manifest, config))
    } else {
        None
    };
    let (import_lint, link_lint) = if matches!(mode, HealthMode::Lint | HealthMode::All) {
        (Some(infer_imports(manifest, aliases)), Some(scan_links(manifest)))
    } else {
        (None, None)
    };

    HealthResult {
        cycles,
        freshness,
        import_lint,
        link_lint,
    }
}

/// `coupling(manifest, mode)`: combines import-edges with an optional
/// co-change edge set (git co-change graph is out of scope for this core;
/// callers that have one pass it in).
pub fn coupling(manifest: &Manifest, aliases: &AliasTable, co_change_edges: &[(String, String)]) -> Vec<(String, String, u32)> {
    let imports = infer_imports(manifest, aliases);
    let mut weight: HashMap<(String, String), u32> = HashMap::new();
    for edge in &imports.import_deps {
        *weight.entry((edge.from.clone(), edge.to.clone())).or_insert(0) += 1;
    }
    for (from, to) in co_change_edges {
        *weight.entry((from.clone(), to.clone())).or_insert(0) += 1;
    }

    let mut out: Vec<(String, String, u32)> = weight.into_iter().map(|((f, t), w)| (f, t, w)).collect();
    out.sort_by(|a, b| (a.0.as_str(), a.1.as_str()).cmp(&(b.0.as_str(), b.1.as_str())));
    out
}

/// `suggest_touches(manifest, file_paths)`: attribute each file to a
/// component via the ownership index and report the distinct owners, in
/// manifest insertion order (the tie-break for ambiguous ownership, per the
/// Open Question in §9).
pub fn suggest_touches(manifest: &Manifest, file_paths: &[PathBuf]) -> Vec<String> {
    let ownership = OwnershipIndex::build(manifest);
    let mut owners: Vec<&str> = file_paths
        .iter()
        .filter_map(|p| ownership.owner_of(p))
        .collect();
    owners.sort_by_key(|name| manifest.names().position(|n| n == *name).unwrap_or(usize::MAX));
    owners.dedup();
    owners.into_iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AckResult {
    pub acked: Vec<String>,
}

/// `ack_freshness(manifest_path, components, doc?)`: record a human
/// acknowledgement timestamp to `<state_dir>/freshness.json`, the single
/// write path in this core. Writes to a temp file then renames into place
/// so a reader never observes a partially written file.
pub fn ack_freshness(
    manifest_path: &Path,
    config: &Config,
    components: &[String],
    doc: Option<&str>,
) -> Result<AckResult> {
    let state_dir = config.state_dir(manifest_path);
    std::fs::create_dir_all(&state_dir)?;
    let target = state_dir.join("freshness.json");

    let mut record: HashMap<String, HashMap<String, String>> = if target.exists() {
        let content = std::fs::read_to_string(&target)?;
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        HashMap::new()
    };

    let now = Utc::now().to_rfc3339();
    let mut acked = Vec::new();
    for component in components {
        let entry = record.entry(component.clone()).or_default();
        let key = doc.unwrap_or("*").to_string();
        entry.insert(key, now.clone());
        acked.push(component.clone());
    }

    let serialized = serde_json::to_string_pretty(&record)?;
    let tmp_path = target.with_extension("json.tmp");
    std::fs::write(&tmp_path, serialized)?;
    std::fs::rename(&tmp_path, &target)?;

    Ok(AckResult { acked })
}
