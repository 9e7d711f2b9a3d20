//! End-to-end scenarios from the scheduler/enforcement spec: each test
//! builds a manifest + plan on disk and checks the literal expected output
//! for hazards, waves, critical path, capability violations, and restart
//! strategy derivation.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use varp_core::{
    critical_path, derive_restart_strategy, detect_cycles, detect_hazards, parse_manifest,
    verify_capabilities, Budget, HazardKind, OwnershipIndex, Task, Touches,
};

fn write_manifest(dir: &std::path::Path, yaml: &str) -> PathBuf {
    for sub in ["src/auth", "src/api", "src/web"] {
        fs::create_dir_all(dir.join(sub)).ok();
    }
    let path = dir.join("varp.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

fn task(id: &str, reads: &[&str], writes: &[&str], tokens: u64, minutes: u64) -> Task {
    Task {
        id: id.to_string(),
        description: String::new(),
        action: "write_file".to_string(),
        values: Default::default(),
        touches: Touches {
            reads: reads.iter().map(|s| s.to_string()).collect(),
            writes: writes.iter().map(|s| s.to_string()).collect(),
        },
        budget: Budget { tokens, minutes },
    }
}

/// Scenario 1: linear chain auth -> api -> web.
#[test]
fn scenario_linear_chain() {
    let tasks = vec![
        task("T1", &[], &["auth"], 100, 1),
        task("T2", &["auth"], &["api"], 200, 2),
        task("T3", &["api"], &["web"], 300, 3),
    ];

    let hazards = detect_hazards(&tasks);
    assert_eq!(hazards.len(), 2);
    assert_eq!(hazards[0].kind, HazardKind::Raw);
    assert_eq!(hazards[0].source, "T1");
    assert_eq!(hazards[0].target, "T2");
    assert_eq!(hazards[1].source, "T2");
    assert_eq!(hazards[1].target, "T3");

    let waves = varp_core::assign_waves(&tasks, &hazards).unwrap();
    assert_eq!(waves.len(), 3);
    assert_eq!(waves[0].tasks, vec!["T1"]);
    assert_eq!(waves[1].tasks, vec!["T2"]);
    assert_eq!(waves[2].tasks, vec!["T3"]);

    let cp = critical_path(&tasks, &hazards).unwrap();
    assert_eq!(cp.tasks, vec!["T1", "T2", "T3"]);
    assert_eq!(cp.total_budget, Budget { tokens: 600, minutes: 6 });
}

/// Scenario 2: two independent writers feed a joining reader; critical
/// path ties are broken to the earliest-declared chain.
#[test]
fn scenario_parallelizable_pair() {
    let tasks = vec![
        task("T1", &[], &["a"], 10, 1),
        task("T2", &[], &["b"], 10, 1),
        task("T3", &["a", "b"], &["c"], 10, 1),
    ];

    let hazards = detect_hazards(&tasks);
    assert_eq!(hazards.len(), 2);
    assert!(hazards.iter().all(|h| h.kind == HazardKind::Raw));

    let waves = varp_core::assign_waves(&tasks, &hazards).unwrap();
    assert_eq!(waves.len(), 2);
    assert_eq!(waves[0].tasks, vec!["T1", "T2"]);
    assert_eq!(waves[1].tasks, vec!["T3"]);

    let cp = critical_path(&tasks, &hazards).unwrap();
    assert_eq!(cp.tasks.len(), 2);
    assert_eq!(cp.tasks, vec!["T1", "T3"]);
}

/// Scenario 3: a write declaration for `auth` only; a diff touching `api`
/// is a capability violation.
#[test]
fn scenario_capability_violation() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = write_manifest(
        dir.path(),
        "version: \"1.0\"\nauth:\n  path: src/auth\napi:\n  path: src/api\n",
    );
    let manifest = parse_manifest(&manifest_path).unwrap();
    let ownership = OwnershipIndex::build(&manifest);

    let touches = Touches {
        reads: vec![],
        writes: vec!["auth".to_string()],
    };
    let diff_paths = vec![
        dir.path().join("src/auth/x.ts"),
        dir.path().join("src/api/y.ts"),
    ];
    let (valid, violations) = verify_capabilities(&ownership, &touches, &diff_paths);
    assert!(!valid);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, dir.path().join("src/api/y.ts"));
    assert_eq!(violations[0].actual_component, "api");
}

/// Scenario 4: a completed downstream reader forces escalation, not a
/// mechanical restart.
#[test]
fn scenario_restart_escalation() {
    let failed = task("T1", &[], &["auth"], 10, 1);
    let downstream = task("T2", &["auth"], &[], 10, 1);
    let all = vec![failed.clone(), downstream];
    let completed: HashSet<String> = ["T2".to_string()].into_iter().collect();

    let strategy = derive_restart_strategy(&failed, &all, &completed, &HashSet::new());
    match strategy {
        varp_core::RestartStrategy::Escalate { affected_tasks, .. } => {
            assert!(affected_tasks.contains("T2"));
        }
        other => panic!("expected Escalate, got {:?}", other),
    }
}

/// Scenario 5: the same shape, but the downstream reader is only
/// dispatched (not completed) — cascade restart, not escalation.
#[test]
fn scenario_restart_cascade() {
    let failed = task("T1", &[], &["auth"], 10, 1);
    let downstream = task("T2", &["auth"], &[], 10, 1);
    let all = vec![failed.clone(), downstream];
    let dispatched: HashSet<String> = ["T2".to_string()].into_iter().collect();

    let strategy = derive_restart_strategy(&failed, &all, &HashSet::new(), &dispatched);
    match strategy {
        varp_core::RestartStrategy::CascadeRestart { affected_tasks, .. } => {
            assert_eq!(affected_tasks, dispatched);
        }
        other => panic!("expected CascadeRestart, got {:?}", other),
    }
}

/// Scenario 6: a two-node manifest cycle is reported as data by
/// `parse_manifest`'s cycle check, not rejected at load time.
#[test]
fn scenario_manifest_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = write_manifest(
        dir.path(),
        "version: \"1.0\"\nauth:\n  path: src/auth\n  deps: [api]\napi:\n  path: src/api\n  deps: [auth]\n",
    );
    let manifest = parse_manifest(&manifest_path).unwrap();
    let report = detect_cycles(&manifest);
    assert!(!report.acyclic);
    assert_eq!(report.cycles, vec![vec!["api".to_string(), "auth".to_string()]]);

    // The manifest itself is still intact for reporting purposes.
    assert!(manifest.contains("auth"));
    assert!(manifest.contains("api"));
}

/// Boundary: diff paths outside all components are clean with no declared
/// writes, and each becomes a violation once a write is declared.
#[test]
fn boundary_outside_components() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = write_manifest(dir.path(), "version: \"1.0\"\nauth:\n  path: src/auth\n");
    let manifest = parse_manifest(&manifest_path).unwrap();
    let ownership = OwnershipIndex::build(&manifest);
    let outside = vec![dir.path().join("src/unrelated/z.ts")];

    let empty_touches = Touches { reads: vec![], writes: vec![] };
    let (valid, violations) = verify_capabilities(&ownership, &empty_touches, &outside);
    assert!(valid);
    assert!(violations.is_empty());

    let write_touches = Touches { reads: vec![], writes: vec!["auth".to_string()] };
    let (valid, violations) = verify_capabilities(&ownership, &write_touches, &outside);
    assert!(!valid);
    assert_eq!(violations.len(), 1);
}

/// Boundary: empty task list and a single untouched task both degenerate
/// cleanly rather than erroring.
#[test]
fn boundary_empty_and_single_task() {
    let empty: Vec<Task> = Vec::new();
    assert!(detect_hazards(&empty).is_empty());
    assert!(varp_core::assign_waves(&empty, &[]).unwrap().is_empty());
    assert!(critical_path(&empty, &[]).unwrap().tasks.is_empty());

    let single = vec![task("T1", &[], &[], 5, 1)];
    let hazards = detect_hazards(&single);
    assert!(hazards.is_empty());
    let waves = varp_core::assign_waves(&single, &hazards).unwrap();
    assert_eq!(waves.len(), 1);
    assert_eq!(waves[0].tasks, vec!["T1"]);
    let cp = critical_path(&single, &hazards).unwrap();
    assert_eq!(cp.tasks, vec!["T1"]);
}

/// Boundary: a self-reading-and-writing task combined with a second writer
/// produces exactly one WAW and zero WAR between them.
#[test]
fn boundary_self_touch_suppresses_war() {
    let tasks = vec![
        task("T1", &["x"], &["x"], 10, 1),
        task("T2", &[], &["x"], 10, 1),
    ];
    let hazards = detect_hazards(&tasks);
    assert_eq!(hazards.iter().filter(|h| h.kind == HazardKind::Waw).count(), 1);
    assert_eq!(hazards.iter().filter(|h| h.kind == HazardKind::War).count(), 0);
}
