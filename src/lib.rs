//! varp-core: the planning-and-execution backbone of an agent-driven
//! development orchestrator.
//!
//! Five responsibilities, each a thin module: parse and validate a
//! component manifest and a task plan, schedule tasks into hazard-free
//! waves with a critical path, enforce that executed writes stayed inside
//! their declared capability, and statically analyze a codebase's real
//! import/doc graph against what the manifest declares.
//!
//! Every operation here is a pure function over its inputs plus bounded,
//! read-only filesystem I/O (the lone exception is `ack_freshness`'s single
//! write path). There is no shared mutable state and no background work;
//! callers may invoke these operations concurrently as long as each
//! invocation owns its own inputs.

pub mod composites;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod freshness;
pub mod graph;
pub mod imports;
pub mod links;
pub mod manifest;
pub mod ops;
pub mod plan;
pub mod scheduler;
pub mod validator;

pub use error::{Error, Result};

pub use manifest::{parse_manifest, Component, ComponentPath, Manifest, Stability};
pub use plan::{parse_plan, parse_plan_str, Budget, Condition, Contract, Invariant, Plan, PlanMetadata, Task, Touches};

pub use graph::{invalidation_cascade, detect_cycles, CycleReport, OwnershipIndex};
pub use scheduler::{
    assign_waves, critical_path, detect_hazards, CriticalPath, Hazard, HazardKind, Wave,
};
pub use enforcement::{
    derive_restart_strategy, verify_capabilities, RestartStrategy, Violation,
    OUTSIDE_ALL_COMPONENTS,
};
pub use validator::{validate_plan, ValidationResult};
pub use imports::{infer_imports, AliasTable, ImportEdge, ImportReport};
pub use links::{scan_links, BrokenLink, LinkEdge, LinkReport, OutsideLink};
pub use freshness::{check_freshness, ComponentFreshness, DocFreshness};
pub use composites::{
    ack_freshness, coupling, health, schedule, suggest_touches, AckResult, HealthMode,
    HealthResult, ScheduleMode, ScheduleResult,
};

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// The library version as a semantic version string.
pub fn version() -> String {
    format!("{}.{}.{}", VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}
