//! Plan model (P): parse a plan document into the typed `Plan` entity.
//!
//! The reference implementation's plan format is XML-shaped; this crate
//! accepts the YAML-shaped equivalent (the same structural schema the
//! manifest uses) since the core only needs *a* parser that yields the
//! entities below, not a specific wire syntax (§6).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// `reads`/`writes` are modeled as order-preserving, de-duplicated lists
/// rather than `HashSet`s: the scheduler's hazard emission order depends on
/// "insertion order of the union" of two tasks' touched components (§4.5.1),
/// which only survives if the declared YAML order is kept through parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Touches {
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
}

impl Touches {
    pub fn reads_writes(&self, component: &str) -> bool {
        self.reads.iter().any(|c| c == component) && self.writes.iter().any(|c| c == component)
    }

    /// All distinct components touched (read or written), in first-seen
    /// order: reads then writes.
    pub fn all_components(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for c in self.reads.iter().chain(self.writes.iter()) {
            if seen.insert(c.as_str()) {
                out.push(c.as_str());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Budget {
    pub tokens: u64,
    pub minutes: u64,
}

impl Budget {
    pub fn validate(&self) -> Result<()> {
        if self.tokens == 0 || self.minutes == 0 {
            return Err(Error::BudgetError(
                "budget tokens and minutes must both be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn add(&self, other: &Budget) -> Budget {
        Budget {
            tokens: self.tokens + other.tokens,
            minutes: self.minutes + other.minutes,
        }
    }

    pub fn zero() -> Budget {
        Budget {
            tokens: 0,
            minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub id: String,
    pub description: String,
    pub verify: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invariant {
    #[serde(flatten)]
    pub condition: Condition,
    pub critical: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
    #[serde(default)]
    pub postconditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub action: String,
    #[serde(default)]
    pub values: HashMap<String, String>,
    #[serde(default)]
    pub touches: Touches,
    pub budget: Budget,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanMetadata {
    pub feature: String,
    pub created: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub metadata: PlanMetadata,
    #[serde(default)]
    pub contract: Contract,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    metadata: PlanMetadata,
    #[serde(default)]
    contract: Contract,
    tasks: Vec<Task>,
}

/// Parse a plan document at `path`. Single-element and multi-element forms
/// of sequence-shaped fields are both accepted and normalized to `Vec`
/// by serde's ordinary sequence deserialization, since this crate's plan
/// format is YAML rather than the reference's XML.
pub fn parse_plan(path: &Path) -> Result<Plan> {
    let content = std::fs::read_to_string(path)?;
    parse_plan_str(&content)
}

pub fn parse_plan_str(content: &str) -> Result<Plan> {
    let raw: RawPlan =
        serde_yaml::from_str(content).map_err(|e| Error::MalformedPlan(e.to_string()))?;

    for task in &raw.tasks {
        task.budget.validate()?;
    }

    Ok(Plan {
        metadata: raw.metadata,
        contract: raw.contract,
        tasks: raw.tasks,
    })
}
