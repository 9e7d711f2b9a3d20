//! Scheduler core (S): hazard detection, wave assignment, critical path.
//!
//! All three artifacts are deterministic functions of the task list; given
//! identical input, output ordering is fully determined by plan order as
//! specified in §4.5 — no hashing-order leakage anywhere in this module.

use crate::error::{Error, Result};
use crate::plan::{Budget, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardKind {
    Raw,
    War,
    Waw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub kind: HazardKind,
    pub source: String,
    pub target: String,
    pub component: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub id: u32,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    pub tasks: Vec<String>,
    pub total_budget: Budget,
}

/**
 * Detect RAW/WAR/WAW hazards between every unordered pair of distinct tasks.
 *
 * DESIGN DECISION: pairwise Θ(n²·k) scan over (task, task, component)
 * triples instead of building an adjacency graph first.
 * WHY: plans are small by construction (<100 tasks typical); building and
 * then walking a graph costs more than the direct scan at this scale, and
 * the scan emits hazards in exactly plan order with no extra sort step.
 *
 * REASONING CHAIN:
 * 1. Walk distinct task pairs (i, j) with i before j in plan order.
 * 2. For each component either task touches, read its four touch flags.
 * 3. A write-then-read pair is RAW, write-write is WAW, read-then-write
 *    (without also writing) is WAR — per the hazard table this module's
 *    module doc references.
 * 4. A task's own reads-and-writes on the same component never hazards
 *    against itself; hazards are strictly between distinct tasks.
 */
pub fn detect_hazards(tasks: &[Task]) -> Vec<Hazard> {
    let mut hazards = Vec::new();

    for i in 0..tasks.len() {
        for j in (i + 1)..tasks.len() {
            let a = &tasks[i];
            let b = &tasks[j];
            for component in union_components(a, b) {
                let a_writes = a.touches.writes.iter().any(|c| c == component);
                let a_reads = a.touches.reads.iter().any(|c| c == component);
                let b_writes = b.touches.writes.iter().any(|c| c == component);
                let b_reads = b.touches.reads.iter().any(|c| c == component);

                if a_writes && b_reads {
                    hazards.push(Hazard {
                        kind: HazardKind::Raw,
                        source: a.id.clone(),
                        target: b.id.clone(),
                        component: component.to_string(),
                    });
                }
                if b_writes && a_reads {
                    hazards.push(Hazard {
                        kind: HazardKind::Raw,
                        source: b.id.clone(),
                        target: a.id.clone(),
                        component: component.to_string(),
                    });
                }
                if a_writes && b_writes {
                    hazards.push(Hazard {
                        kind: HazardKind::Waw,
                        source: a.id.clone(),
                        target: b.id.clone(),
                        component: component.to_string(),
                    });
                }
                if a_reads && b_writes && !a_writes {
                    hazards.push(Hazard {
                        kind: HazardKind::War,
                        source: a.id.clone(),
                        target: b.id.clone(),
                        component: component.to_string(),
                    });
                }
                if b_reads && a_writes && !b_writes {
                    hazards.push(Hazard {
                        kind: HazardKind::War,
                        source: b.id.clone(),
                        target: a.id.clone(),
                        component: component.to_string(),
                    });
                }
            }
        }
    }

    hazards
}

/// Union of the components touched by two tasks, in first-seen order:
/// `a`'s reads-then-writes, then `b`'s.
fn union_components<'a>(a: &'a Task, b: &'a Task) -> Vec<&'a str> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for c in a.touches.all_components().into_iter().chain(b.touches.all_components()) {
        if seen.insert(c) {
            out.push(c);
        }
    }
    out
}

struct TaskGraph<'a> {
    index_of: HashMap<&'a str, usize>,
    predecessors: Vec<Vec<usize>>,
}

impl<'a> TaskGraph<'a> {
    fn build(tasks: &'a [Task], hazards: &[Hazard], kinds: &[HazardKind]) -> Self {
        let index_of: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let mut predecessors = vec![Vec::new(); tasks.len()];
        for hazard in hazards {
            if !kinds.contains(&hazard.kind) {
                continue;
            }
            if let (Some(&source_idx), Some(&target_idx)) =
                (index_of.get(hazard.source.as_str()), index_of.get(hazard.target.as_str()))
            {
                if !predecessors[target_idx].contains(&source_idx) {
                    predecessors[target_idx].push(source_idx);
                }
            }
        }
        Self {
            index_of,
            predecessors,
        }
    }
}

/**
 * Assign each task to a wave: the earliest point it can safely run.
 *
 * DESIGN DECISION: wave = longest path from any root over RAW+WAW edges
 * only (WAR edges are excluded from wave placement).
 * WHY: RAW and WAW both force a real ordering (a write must land before its
 * reader or before the other write); WAR does not — the reader can run
 * before or concurrently with the writer's wave as long as it isn't also
 * reordered past its own writes, so including WAR edges here would
 * serialize waves that could otherwise run together.
 *
 * REASONING CHAIN:
 * 1. Build a predecessor graph from RAW+WAW hazards only.
 * 2. Compute each task's longest-path depth from a root (cycle-checked).
 * 3. Group tasks by depth into waves, 1-indexed.
 * 4. Within a wave, order by critical-path membership and chain position
 *    first, then plan order — so the wave ordering reads the same every
 *    run for the same plan.
 */
pub fn assign_waves(tasks: &[Task], hazards: &[Hazard]) -> Result<Vec<Wave>> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let graph = TaskGraph::build(tasks, hazards, &[HazardKind::Raw, HazardKind::Waw]);
    let wave_of = longest_path_levels(tasks, &graph, "RAW/WAW")?;

    let critical_path = critical_path(tasks, hazards)?;
    let chain_position: HashMap<&str, usize> = critical_path
        .tasks
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let plan_order: HashMap<&str, usize> =
        tasks.iter().enumerate().map(|(i, t)| (t.id.as_str(), i)).collect();

    let max_wave = wave_of.iter().copied().max().unwrap_or(0);
    let mut waves = Vec::with_capacity(max_wave);
    for wave_id in 1..=max_wave {
        let mut members: Vec<&str> = tasks
            .iter()
            .enumerate()
            .filter(|(i, _)| wave_of[*i] == wave_id)
            .map(|(_, t)| t.id.as_str())
            .collect();
        members.sort_by_key(|id| {
            (
                !chain_position.contains_key(id),
                chain_position.get(id).copied().unwrap_or(usize::MAX),
                plan_order.get(id).copied().unwrap_or(usize::MAX),
            )
        });
        waves.push(Wave {
            id: wave_id as u32,
            tasks: members.into_iter().map(|s| s.to_string()).collect(),
        });
    }

    Ok(waves)
}

fn longest_path_levels(tasks: &[Task], graph: &TaskGraph, edge_kind_label: &str) -> Result<Vec<usize>> {
    let n = tasks.len();
    let mut level = vec![0usize; n];
    let mut state = vec![0u8; n]; // 0 = unvisited, 1 = in-progress, 2 = done

    for start in 0..n {
        if state[start] == 2 {
            continue;
        }
        let mut stack_path = Vec::new();
        compute_level(start, &graph.predecessors, &mut level, &mut state, &mut stack_path, tasks, edge_kind_label)?;
    }

    Ok(level)
}

fn compute_level(
    node: usize,
    predecessors: &[Vec<usize>],
    level: &mut [usize],
    state: &mut [u8],
    stack_path: &mut Vec<usize>,
    tasks: &[Task],
    edge_kind_label: &str,
) -> Result<usize> {
    if state[node] == 2 {
        return Ok(level[node]);
    }
    if state[node] == 1 {
        let cycle: Vec<String> = stack_path
            .iter()
            .skip_while(|&&n| n != node)
            .map(|&n| tasks[n].id.clone())
            .collect();
        return Err(Error::PlanCycle(format!(
            "{} cycle among tasks: {}",
            edge_kind_label,
            cycle.join(" -> ")
        )));
    }

    state[node] = 1;
    stack_path.push(node);

    let mut max_pred = 0usize;
    for &pred in &predecessors[node] {
        let pred_level = compute_level(pred, predecessors, level, state, stack_path, tasks, edge_kind_label)?;
        max_pred = max_pred.max(pred_level);
    }

    let this_level = if predecessors[node].is_empty() {
        1
    } else {
        1 + max_pred
    };
    level[node] = this_level;
    state[node] = 2;
    stack_path.pop();

    Ok(this_level)
}

/// Longest chain of RAW-only edges, ties broken by plan order (earliest
/// declared task wins, both for choosing among maximal-depth endpoints and
/// for choosing among equal-depth predecessors while walking back).
pub fn critical_path(tasks: &[Task], hazards: &[Hazard]) -> Result<CriticalPath> {
    if tasks.is_empty() {
        return Ok(CriticalPath {
            tasks: Vec::new(),
            total_budget: Budget::zero(),
        });
    }

    let graph = TaskGraph::build(tasks, hazards, &[HazardKind::Raw]);
    let depth = longest_path_levels(tasks, &graph, "RAW")?;

    let max_depth = depth.iter().copied().max().unwrap_or(1);
    let end = (0..tasks.len())
        .filter(|&i| depth[i] == max_depth)
        .min_by_key(|&i| i)
        .expect("tasks is non-empty");

    let mut chain = vec![end];
    let mut current = end;
    while depth[current] > 1 {
        let target_depth = depth[current] - 1;
        let pred = graph.predecessors[current]
            .iter()
            .copied()
            .filter(|&p| depth[p] == target_depth)
            .min()
            .expect("a predecessor at target_depth must exist when depth > 1");
        chain.push(pred);
        current = pred;
    }
    chain.reverse();

    let total_budget = chain
        .iter()
        .fold(Budget::zero(), |acc, &i| acc.add(&tasks[i].budget));

    Ok(CriticalPath {
        tasks: chain.into_iter().map(|i| tasks[i].id.clone()).collect(),
        total_budget,
    })
}
