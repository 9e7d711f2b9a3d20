//! Scheduler throughput at the plan's stated scale ceiling (spec: plans
//! are "small by construction (<100 tasks typical)"). Exercises hazard
//! detection (Θ(n²·k)) and wave assignment together, since `schedule`'s
//! `all` mode always pays for both.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use varp_core::{assign_waves, critical_path, detect_hazards, Budget, Task, Touches};

/// A plan of `n` tasks, each writing a fresh component and reading the
/// previous task's component — a worst-case-ish linear RAW chain, plus a
/// handful of WAR/WAW pairs layered on top to exercise every hazard kind.
fn generate_plan(n: usize) -> Vec<Task> {
    (0..n)
        .map(|i| {
            let writes = vec![format!("c{}", i)];
            let mut reads = Vec::new();
            if i > 0 {
                reads.push(format!("c{}", i - 1));
            }
            if i > 2 {
                // an extra read two tasks back, so some components are
                // touched by three tasks instead of two
                reads.push(format!("c{}", i - 2));
            }
            Task {
                id: format!("T{}", i),
                description: String::new(),
                action: "write_file".to_string(),
                values: Default::default(),
                touches: Touches { reads, writes },
                budget: Budget {
                    tokens: 1000,
                    minutes: 5,
                },
            }
        })
        .collect()
}

fn bench_hazard_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("hazard_detection");
    for size in [10, 50, 100].iter() {
        let tasks = generate_plan(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| detect_hazards(&tasks));
        });
    }
    group.finish();
}

fn bench_wave_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("wave_assignment");
    for size in [10, 50, 100].iter() {
        let tasks = generate_plan(*size);
        let hazards = detect_hazards(&tasks);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| assign_waves(&tasks, &hazards).unwrap());
        });
    }
    group.finish();
}

fn bench_critical_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("critical_path");
    for size in [10, 50, 100].iter() {
        let tasks = generate_plan(*size);
        let hazards = detect_hazards(&tasks);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| critical_path(&tasks, &hazards).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hazard_detection, bench_wave_assignment, bench_critical_path);
criterion_main!(benches);
