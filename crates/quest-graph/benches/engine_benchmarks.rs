//! Benchmarks for engine operations
//!
//! Run with: cargo bench -p questline-graph

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use questline_graph::{
    ActionCascader, Completions, Faction, Objective, StatusTag, Task, TaskCompletion,
    TaskGraphIndex, TaskRequirement, build_forest, compute_invalidity,
};
use std::hint::black_box;

fn quest(i: usize) -> Task {
    Task {
        objectives: (0..3)
            .map(|o| Objective {
                id: Some(format!("q{i}-o{o}")),
                count: Some(2),
            })
            .collect(),
        ..Task::new(format!("q{i}"))
    }
}

fn require(task: &mut Task, target: usize, status: &[StatusTag]) {
    task.task_requirements.push(TaskRequirement {
        task_id: Some(format!("q{target}")),
        status: status.to_vec(),
    });
}

/// Generate a linear quest chain with matching parent/child links
fn generate_chain(depth: usize) -> Vec<Task> {
    (0..depth)
        .map(|i| {
            let mut task = quest(i);
            if i > 0 {
                require(&mut task, i - 1, &[StatusTag::Complete]);
                task.parents.push(format!("q{}", i - 1));
            }
            if i + 1 < depth {
                task.children.push(format!("q{}", i + 1));
            }
            task
        })
        .collect()
}

/// Generate layered quests where each layer requires the whole previous one
fn generate_layers(width: usize, depth: usize) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(width * depth);
    for level in 0..depth {
        for w in 0..width {
            let i = level * width + w;
            let mut task = quest(i);
            if level > 0 {
                for prev in 0..width {
                    require(&mut task, (level - 1) * width + prev, &[]);
                }
            }
            if w + 1 < width {
                task.alternatives.push(format!("q{}", i + 1));
            }
            if level % 2 == 1 {
                task.faction_name = Some("BEAR".to_string());
            }
            tasks.push(task);
        }
    }
    tasks
}

fn benchmark_invalidity_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalidity_chain");

    for depth in [50, 200, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let tasks = generate_chain(depth);
            let completions: Completions =
                [("q0".to_string(), TaskCompletion::failed())].into_iter().collect();
            b.iter(|| black_box(compute_invalidity(&tasks, &completions, Faction::Usec)));
        });
    }

    group.finish();
}

fn benchmark_invalidity_layers(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalidity_layers");

    for (width, depth) in [(5, 10), (10, 10), (10, 50)] {
        let label = format!("w{width}_d{depth}");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(width, depth),
            |b, &(width, depth)| {
                let tasks = generate_layers(width, depth);
                let completions: Completions = (0..width)
                    .map(|w| (format!("q{w}"), TaskCompletion::completed()))
                    .collect();
                b.iter(|| black_box(compute_invalidity(&tasks, &completions, Faction::Usec)));
            },
        );
    }

    group.finish();
}

fn benchmark_build_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_forest");

    for depth in [100, 500, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let tasks = generate_chain(depth);
            let visible: Vec<Task> = tasks.iter().step_by(7).cloned().collect();
            b.iter(|| black_box(build_forest(&tasks, &visible).len()));
        });
    }

    group.finish();
}

fn benchmark_mark_available(c: &mut Criterion) {
    let mut group = c.benchmark_group("mark_available");

    for width in [5, 20, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let tasks = generate_layers(width, 4);
            let index = TaskGraphIndex::new(&tasks);
            let completions = Completions::new();
            let target = format!("q{}", width * 3);
            b.iter(|| {
                black_box(ActionCascader::new(&index, &completions).mark_available(&target))
            });
        });
    }

    group.finish();
}

fn benchmark_index_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_construction");

    for (width, depth) in [(10, 10), (10, 50)] {
        let label = format!("w{width}_d{depth}");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(width, depth),
            |b, &(width, depth)| {
                let tasks = generate_layers(width, depth);
                b.iter(|| black_box(TaskGraphIndex::new(&tasks).edge_count()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_invalidity_chain,
    benchmark_invalidity_layers,
    benchmark_build_forest,
    benchmark_mark_available,
    benchmark_index_construction,
);

criterion_main!(benches);
