//! Data-quality report for quest datasets.
//!
//! The engine tolerates every defect listed here; this report only surfaces
//! them so a loader can log or display them.

use crate::{Task, TaskGraphIndex};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Which kind of link a dangling reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A `taskRequirements` entry.
    Requirement,
    /// An `alternatives` entry.
    Alternative,
    /// A `predecessors` entry.
    Predecessor,
    /// A `parents` entry.
    Parent,
    /// A `children` entry.
    Child,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requirement => write!(f, "requirement"),
            Self::Alternative => write!(f, "alternative"),
            Self::Predecessor => write!(f, "predecessor"),
            Self::Parent => write!(f, "parent"),
            Self::Child => write!(f, "child"),
        }
    }
}

/// A defect found in the source data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetIssue {
    /// Two tasks share an id.
    #[error("Duplicate task id '{task}'")]
    DuplicateTask {
        /// The repeated id.
        task: String,
    },

    /// An objective has no id.
    #[error("Task '{task}' has an objective without an id")]
    MissingObjectiveId {
        /// Owning task.
        task: String,
    },

    /// Two objectives of one task share an id.
    #[error("Task '{task}' repeats objective id '{objective}'")]
    DuplicateObjective {
        /// Owning task.
        task: String,
        /// The repeated objective id.
        objective: String,
    },

    /// A requirement names no task.
    #[error("Task '{task}' has a requirement without a target")]
    MissingRequirementTarget {
        /// Owning task.
        task: String,
    },

    /// A link points at a task that is not in the dataset.
    #[error("Task '{task}' has {kind} link to unknown task '{target}'")]
    UnknownTask {
        /// Owning task.
        task: String,
        /// The link type.
        kind: LinkKind,
        /// The missing id.
        target: String,
    },

    /// Requirements form a cycle.
    #[error("Requirement cycle between tasks: {}", tasks.join(", "))]
    RequirementCycle {
        /// Tasks in the strongly connected component.
        tasks: Vec<String>,
    },

    /// Parent/child links form a cycle.
    #[error("Parent/child cycle between tasks: {}", tasks.join(", "))]
    HierarchyCycle {
        /// Tasks in the strongly connected component.
        tasks: Vec<String>,
    },
}

/// Result of dataset validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Defects, in discovery order.
    pub issues: Vec<DatasetIssue>,
}

impl ValidationReport {
    /// Whether no defects were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Inspect a task list for data-quality defects.
#[must_use]
pub fn validate(tasks: &[Task]) -> ValidationReport {
    let index = TaskGraphIndex::new(tasks);
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            issues.push(DatasetIssue::DuplicateTask {
                task: task.id.clone(),
            });
        }
    }

    for task in tasks {
        check_objectives(task, &mut issues);
        check_links(task, &index, &mut issues);
    }

    for component in cycles(requirement_graph(tasks, &index)) {
        issues.push(DatasetIssue::RequirementCycle {
            tasks: ids(tasks, &component),
        });
    }
    for component in cycles(hierarchy_graph(tasks, &index)) {
        issues.push(DatasetIssue::HierarchyCycle {
            tasks: ids(tasks, &component),
        });
    }

    debug!("Validated {} tasks: {} issues", tasks.len(), issues.len());
    ValidationReport { issues }
}

fn check_objectives(task: &Task, issues: &mut Vec<DatasetIssue>) {
    let mut seen = HashSet::new();
    for objective in &task.objectives {
        match objective.id.as_deref() {
            None => issues.push(DatasetIssue::MissingObjectiveId {
                task: task.id.clone(),
            }),
            Some(id) if !seen.insert(id) => issues.push(DatasetIssue::DuplicateObjective {
                task: task.id.clone(),
                objective: id.to_string(),
            }),
            Some(_) => {}
        }
    }
}

fn check_links(task: &Task, index: &TaskGraphIndex<'_>, issues: &mut Vec<DatasetIssue>) {
    let mut unknown = |kind: LinkKind, target: &str| {
        if !index.contains(target) {
            issues.push(DatasetIssue::UnknownTask {
                task: task.id.clone(),
                kind,
                target: target.to_string(),
            });
        }
    };

    let mut missing_target = false;
    for requirement in &task.task_requirements {
        match requirement.task_id.as_deref() {
            Some(target) => unknown(LinkKind::Requirement, target),
            None => missing_target = true,
        }
    }
    for target in &task.alternatives {
        unknown(LinkKind::Alternative, target);
    }
    for target in &task.predecessors {
        unknown(LinkKind::Predecessor, target);
    }
    for target in &task.parents {
        unknown(LinkKind::Parent, target);
    }
    for target in &task.children {
        unknown(LinkKind::Child, target);
    }

    if missing_target {
        issues.push(DatasetIssue::MissingRequirementTarget {
            task: task.id.clone(),
        });
    }
}

/// Every requirement edge, regardless of status tags.
fn requirement_graph(tasks: &[Task], index: &TaskGraphIndex<'_>) -> DiGraph<(), ()> {
    edges_graph(tasks, index, |task| task.required_task_ids().collect())
}

fn hierarchy_graph(tasks: &[Task], index: &TaskGraphIndex<'_>) -> DiGraph<(), ()> {
    edges_graph(tasks, index, |task| {
        task.children.iter().map(String::as_str).collect()
    })
}

fn edges_graph<F>(tasks: &[Task], index: &TaskGraphIndex<'_>, targets: F) -> DiGraph<(), ()>
where
    F: Fn(&Task) -> Vec<&str>,
{
    let mut graph = DiGraph::with_capacity(tasks.len(), tasks.len());
    for _ in tasks {
        graph.add_node(());
    }
    for (position, task) in tasks.iter().enumerate() {
        for target in targets(task) {
            if let Some(node) = index.node_of(target) {
                graph.update_edge(NodeIndex::new(position), node, ());
            }
        }
    }
    graph
}

/// Strongly connected components that contain a cycle.
fn cycles(graph: DiGraph<(), ()>) -> Vec<Vec<NodeIndex>> {
    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        })
        .collect()
}

fn ids(tasks: &[Task], component: &[NodeIndex]) -> Vec<String> {
    let mut ids: Vec<String> = component
        .iter()
        .map(|node| tasks[node.index()].id.clone())
        .collect();
    ids.sort();
    ids
}

/// Count of issues per kind, for summaries.
#[must_use]
pub fn issue_counts(report: &ValidationReport) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for issue in &report.issues {
        let key = match issue {
            DatasetIssue::DuplicateTask { .. } => "duplicate_task",
            DatasetIssue::MissingObjectiveId { .. } => "missing_objective_id",
            DatasetIssue::DuplicateObjective { .. } => "duplicate_objective",
            DatasetIssue::MissingRequirementTarget { .. } => "missing_requirement_target",
            DatasetIssue::UnknownTask { .. } => "unknown_task",
            DatasetIssue::RequirementCycle { .. } => "requirement_cycle",
            DatasetIssue::HierarchyCycle { .. } => "hierarchy_cycle",
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}
