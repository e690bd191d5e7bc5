//! Derives which tasks and objectives are invalid for the current progress.
//!
//! Invalidation never touches stored progress. It is a pure function of the
//! task list, the completion map and the active faction, recomputed from
//! scratch on every call.
//!
//! Rules, evaluated in order over every task:
//!
//! 1. Faction mismatch marks the task and its objectives invalid, without
//!    cascading to dependents. A completed mismatched task stays valid.
//! 2. A `failed`-only requirement whose target was completed successfully
//!    invalidates the task and its transitive dependents.
//! 3. A completion/active requirement whose target failed invalidates the
//!    task and its transitive dependents.
//! 4. A successfully completed alternative invalidates the task's dependents
//!    but leaves the task itself valid.
//!
//! A successfully completed task is never invalid and stops any cascade.

use crate::{Completions, Faction, Task, TaskGraphIndex};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// Tasks and objectives that must be treated as invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invalidity {
    /// Invalid task ids.
    pub invalid_tasks: BTreeSet<String>,
    /// Invalid objective ids.
    pub invalid_objectives: BTreeSet<String>,
}

impl Invalidity {
    /// Whether `task_id` is invalid.
    #[must_use]
    pub fn is_task_invalid(&self, task_id: &str) -> bool {
        self.invalid_tasks.contains(task_id)
    }

    /// Whether `objective_id` is invalid.
    #[must_use]
    pub fn is_objective_invalid(&self, objective_id: &str) -> bool {
        self.invalid_objectives.contains(objective_id)
    }
}

/// Compute the invalid tasks and objectives.
///
/// Builds a fresh [`TaskGraphIndex`] over `tasks`; use
/// [`compute_invalidity_with_index`] to reuse one.
#[must_use]
pub fn compute_invalidity(
    tasks: &[Task],
    completions: &Completions,
    faction: Faction,
) -> Invalidity {
    let index = TaskGraphIndex::new(tasks);
    compute_invalidity_with_index(&index, completions, faction)
}

/// Compute the invalid tasks and objectives over a prebuilt index.
#[must_use]
pub fn compute_invalidity_with_index(
    index: &TaskGraphIndex<'_>,
    completions: &Completions,
    faction: Faction,
) -> Invalidity {
    let mut pass = InvalidationPass {
        index,
        completions,
        result: Invalidity::default(),
        processed: HashSet::new(),
    };

    pass.faction_mismatches(faction);
    pass.failed_only_requirements_completed();
    pass.required_tasks_failed();
    pass.alternatives_completed();

    debug!(
        "Invalidity for {}: {} tasks, {} objectives invalid",
        faction,
        pass.result.invalid_tasks.len(),
        pass.result.invalid_objectives.len()
    );

    pass.result
}

/// State for one `compute_invalidity` call.
///
/// `processed` is shared by every rule: once a task's dependents have been
/// walked, later rules only add marks and do not walk them again.
struct InvalidationPass<'i, 'a> {
    index: &'i TaskGraphIndex<'a>,
    completions: &'i Completions,
    result: Invalidity,
    processed: HashSet<NodeIndex>,
}

impl InvalidationPass<'_, '_> {
    fn nodes(&self) -> impl Iterator<Item = NodeIndex> + use<> {
        (0..self.index.task_count()).map(NodeIndex::new)
    }

    /// Mark a task and its objectives. Completed tasks are never marked.
    fn mark(&mut self, node: NodeIndex) {
        let task = self.index.task_at(node);
        if self.completions.is_completed(&task.id) {
            return;
        }
        self.result.invalid_tasks.insert(task.id.clone());
        self.result
            .invalid_objectives
            .extend(task.objective_ids().map(String::from));
    }

    fn faction_mismatches(&mut self, faction: Faction) {
        for node in self.nodes() {
            if !self.index.task_at(node).is_available_to(faction) {
                self.mark(node);
            }
        }
    }

    fn failed_only_requirements_completed(&mut self) {
        for node in self.nodes() {
            let task = self.index.task_at(node);
            let triggered = task.task_requirements.iter().any(|requirement| {
                requirement.is_failed_only()
                    && requirement
                        .task_id
                        .as_deref()
                        .is_some_and(|id| self.completions.is_completed(id))
            });
            if triggered {
                self.cascade(node, false);
            }
        }
    }

    fn required_tasks_failed(&mut self) {
        for node in self.nodes() {
            let task = self.index.task_at(node);
            let triggered = task.task_requirements.iter().any(|requirement| {
                requirement.requires_completion_or_active()
                    && requirement
                        .task_id
                        .as_deref()
                        .is_some_and(|id| self.completions.is_failed(id))
            });
            if triggered {
                self.cascade(node, false);
            }
        }
    }

    fn alternatives_completed(&mut self) {
        for node in self.nodes() {
            let task = self.index.task_at(node);
            let foreclosed = task
                .alternatives
                .iter()
                .any(|alternative| self.completions.is_completed(alternative));
            if foreclosed {
                self.cascade(node, true);
            }
        }
    }

    /// Invalidate `start` (unless `child_only`) and everything that depends on it.
    fn cascade(&mut self, start: NodeIndex, child_only: bool) {
        let mut to_process = vec![(start, child_only)];

        while let Some((node, child_only)) = to_process.pop() {
            let task = self.index.task_at(node);
            if self.completions.is_completed(&task.id) {
                trace!("Cascade stops at completed task '{}'", task.id);
                continue;
            }
            if !child_only {
                self.mark(node);
            }
            if !self.processed.insert(node) {
                continue;
            }
            trace!("Cascading invalidation from '{}'", task.id);
            to_process.extend(
                self.index
                    .dependents_of(node)
                    .map(|dependent| (dependent, false)),
            );
        }
    }
}
