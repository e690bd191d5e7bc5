//! Action cascades: the state changes implied by a single user action.
//!
//! The cascader never mutates anything. Each action produces an
//! [`ActionPlan`] holding the ordered [`StateCommand`]s to apply to a
//! progress store, the prior state of every task it touches, and an
//! [`ActionEvent`] for messaging. See [`crate::apply_plan`] for applying it.

use crate::{Completions, Task, TaskCompletion, TaskGraphIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// A user action on a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskAction {
    /// Fill in everything required to make the task takeable.
    Available,
    /// Complete the task, foreclosing its alternatives.
    Complete,
    /// Clear the task and reset its alternatives.
    Uncomplete,
    /// Fail the task.
    Failed,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Complete => write!(f, "complete"),
            Self::Uncomplete => write!(f, "uncomplete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A single progress-store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "type")]
pub enum StateCommand {
    /// Mark a task successfully complete.
    SetComplete {
        /// Target task.
        task_id: String,
    },
    /// Mark a task failed.
    SetFailed {
        /// Target task.
        task_id: String,
    },
    /// Clear a task's completion.
    SetUncompleted {
        /// Target task.
        task_id: String,
    },
    /// Mark an objective done.
    SetObjectiveComplete {
        /// Target objective.
        objective_id: String,
    },
    /// Mark an objective not done.
    SetObjectiveUncomplete {
        /// Target objective.
        objective_id: String,
    },
    /// Set an objective's progress count.
    SetObjectiveCount {
        /// Target objective.
        objective_id: String,
        /// New count.
        count: u32,
    },
    /// Raise the player level to at least `level`.
    RaiseLevelTo {
        /// Level floor.
        level: u32,
    },
}

impl fmt::Display for StateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetComplete { task_id } => write!(f, "SetComplete({task_id})"),
            Self::SetFailed { task_id } => write!(f, "SetFailed({task_id})"),
            Self::SetUncompleted { task_id } => write!(f, "SetUncompleted({task_id})"),
            Self::SetObjectiveComplete { objective_id } => {
                write!(f, "SetObjectiveComplete({objective_id})")
            }
            Self::SetObjectiveUncomplete { objective_id } => {
                write!(f, "SetObjectiveUncomplete({objective_id})")
            }
            Self::SetObjectiveCount {
                objective_id,
                count,
            } => write!(f, "SetObjectiveCount({objective_id}, {count})"),
            Self::RaiseLevelTo { level } => write!(f, "RaiseLevelTo({level})"),
        }
    }
}

/// Observational notice of an applied action, for UI messaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    /// The acted-on task.
    pub task_id: String,
    /// Its display name.
    pub task_name: String,
    /// What was done.
    pub action: TaskAction,
    /// Message key describing the new status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_key: Option<&'static str>,
    /// Message key for offering an undo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_key: Option<&'static str>,
}

/// The full consequence of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    /// What was requested.
    pub action: TaskAction,
    /// The acted-on task id.
    pub task_id: String,
    /// Mutations in application order.
    pub commands: Vec<StateCommand>,
    /// Completion of every task touched by `commands`, before the action.
    pub prior_state: BTreeMap<String, TaskCompletion>,
    /// Message for observers. `None` when the task is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<ActionEvent>,
}

impl ActionPlan {
    fn empty(action: TaskAction, task_id: &str) -> Self {
        Self {
            action,
            task_id: task_id.to_string(),
            commands: Vec::new(),
            prior_state: BTreeMap::new(),
            event: None,
        }
    }

    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Ids of tasks whose completion the plan changes.
    pub fn touched_tasks(&self) -> impl Iterator<Item = &str> {
        self.prior_state.keys().map(String::as_str)
    }
}

/// Plans the cascading state changes for user actions.
#[derive(Debug, Clone, Copy)]
pub struct ActionCascader<'c, 'a> {
    index: &'c TaskGraphIndex<'a>,
    completions: &'c Completions,
}

impl<'c, 'a> ActionCascader<'c, 'a> {
    /// Create a cascader over the given task index and current progress.
    #[must_use]
    pub fn new(index: &'c TaskGraphIndex<'a>, completions: &'c Completions) -> Self {
        Self { index, completions }
    }

    /// Plan `action` on `task_id`.
    ///
    /// An unknown task id yields an empty plan without an event.
    #[must_use]
    pub fn plan(&self, action: TaskAction, task_id: &str) -> ActionPlan {
        let Some(task) = self.index.get(task_id) else {
            warn!("Ignoring '{}' action on unknown task '{}'", action, task_id);
            return ActionPlan::empty(action, task_id);
        };

        let mut builder = PlanBuilder::new(self.index, self.completions);
        let (status_key, undo_key) = match action {
            TaskAction::Available => {
                builder.make_available(task);
                ("quest.status.available", "quest.undo.available")
            }
            TaskAction::Complete => {
                builder.complete(task);
                ("quest.status.complete", "quest.undo.complete")
            }
            TaskAction::Uncomplete => {
                if builder.uncomplete(task) {
                    ("quest.status.failure_cleared", "quest.undo.uncomplete_failed")
                } else {
                    ("quest.status.uncomplete", "quest.undo.uncomplete")
                }
            }
            TaskAction::Failed => {
                builder.fail(task);
                ("quest.status.failed", "quest.undo.failed")
            }
        };

        debug!(
            "Planned '{}' on '{}': {} commands over {} tasks",
            action,
            task.id,
            builder.commands.len(),
            builder.prior_state.len()
        );

        ActionPlan {
            action,
            task_id: task.id.clone(),
            commands: builder.commands,
            prior_state: builder.prior_state,
            event: Some(ActionEvent {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
                action,
                status_key: Some(status_key),
                undo_key: Some(undo_key),
            }),
        }
    }

    /// Complete every requirement and predecessor of `task_id`.
    #[must_use]
    pub fn mark_available(&self, task_id: &str) -> ActionPlan {
        self.plan(TaskAction::Available, task_id)
    }

    /// Complete `task_id` and fail its alternatives.
    #[must_use]
    pub fn mark_complete(&self, task_id: &str) -> ActionPlan {
        self.plan(TaskAction::Complete, task_id)
    }

    /// Clear `task_id` and its alternatives.
    #[must_use]
    pub fn mark_uncomplete(&self, task_id: &str) -> ActionPlan {
        self.plan(TaskAction::Uncomplete, task_id)
    }

    /// Fail `task_id`.
    #[must_use]
    pub fn mark_failed(&self, task_id: &str) -> ActionPlan {
        self.plan(TaskAction::Failed, task_id)
    }
}

struct PlanBuilder<'c, 'a> {
    index: &'c TaskGraphIndex<'a>,
    completions: &'c Completions,
    commands: Vec<StateCommand>,
    prior_state: BTreeMap<String, TaskCompletion>,
}

impl<'c, 'a> PlanBuilder<'c, 'a> {
    fn new(index: &'c TaskGraphIndex<'a>, completions: &'c Completions) -> Self {
        Self {
            index,
            completions,
            commands: Vec::new(),
            prior_state: BTreeMap::new(),
        }
    }

    fn remember(&mut self, task_id: &str) {
        if !self.prior_state.contains_key(task_id) {
            self.prior_state
                .insert(task_id.to_string(), self.completions.get(task_id));
        }
    }

    fn set_complete(&mut self, task: &Task) {
        self.remember(&task.id);
        self.commands.push(StateCommand::SetComplete {
            task_id: task.id.clone(),
        });
        self.complete_objectives(task);
    }

    fn set_failed(&mut self, task: &Task) {
        self.remember(&task.id);
        self.commands.push(StateCommand::SetFailed {
            task_id: task.id.clone(),
        });
        self.complete_objectives(task);
    }

    fn set_uncompleted(&mut self, task: &Task) {
        self.remember(&task.id);
        self.commands.push(StateCommand::SetUncompleted {
            task_id: task.id.clone(),
        });
        self.reset_objectives(task);
    }

    fn complete_objectives(&mut self, task: &Task) {
        for objective in &task.objectives {
            let Some(id) = objective.id.as_deref() else {
                continue;
            };
            self.commands.push(StateCommand::SetObjectiveComplete {
                objective_id: id.to_string(),
            });
            if let Some(count) = objective.target_count() {
                self.commands.push(StateCommand::SetObjectiveCount {
                    objective_id: id.to_string(),
                    count,
                });
            }
        }
    }

    fn reset_objectives(&mut self, task: &Task) {
        for objective in &task.objectives {
            let Some(id) = objective.id.as_deref() else {
                continue;
            };
            self.commands.push(StateCommand::SetObjectiveUncomplete {
                objective_id: id.to_string(),
            });
            if objective.target_count().is_some() {
                self.commands.push(StateCommand::SetObjectiveCount {
                    objective_id: id.to_string(),
                    count: 0,
                });
            }
        }
    }

    fn raise_level(&mut self, task: &Task) {
        if task.min_player_level > 0 {
            self.commands.push(StateCommand::RaiseLevelTo {
                level: task.min_player_level,
            });
        }
    }

    fn lookup(&self, task_id: &str) -> Option<&'a Task> {
        let found = self.index.get(task_id);
        if found.is_none() {
            debug!("Skipping unknown task '{}' in cascade", task_id);
        }
        found
    }

    fn fail_alternatives(&mut self, task: &Task) {
        for alternative in &task.alternatives {
            if let Some(alternative) = self.lookup(alternative) {
                self.set_failed(alternative);
            }
        }
    }

    fn make_available(&mut self, task: &Task) {
        let mut handled = HashSet::new();

        for requirement in &task.task_requirements {
            let Some(required) = requirement
                .task_id
                .as_deref()
                .and_then(|id| self.lookup(id))
            else {
                continue;
            };
            if requirement.is_failed_only() {
                self.set_failed(required);
            } else {
                self.set_complete(required);
                self.fail_alternatives(required);
            }
            handled.insert(required.id.as_str());
        }

        for predecessor in &task.predecessors {
            if handled.contains(predecessor.as_str()) {
                continue;
            }
            if let Some(predecessor) = self.lookup(predecessor) {
                self.set_complete(predecessor);
                handled.insert(predecessor.id.as_str());
            }
        }

        self.raise_level(task);
    }

    fn complete(&mut self, task: &Task) {
        self.set_complete(task);
        self.fail_alternatives(task);
        self.raise_level(task);
    }

    /// Returns whether the task was failed before being cleared.
    fn uncomplete(&mut self, task: &Task) -> bool {
        let was_failed = self.completions.is_failed(&task.id);
        self.set_uncompleted(task);
        for alternative in &task.alternatives {
            if let Some(alternative) = self.lookup(alternative) {
                self.set_uncompleted(alternative);
            }
        }
        was_failed
    }

    fn fail(&mut self, task: &Task) {
        self.set_failed(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Objective, StatusTag, TaskRequirement};

    fn objective(id: &str, count: Option<u32>) -> Objective {
        Objective {
            id: Some(id.to_string()),
            count,
        }
    }

    fn task(id: &str) -> Task {
        Task {
            name: format!("Task {id}"),
            objectives: vec![objective(&format!("{id}-obj"), None)],
            ..Task::new(id)
        }
    }

    fn complete(id: &str) -> StateCommand {
        StateCommand::SetComplete {
            task_id: id.to_string(),
        }
    }

    fn failed(id: &str) -> StateCommand {
        StateCommand::SetFailed {
            task_id: id.to_string(),
        }
    }

    fn uncompleted(id: &str) -> StateCommand {
        StateCommand::SetUncompleted {
            task_id: id.to_string(),
        }
    }

    fn obj_complete(id: &str) -> StateCommand {
        StateCommand::SetObjectiveComplete {
            objective_id: id.to_string(),
        }
    }

    fn obj_uncomplete(id: &str) -> StateCommand {
        StateCommand::SetObjectiveUncomplete {
            objective_id: id.to_string(),
        }
    }

    #[test]
    fn test_mark_complete_fails_alternatives() {
        let mut q = task("q");
        q.alternatives.push("r".to_string());
        let tasks = vec![q, task("r")];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_complete("q");
        assert_eq!(
            plan.commands,
            vec![
                complete("q"),
                obj_complete("q-obj"),
                failed("r"),
                obj_complete("r-obj"),
            ]
        );
        let event = plan.event.unwrap();
        assert_eq!(event.task_name, "Task q");
        assert_eq!(event.action, TaskAction::Complete);
    }

    #[test]
    fn test_mark_complete_applies_counts_and_level() {
        let mut q = task("q");
        q.objectives.push(objective("kills", Some(5)));
        q.min_player_level = 15;
        let tasks = vec![q];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_complete("q");
        assert_eq!(
            plan.commands,
            vec![
                complete("q"),
                obj_complete("q-obj"),
                obj_complete("kills"),
                StateCommand::SetObjectiveCount {
                    objective_id: "kills".to_string(),
                    count: 5,
                },
                StateCommand::RaiseLevelTo { level: 15 },
            ]
        );
    }

    #[test]
    fn test_mark_available_with_failed_only_requirement() {
        let mut q = task("q");
        q.task_requirements.push(TaskRequirement {
            task_id: Some("a".to_string()),
            status: vec![StatusTag::Failed],
        });
        let tasks = vec![task("a"), q];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_available("q");
        assert_eq!(plan.commands, vec![failed("a"), obj_complete("a-obj")]);
        assert!(!plan.commands.contains(&complete("a")));
    }

    #[test]
    fn test_mark_available_completes_requirements_and_predecessors() {
        let mut a = task("a");
        a.alternatives.push("a-alt".to_string());
        let mut q = task("q");
        q.task_requirements.push(TaskRequirement {
            task_id: Some("a".to_string()),
            status: vec![StatusTag::Complete],
        });
        q.predecessors = vec!["a".to_string(), "root".to_string(), "ghost".to_string()];
        q.min_player_level = 3;
        let tasks = vec![task("root"), a, task("a-alt"), q];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_available("q");
        assert_eq!(
            plan.commands,
            vec![
                complete("a"),
                obj_complete("a-obj"),
                failed("a-alt"),
                obj_complete("a-alt-obj"),
                complete("root"),
                obj_complete("root-obj"),
                StateCommand::RaiseLevelTo { level: 3 },
            ]
        );
        assert!(!plan.commands.contains(&complete("q")));
    }

    #[test]
    fn test_mark_uncomplete_resets_alternatives() {
        let mut q = task("q");
        q.alternatives.push("r".to_string());
        q.objectives.push(objective("items", Some(3)));
        let tasks = vec![q, task("r")];
        let index = TaskGraphIndex::new(&tasks);
        let completions: Completions = [
            ("q", TaskCompletion::completed()),
            ("r", TaskCompletion::failed()),
        ]
        .into_iter()
        .collect();

        let plan = ActionCascader::new(&index, &completions).mark_uncomplete("q");
        assert_eq!(
            plan.commands,
            vec![
                uncompleted("q"),
                obj_uncomplete("q-obj"),
                obj_uncomplete("items"),
                StateCommand::SetObjectiveCount {
                    objective_id: "items".to_string(),
                    count: 0,
                },
                uncompleted("r"),
                obj_uncomplete("r-obj"),
            ]
        );
        assert_eq!(plan.prior_state["q"], TaskCompletion::completed());
        assert_eq!(plan.prior_state["r"], TaskCompletion::failed());
        assert_eq!(plan.touched_tasks().collect::<Vec<_>>(), vec!["q", "r"]);
        assert_eq!(
            plan.event.and_then(|e| e.status_key),
            Some("quest.status.uncomplete")
        );
    }

    #[test]
    fn test_mark_uncomplete_of_failed_task_uses_failure_keys() {
        let tasks = vec![task("q")];
        let index = TaskGraphIndex::new(&tasks);
        let completions: Completions = [("q", TaskCompletion::failed())].into_iter().collect();

        let plan = ActionCascader::new(&index, &completions).mark_uncomplete("q");
        let event = plan.event.unwrap();
        assert_eq!(event.status_key, Some("quest.status.failure_cleared"));
        assert_eq!(event.undo_key, Some("quest.undo.uncomplete_failed"));
    }

    #[test]
    fn test_mark_failed_force_completes_objectives() {
        let mut q = task("q");
        q.alternatives.push("r".to_string());
        let tasks = vec![q, task("r")];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_failed("q");
        assert_eq!(plan.commands, vec![failed("q"), obj_complete("q-obj")]);
    }

    #[test]
    fn test_unknown_task_yields_empty_plan() {
        let tasks = vec![task("q")];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_complete("ghost");
        assert!(plan.is_empty());
        assert!(plan.event.is_none());
    }

    #[test]
    fn test_objectives_without_ids_are_skipped() {
        let mut q = task("q");
        q.objectives.push(Objective::default());
        let tasks = vec![q];
        let index = TaskGraphIndex::new(&tasks);
        let completions = Completions::new();

        let plan = ActionCascader::new(&index, &completions).mark_failed("q");
        assert_eq!(plan.commands.len(), 2);
    }

    #[test]
    fn test_command_display() {
        assert_eq!(complete("a").to_string(), "SetComplete(a)");
        assert_eq!(
            StateCommand::RaiseLevelTo { level: 4 }.to_string(),
            "RaiseLevelTo(4)"
        );
    }
}
