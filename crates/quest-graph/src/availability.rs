//! Derived per-task state: locked, available, complete or failed.

use crate::{Completions, Faction, Invalidity, StatusTag, Task, TaskGraphIndex, TaskRequirement};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Derived state of a task for the current player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Not yet takeable, or unknown.
    Locked,
    /// All gates are satisfied.
    Available,
    /// Successfully completed.
    Complete,
    /// Failed.
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Available => write!(f, "available"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Inputs needed to derive task states.
#[derive(Debug, Clone, Copy)]
pub struct StateContext<'c, 'a> {
    /// Index over the task list.
    pub index: &'c TaskGraphIndex<'a>,
    /// Stored progress.
    pub completions: &'c Completions,
    /// Result of invalidation for the same inputs.
    pub invalidity: &'c Invalidity,
    /// Active faction.
    pub faction: Faction,
    /// Current player level.
    pub player_level: u32,
}

impl StateContext<'_, '_> {
    /// Derive the state of `task_id`. Unknown ids are [`TaskState::Locked`].
    #[must_use]
    pub fn task_state(&self, task_id: &str) -> TaskState {
        let Some(task) = self.index.get(task_id) else {
            return TaskState::Locked;
        };
        let completion = self.completions.get(task_id);
        if completion.failed {
            TaskState::Failed
        } else if completion.complete {
            TaskState::Complete
        } else if self.is_unlocked(task) {
            TaskState::Available
        } else {
            TaskState::Locked
        }
    }

    /// Ids of all currently available tasks.
    #[must_use]
    pub fn available_tasks(&self) -> BTreeSet<String> {
        self.index
            .tasks()
            .iter()
            .filter(|task| self.task_state(&task.id) == TaskState::Available)
            .map(|task| task.id.clone())
            .collect()
    }

    fn is_unlocked(&self, task: &Task) -> bool {
        !self.invalidity.is_task_invalid(&task.id)
            && task.is_available_to(self.faction)
            && task.min_player_level <= self.player_level
            && task
                .task_requirements
                .iter()
                .all(|requirement| self.is_requirement_met(requirement))
    }

    fn is_requirement_met(&self, requirement: &TaskRequirement) -> bool {
        let Some(target) = requirement.task_id.as_deref() else {
            return true;
        };
        if !self.index.contains(target) {
            return true;
        }
        if requirement.status.is_empty() {
            return self.completions.is_completed(target);
        }
        requirement.status.iter().any(|tag| match tag {
            // "Accepted" cannot be observed, so it is treated as completion.
            StatusTag::Complete | StatusTag::Active | StatusTag::Accepted => {
                self.completions.is_completed(target)
            }
            StatusTag::Failed => self.completions.is_failed(target),
            StatusTag::Unrecognized => true,
        })
    }
}
