//! Progress store capability and command application.
//!
//! The engine does not own progress. Callers supply a [`ProgressStore`] and
//! the commands of an [`ActionPlan`] are replayed against it in order.

use crate::{ActionEvent, ActionPlan, Completions, Error, Result, StateCommand, TaskCompletion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::debug;

/// Mutation primitives of an external progress store.
pub trait ProgressStore {
    /// Error raised by the store's backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Mark a task successfully complete.
    fn set_complete(&mut self, task_id: &str) -> std::result::Result<(), Self::Error>;
    /// Mark a task failed.
    fn set_failed(&mut self, task_id: &str) -> std::result::Result<(), Self::Error>;
    /// Clear a task's completion.
    fn set_uncompleted(&mut self, task_id: &str) -> std::result::Result<(), Self::Error>;
    /// Mark an objective done.
    fn set_objective_complete(&mut self, objective_id: &str)
    -> std::result::Result<(), Self::Error>;
    /// Mark an objective not done.
    fn set_objective_uncomplete(
        &mut self,
        objective_id: &str,
    ) -> std::result::Result<(), Self::Error>;
    /// Set an objective's progress count.
    fn set_objective_count(
        &mut self,
        objective_id: &str,
        count: u32,
    ) -> std::result::Result<(), Self::Error>;
    /// Set the player level.
    fn set_level(&mut self, level: u32) -> std::result::Result<(), Self::Error>;
    /// Current player level.
    fn level(&self) -> u32;
}

/// Apply one command to a store.
///
/// # Errors
///
/// Returns [`Error::Store`] naming the command if the store rejects it.
pub fn apply_command<S: ProgressStore>(store: &mut S, command: &StateCommand) -> Result<()> {
    let outcome = match command {
        StateCommand::SetComplete { task_id } => store.set_complete(task_id),
        StateCommand::SetFailed { task_id } => store.set_failed(task_id),
        StateCommand::SetUncompleted { task_id } => store.set_uncompleted(task_id),
        StateCommand::SetObjectiveComplete { objective_id } => {
            store.set_objective_complete(objective_id)
        }
        StateCommand::SetObjectiveUncomplete { objective_id } => {
            store.set_objective_uncomplete(objective_id)
        }
        StateCommand::SetObjectiveCount {
            objective_id,
            count,
        } => store.set_objective_count(objective_id, *count),
        StateCommand::RaiseLevelTo { level } => {
            if store.level() < *level {
                store.set_level(*level)
            } else {
                Ok(())
            }
        }
    };

    outcome.map_err(|source| Error::Store {
        command: command.to_string(),
        source: Box::new(source),
    })
}

/// Apply every command of `plan` in order, then notify `on_action`.
///
/// Stops at the first failing command; the observer is only called when the
/// whole plan was applied.
///
/// # Errors
///
/// Returns [`Error::Store`] if the store rejects a command.
pub fn apply_plan<S: ProgressStore>(
    store: &mut S,
    plan: &ActionPlan,
    on_action: Option<&mut dyn FnMut(&ActionEvent)>,
) -> Result<()> {
    for command in &plan.commands {
        apply_command(store, command)?;
    }
    debug!(
        "Applied {} commands for '{}' on '{}'",
        plan.commands.len(),
        plan.action,
        plan.task_id
    );

    if let (Some(callback), Some(event)) = (on_action, plan.event.as_ref()) {
        callback(event);
    }
    Ok(())
}

/// Progress of a single objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveProgress {
    /// Whether the objective is done.
    pub complete: bool,
    /// Progress count for multi-step objectives.
    pub count: u32,
}

/// A simple in-memory [`ProgressStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InMemoryProgress {
    /// Task completion state.
    pub tasks: Completions,
    /// Objective progress keyed by objective id.
    pub objectives: HashMap<String, ObjectiveProgress>,
    /// Player level.
    pub level: u32,
}

impl InMemoryProgress {
    /// Create an empty store at `level`.
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Snapshot of task completions, ready for the engine.
    #[must_use]
    pub fn completions(&self) -> Completions {
        self.tasks.clone()
    }

    /// Progress for an objective, defaulting to not started.
    #[must_use]
    pub fn objective(&self, objective_id: &str) -> ObjectiveProgress {
        self.objectives
            .get(objective_id)
            .copied()
            .unwrap_or_default()
    }
}

impl ProgressStore for InMemoryProgress {
    type Error = Infallible;

    fn set_complete(&mut self, task_id: &str) -> std::result::Result<(), Infallible> {
        self.tasks.insert(task_id, TaskCompletion::completed());
        Ok(())
    }

    fn set_failed(&mut self, task_id: &str) -> std::result::Result<(), Infallible> {
        self.tasks.insert(task_id, TaskCompletion::failed());
        Ok(())
    }

    fn set_uncompleted(&mut self, task_id: &str) -> std::result::Result<(), Infallible> {
        self.tasks.remove(task_id);
        Ok(())
    }

    fn set_objective_complete(&mut self, objective_id: &str) -> std::result::Result<(), Infallible> {
        self.objectives
            .entry(objective_id.to_string())
            .or_default()
            .complete = true;
        Ok(())
    }

    fn set_objective_uncomplete(
        &mut self,
        objective_id: &str,
    ) -> std::result::Result<(), Infallible> {
        self.objectives
            .entry(objective_id.to_string())
            .or_default()
            .complete = false;
        Ok(())
    }

    fn set_objective_count(
        &mut self,
        objective_id: &str,
        count: u32,
    ) -> std::result::Result<(), Infallible> {
        self.objectives
            .entry(objective_id.to_string())
            .or_default()
            .count = count;
        Ok(())
    }

    fn set_level(&mut self, level: u32) -> std::result::Result<(), Infallible> {
        self.level = level;
        Ok(())
    }

    fn level(&self) -> u32 {
        self.level
    }
}
