//! Quest dependency graph engine for questline.
//!
//! This crate keeps a consistent derived view of a large, externally sourced
//! quest dataset as a player's progress changes. The dataset is not trusted:
//! links may dangle, ids may be missing, and both the requirement graph and
//! the parent/child hierarchy may contain cycles.
//!
//! # Key Types
//!
//! - [`TaskGraphIndex`]: id lookups and the reverse "required-by" adjacency
//! - [`build_forest`]: cycle-safe display forest over parent/child links
//! - [`compute_invalidity`]: tasks and objectives invalidated by progress and faction
//! - [`ActionCascader`]: the state changes implied by a single user action
//! - [`StateContext`]: derived locked/available/complete/failed state
//!
//! Everything is a pure function of its inputs. Callers own the task list
//! and completion map and re-run the engine after every change.
//!
//! # Example
//!
//! ```
//! use questline_graph::{
//!     ActionCascader, Faction, InMemoryProgress, QuestDataset, TaskGraphIndex, apply_plan,
//!     compute_invalidity,
//! };
//!
//! let dataset = QuestDataset::from_json_str(
//!     r#"[
//!         {"id": "intro", "alternatives": ["other"]},
//!         {"id": "other"},
//!         {"id": "followup", "taskRequirements": [{"taskId": "intro", "status": []}]}
//!     ]"#,
//! )?;
//! let index = TaskGraphIndex::new(&dataset.tasks);
//!
//! let mut progress = InMemoryProgress::default();
//! let plan = ActionCascader::new(&index, &progress.completions()).mark_complete("other");
//! apply_plan(&mut progress, &plan, None)?;
//!
//! let invalid = compute_invalidity(&dataset.tasks, &progress.completions(), Faction::Usec);
//! assert!(invalid.is_task_invalid("followup"));
//! assert!(!invalid.is_task_invalid("intro"));
//! # Ok::<(), questline_graph::Error>(())
//! ```

mod availability;
mod cascade;
mod dataset;
mod error;
mod graph;
mod invalidation;
mod model;
mod store;
mod tree;
mod validation;

pub use availability::{StateContext, TaskState};
pub use cascade::{ActionCascader, ActionEvent, ActionPlan, StateCommand, TaskAction};
pub use dataset::{QuestDataset, completions_from_json_str};
pub use error::{Error, Result};
pub use graph::TaskGraphIndex;
pub use invalidation::{Invalidity, compute_invalidity, compute_invalidity_with_index};
pub use model::{
    ANY_FACTION, Completions, Faction, Objective, StatusTag, Task, TaskCompletion,
    TaskRequirement, UnknownFaction,
};
pub use store::{InMemoryProgress, ObjectiveProgress, ProgressStore, apply_command, apply_plan};
pub use tree::{Forest, TreeNode, build_forest, contains_task};
pub use validation::{DatasetIssue, LinkKind, ValidationReport, issue_counts, validate};
