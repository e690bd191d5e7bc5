//! Data model for quest datasets and player progress.
//!
//! Source data is third-party and known to be sloppy, so every type here
//! deserializes leniently: `null` lists become empty, `null` entries inside
//! lists are dropped, and free-form requirement statuses are normalized into
//! [`StatusTag`] once, at load time.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Faction name that marks a task as available to every faction.
pub const ANY_FACTION: &str = "Any";

/// Normalized requirement status tag.
///
/// Unknown tags are kept as [`StatusTag::Unrecognized`] rather than dropped,
/// so a status list made only of garbage is still non-empty and does not
/// collapse into the "requires completion" default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum StatusTag {
    /// `complete` or `completed`.
    Complete,
    /// `active`.
    Active,
    /// `accept` or `accepted`.
    Accepted,
    /// `failed`.
    Failed,
    /// Anything else.
    Unrecognized,
}

impl StatusTag {
    /// Normalize a raw status string (trimmed, case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" => Self::Complete,
            "active" => Self::Active,
            "accept" | "accepted" => Self::Accepted,
            "failed" => Self::Failed,
            _ => Self::Unrecognized,
        }
    }

    /// Whether this tag asks for the required task to be completed or in progress.
    #[must_use]
    pub const fn implies_completion_or_active(self) -> bool {
        matches!(self, Self::Complete | Self::Active | Self::Accepted)
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Active => "active",
            Self::Accepted => "accepted",
            Self::Failed => "failed",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl From<String> for StatusTag {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<StatusTag> for &'static str {
    fn from(tag: StatusTag) -> Self {
        tag.as_str()
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player allegiance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Faction {
    /// USEC.
    Usec,
    /// BEAR.
    Bear,
}

impl Faction {
    /// Canonical name as it appears in task data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usec => "USEC",
            Self::Bear => "BEAR",
        }
    }
}

/// A faction name that is neither USEC nor BEAR.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown faction '{0}' (expected USEC or BEAR)")]
pub struct UnknownFaction(pub String);

impl FromStr for Faction {
    type Err = UnknownFaction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USEC" => Ok(Self::Usec),
            "BEAR" => Ok(Self::Bear),
            _ => Err(UnknownFaction(s.to_string())),
        }
    }
}

impl TryFrom<String> for Faction {
    type Error = UnknownFaction;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Faction> for &'static str {
    fn from(faction: Faction) -> Self {
        faction.as_str()
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trackable sub-step of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Objective {
    /// Identifier, unique within the owning task. Source data sometimes omits it.
    pub id: Option<String>,
    /// Target count for multi-step objectives.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_count"
    )]
    pub count: Option<u32>,
}

impl Objective {
    /// Declared target count, ignoring a nonsensical zero.
    #[must_use]
    pub fn target_count(&self) -> Option<u32> {
        self.count.filter(|&count| count > 0)
    }
}

/// A gating condition on another task's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRequirement {
    /// The task this requirement points at.
    #[serde(alias = "requiredTaskId")]
    pub task_id: Option<String>,
    /// Normalized status tags. Empty means "requires completion".
    #[serde(alias = "statusList", deserialize_with = "lenient_vec")]
    pub status: Vec<StatusTag>,
}

impl TaskRequirement {
    /// True if the list is empty or names complete/active/accepted.
    #[must_use]
    pub fn requires_completion_or_active(&self) -> bool {
        self.status.is_empty()
            || self
                .status
                .iter()
                .any(|tag| tag.implies_completion_or_active())
    }

    /// True iff the list names `failed` and nothing that implies completion.
    #[must_use]
    pub fn is_failed_only(&self) -> bool {
        self.status.contains(&StatusTag::Failed)
            && !self
                .status
                .iter()
                .any(|tag| tag.implies_completion_or_active())
    }
}

/// A quest-like unit of progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    /// Unique identifier.
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    /// Display name, used only in action events.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Ordered objectives.
    #[serde(deserialize_with = "lenient_vec")]
    pub objectives: Vec<Objective>,
    /// Typed requirements on other tasks.
    #[serde(deserialize_with = "lenient_vec")]
    pub task_requirements: Vec<TaskRequirement>,
    /// Mutually exclusive sibling tasks.
    #[serde(deserialize_with = "lenient_vec")]
    pub alternatives: Vec<String>,
    /// Legacy "must be complete" list.
    #[serde(deserialize_with = "lenient_vec")]
    pub predecessors: Vec<String>,
    /// Display hierarchy parents.
    #[serde(deserialize_with = "lenient_vec")]
    pub parents: Vec<String>,
    /// Display hierarchy children.
    #[serde(deserialize_with = "lenient_vec")]
    pub children: Vec<String>,
    /// Faction gate. `None` or `"Any"` means faction-agnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_name: Option<String>,
    /// Minimum player level to take the task.
    #[serde(deserialize_with = "lenient_u32")]
    pub min_player_level: u32,
    /// Experience reward.
    #[serde(deserialize_with = "lenient_u32")]
    pub experience: u32,
}

impl Task {
    /// Create a bare task with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Ids of all objectives that have one.
    pub fn objective_ids(&self) -> impl Iterator<Item = &str> {
        self.objectives.iter().filter_map(|o| o.id.as_deref())
    }

    /// Ids of every task named by a requirement.
    pub fn required_task_ids(&self) -> impl Iterator<Item = &str> {
        self.task_requirements
            .iter()
            .filter_map(|r| r.task_id.as_deref())
    }

    /// Whether the task is open to every faction.
    #[must_use]
    pub fn is_faction_agnostic(&self) -> bool {
        self.faction_name
            .as_deref()
            .is_none_or(|name| name == ANY_FACTION)
    }

    /// Whether the task may be taken by a player of `faction`.
    #[must_use]
    pub fn is_available_to(&self, faction: Faction) -> bool {
        self.is_faction_agnostic() || self.faction_name.as_deref() == Some(faction.as_str())
    }
}

/// Stored progress for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCompletion {
    /// The task was turned in (or closed by failing).
    pub complete: bool,
    /// The task was failed.
    pub failed: bool,
}

impl TaskCompletion {
    /// A successfully completed task.
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            complete: true,
            failed: false,
        }
    }

    /// A failed task. Failing closes the task, so `complete` is set as well.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            complete: true,
            failed: true,
        }
    }

    /// `complete && !failed`.
    #[must_use]
    pub const fn is_successful(self) -> bool {
        self.complete && !self.failed
    }
}

/// Per-task completion state keyed by task id.
///
/// Ids missing from the map read as "not started".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Completions(HashMap<String, TaskCompletion>);

impl Completions {
    /// Create an empty completion map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion for `task_id`, defaulting to not started.
    #[must_use]
    pub fn get(&self, task_id: &str) -> TaskCompletion {
        self.0.get(task_id).copied().unwrap_or_default()
    }

    /// `complete && !failed` for `task_id`.
    #[must_use]
    pub fn is_completed(&self, task_id: &str) -> bool {
        self.get(task_id).is_successful()
    }

    /// `failed` for `task_id`, regardless of `complete`.
    #[must_use]
    pub fn is_failed(&self, task_id: &str) -> bool {
        self.get(task_id).failed
    }

    /// Record the completion state of a task.
    pub fn insert(&mut self, task_id: impl Into<String>, completion: TaskCompletion) {
        self.0.insert(task_id.into(), completion);
    }

    /// Forget a task's progress.
    pub fn remove(&mut self, task_id: &str) {
        self.0.remove(task_id);
    }

    /// Number of tasks with recorded progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no progress is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over recorded entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TaskCompletion)> {
        self.0.iter().map(|(id, c)| (id.as_str(), *c))
    }
}

impl<K: Into<String>> FromIterator<(K, TaskCompletion)> for Completions {
    fn from_iter<I: IntoIterator<Item = (K, TaskCompletion)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Deserialize `null` as the type's default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a count that may be null, negative, fractional or a numeric
/// string. Anything that is not a `u32` reads as `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_count(deserializer)?.unwrap_or_default())
}

/// Deserialize a possibly-null list, dropping null entries.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}
