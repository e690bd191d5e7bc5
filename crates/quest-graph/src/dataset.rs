//! Loading task lists and completion maps from JSON.
//!
//! This is the data-loading boundary: status tags are normalized and nulls
//! are defaulted here so the engine never sees raw source shapes.

use crate::{Completions, Error, Result, Task};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// The `{"tasks": [...]}` form of a dataset.
#[derive(Deserialize)]
struct WrappedDataset {
    #[serde(default)]
    tasks: Option<Vec<Option<Task>>>,
}

/// A loaded task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestDataset {
    /// Tasks in source order.
    pub tasks: Vec<Task>,
}

impl QuestDataset {
    /// Parse a dataset from a JSON string.
    ///
    /// Accepts a bare array of tasks or an object with a `tasks` array.
    /// `null` entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] with the JSON path of the first value that
    /// does not fit the task model.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let de = &mut serde_json::Deserializer::from_str(json);
        Self::from_value(deserialize(de)?)
    }

    /// Parse a dataset from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the input is not a valid dataset.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let de = &mut serde_json::Deserializer::from_reader(reader);
        Self::from_value(deserialize(de)?)
    }

    /// Load a dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened, or [`Error::Parse`]
    /// if its contents are not a valid dataset.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        debug!(
            "Loaded {} tasks from '{}'",
            dataset.tasks.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Pick the top-level shape first so errors inside it keep their path.
    fn from_value(value: Value) -> Result<Self> {
        let raw: Vec<Option<Task>> = if value.is_object() {
            let wrapped: WrappedDataset = deserialize(value)?;
            wrapped.tasks.unwrap_or_default()
        } else {
            deserialize(value)?
        };
        let tasks: Vec<Task> = raw.into_iter().flatten().collect();
        debug!("Parsed dataset with {} tasks", tasks.len());
        Ok(Self { tasks })
    }
}

fn deserialize<'de, T, D>(de: D) -> Result<T>
where
    T: DeserializeOwned,
    D: serde::Deserializer<'de, Error = serde_json::Error>,
{
    serde_path_to_error::deserialize(de).map_err(Error::parse)
}

/// Parse a completion map (`{"taskId": {"complete": bool, "failed": bool}}`).
///
/// # Errors
///
/// Returns [`Error::Parse`] if the input is not an object of completions.
pub fn completions_from_json_str(json: &str) -> Result<Completions> {
    deserialize(&mut serde_json::Deserializer::from_str(json))
}
