//! Task corpus sources.
//!
//! The search engine never loads tasks itself; callers materialize a corpus
//! through a [`TaskSource`] and hand the slice to the service.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use crate::error::{Result, TaskSearchError};
use crate::types::Task;

/// Filters applied when fetching a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Keep only tasks carrying this label (case-insensitive).
    pub label: Option<String>,
    /// Keep only tasks in this category (case-insensitive).
    pub category: Option<String>,
    /// Keep only tasks whose priority is at most this value.
    pub max_priority: Option<u8>,
    pub include_completed: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if task.completed && !self.include_completed {
            return false;
        }
        if let Some(label) = &self.label {
            if !task.labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !task
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
            {
                return false;
            }
        }
        if let Some(max) = self.max_priority {
            if task.priority > max {
                return false;
            }
        }
        true
    }
}

/// Anything that can produce a corpus snapshot.
pub trait TaskSource: Send + Sync {
    fn get_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Entries dropped as malformed by the most recent `get_tasks` call.
    fn skipped(&self) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskSource {
    tasks: Vec<Task>,
}

impl InMemoryTaskSource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

impl TaskSource for InMemoryTaskSource {
    fn get_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Tasks read from a JSON file holding either an array of tasks or an
/// object with a `tasks` array.
///
/// The file is re-read on every call. Entries that do not parse as a task,
/// or lack an id or content, are skipped and counted.
#[derive(Debug)]
pub struct JsonFileTaskSource {
    path: PathBuf,
    skipped: AtomicUsize,
}

impl JsonFileTaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            skipped: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for JsonFileTaskSource {
    fn get_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            TaskSearchError::Corpus(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let (tasks, skipped) = parse_tasks(&contents)?;
        self.skipped.store(skipped, Ordering::Relaxed);
        if skipped > 0 {
            tracing::debug!(path = %self.path.display(), skipped, "skipped malformed task entries");
        }
        Ok(tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }

    fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// Parse a task document, returning the usable tasks and how many entries
/// were skipped. Only a document that is not a task list at all is an error.
pub fn parse_tasks(contents: &str) -> Result<(Vec<Task>, usize)> {
    let doc: Value = serde_json::from_str(contents)?;
    let entries = match doc {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tasks") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(TaskSearchError::Corpus(
                    "expected a JSON array or an object with a \"tasks\" array".into(),
                ))
            }
        },
        _ => {
            return Err(TaskSearchError::Corpus(
                "expected a JSON array or an object with a \"tasks\" array".into(),
            ))
        }
    };

    let mut tasks = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Task>(entry) {
            Ok(task) if task.is_searchable() => tasks.push(task),
            Ok(task) => {
                tracing::debug!(index, id = %task.id, "task without id or content");
                skipped += 1;
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "unparseable task entry");
                skipped += 1;
            }
        }
    }
    Ok((tasks, skipped))
}
