use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use super::timer::Timer;

/// Opaque, globally unique task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    /// A fresh random (v4 UUID) identifier
    pub fn generate() -> Self {
        TaskId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

/// Whether a task is a one-off todo or a recurring habit.
/// Purely descriptive: no operation behaves differently per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Todo,
    Habit,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Todo => "todo",
            TaskKind::Habit => "habit",
        }
    }

    /// `"habit"` (any case) is a habit, everything else is a todo
    pub fn parse_lenient(s: &str) -> TaskKind {
        if s.trim().eq_ignore_ascii_case("habit") {
            TaskKind::Habit
        } else {
            TaskKind::Todo
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskKind::Todo),
            "habit" => Ok(TaskKind::Habit),
            other => Err(format!("unknown task kind: {} (expected todo or habit)", other)),
        }
    }
}

/// A shared, immutable subtree. Rebuilt forests reuse untouched subtrees.
pub type Subtree = Arc<Task>;

/// A node of the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub kind: TaskKind,
    /// Only meaningful for leaves; internal nodes report aggregate progress
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub collapsed: bool,
    /// Subtasks, in display order
    #[serde(default)]
    pub children: Vec<Subtree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<Timer>,
}

impl Task {
    /// Create a new task with a fresh ID and default flags
    pub fn new(title: impl Into<String>, kind: TaskKind) -> Self {
        Task::with_id(TaskId::generate(), title, kind)
    }

    pub fn with_id(id: impl Into<TaskId>, title: impl Into<String>, kind: TaskKind) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            kind,
            completed: false,
            collapsed: false,
            children: Vec::new(),
            timer: None,
        }
    }

    /// Builder-style: replace the children
    pub fn with_children(mut self, children: Vec<Task>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True if `id` is this task or any of its descendants
    pub fn contains(&self, id: &TaskId) -> bool {
        self.id == *id || self.children.iter().any(|c| c.contains(id))
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_len()).sum::<usize>()
    }
}

/// A task suggested by the breakdown service. Carries no identity or
/// state until it is adopted into the forest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProposedTask {
    pub title: String,
    #[serde(rename = "type", alias = "kind", default, deserialize_with = "lenient_kind")]
    pub kind: TaskKind,
    #[serde(default)]
    pub children: Vec<ProposedTask>,
}

impl ProposedTask {
    /// True if this proposal or any proposal under it has a title that is
    /// empty once trimmed
    pub fn has_blank_title(&self) -> bool {
        self.title.trim().is_empty() || self.children.iter().any(ProposedTask::has_blank_title)
    }

    /// Turn the proposal into a real task, assigning fresh IDs and default
    /// flags throughout the subtree. Titles are trimmed.
    pub fn into_task(self) -> Task {
        Task::new(self.title.trim(), self.kind)
            .with_children(self.children.into_iter().map(ProposedTask::into_task).collect())
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<TaskKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(TaskKind::parse_lenient).unwrap_or_default())
}
