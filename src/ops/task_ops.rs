use std::sync::Arc;

use tracing::debug;

use crate::model::{Forest, ProposedTask, Task, TaskId, TaskKind};
use crate::ops::progress::is_effectively_complete;
use crate::ops::tree;

/// Error type for task operations. Rejected operations leave the forest
/// untouched. A missing target ID is not an error: the operation is a no-op.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("timer duration must be greater than zero")]
    InvalidDuration,
    #[error("cannot drop task {0} onto itself")]
    SelfDrop(TaskId),
    #[error("cannot move task {dragged} inside its own subtree (target {target})")]
    DropIntoDescendant { dragged: TaskId, target: TaskId },
}

/// Trim a title, rejecting empty ones
pub fn validate_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Add / edit / delete
// ---------------------------------------------------------------------------

/// Build a new task from user input
pub fn new_task(title: &str, kind: TaskKind) -> Result<Task, TaskError> {
    Ok(Task::new(validate_title(title)?, kind))
}

/// Append a task at root level
pub fn add_root(forest: &Forest, task: Task) -> Forest {
    let mut roots = forest.roots().to_vec();
    roots.push(Arc::new(task));
    Forest::from_subtrees(roots)
}

/// Append a task under `parent`, expanding the parent so it is visible.
/// A missing parent leaves the forest unchanged.
pub fn add_child(forest: &Forest, parent: &TaskId, task: Task) -> Forest {
    add_children(forest, parent, vec![task])
}

fn add_children(forest: &Forest, parent: &TaskId, tasks: Vec<Task>) -> Forest {
    tree::find_and_replace(forest, parent, |p| {
        let mut p = p.clone();
        p.collapsed = false;
        p.children.extend(tasks.into_iter().map(Arc::new));
        p
    })
}

/// Change a task's title and kind
pub fn edit(forest: &Forest, id: &TaskId, title: &str, kind: TaskKind) -> Result<Forest, TaskError> {
    let title = validate_title(title)?;
    Ok(tree::find_and_replace(forest, id, |t| Task {
        title,
        kind,
        ..t.clone()
    }))
}

/// Remove a task and its entire subtree
pub fn delete(forest: &Forest, id: &TaskId) -> Forest {
    tree::filter_forest(forest, |t| t.id != *id)
}

/// Adopt breakdown proposals, under `parent` or at root level. Every node
/// gets a fresh ID and a trimmed title. A blank title anywhere rejects the
/// whole batch. If `parent` is given but no longer exists, nothing is added
/// and no IDs are returned.
pub fn adopt_proposals(
    forest: &Forest,
    parent: Option<&TaskId>,
    proposals: Vec<ProposedTask>,
) -> Result<(Forest, Vec<TaskId>), TaskError> {
    if proposals.iter().any(ProposedTask::has_blank_title) {
        return Err(TaskError::EmptyTitle);
    }
    if proposals.is_empty() {
        return Ok((forest.clone(), Vec::new()));
    }
    let tasks: Vec<Task> = proposals.into_iter().map(ProposedTask::into_task).collect();
    let ids: Vec<TaskId> = tasks.iter().map(|t| t.id.clone()).collect();

    match parent {
        Some(parent_id) => {
            let next = add_children(forest, parent_id, tasks);
            if next.ptr_eq(forest) {
                debug!(parent = %parent_id, "breakdown parent no longer exists");
                Ok((next, Vec::new()))
            } else {
                Ok((next, ids))
            }
        }
        None => {
            let mut roots = forest.roots().to_vec();
            roots.extend(tasks.into_iter().map(Arc::new));
            Ok((Forest::from_subtrees(roots), ids))
        }
    }
}

// ---------------------------------------------------------------------------
// Completion and folding
// ---------------------------------------------------------------------------

/// Set `completed` on a task and force the same value down its whole subtree
pub fn set_completed(forest: &Forest, id: &TaskId, completed: bool) -> Forest {
    tree::find_and_replace(forest, id, |t| {
        tree::map_subtree(t, |n| {
            (n.completed != completed).then(|| Task {
                completed,
                ..n.clone()
            })
        })
    })
}

/// Flip a task's effective completion (aggregate for internal nodes),
/// cascading the new value to its descendants
pub fn toggle_completed(forest: &Forest, id: &TaskId) -> Forest {
    match tree::find(forest, id) {
        Some(task) => {
            let target = !is_effectively_complete(task);
            set_completed(forest, id, target)
        }
        None => forest.clone(),
    }
}

pub fn toggle_collapsed(forest: &Forest, id: &TaskId) -> Forest {
    tree::find_and_replace(forest, id, |t| Task {
        collapsed: !t.collapsed,
        ..t.clone()
    })
}

/// Collapse or expand every task
pub fn set_all_collapsed(forest: &Forest, collapsed: bool) -> Forest {
    tree::map_forest(forest, |t| {
        (t.collapsed != collapsed).then(|| Task {
            collapsed,
            ..t.clone()
        })
    })
}

/// Drop every task marked completed, at any depth, with its subtree
pub fn clear_completed(forest: &Forest) -> Forest {
    tree::filter_forest(forest, |t| !t.completed)
}
