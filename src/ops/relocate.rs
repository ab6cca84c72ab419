//! Drag-and-drop relocation: remove a subtree and reinsert it relative to a
//! target, as one replacement of the forest value.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Forest, Subtree, TaskId};
use crate::ops::task_ops::TaskError;
use crate::ops::tree;

/// Where a dragged task lands relative to the drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// Sibling immediately before the target
    Before,
    /// Sibling immediately after the target
    After,
    /// Last child of the target
    Into,
}

impl fmt::Display for DropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropPosition::Before => write!(f, "before"),
            DropPosition::After => write!(f, "after"),
            DropPosition::Into => write!(f, "into"),
        }
    }
}

impl FromStr for DropPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" | "above" | "top" => Ok(DropPosition::Before),
            "after" | "below" | "bottom" => Ok(DropPosition::After),
            "into" | "child" | "under" => Ok(DropPosition::Into),
            other => Err(format!(
                "invalid drop position: {} (expected before, after or into)",
                other
            )),
        }
    }
}

/// Move the `dragged` subtree to `position` relative to `target`.
///
/// Dropping a task on itself or anywhere inside its own subtree is
/// rejected before anything is removed. If either task is missing the
/// forest is returned unchanged. The moved subtree keeps its structure;
/// dropping `Into` expands the target.
pub fn relocate(
    forest: &Forest,
    dragged: &TaskId,
    target: &TaskId,
    position: DropPosition,
) -> Result<Forest, TaskError> {
    if dragged == target {
        return Err(TaskError::SelfDrop(dragged.clone()));
    }
    let Some(subtree) = tree::find(forest, dragged).cloned() else {
        debug!(%dragged, "relocate: dragged task not found");
        return Ok(forest.clone());
    };
    if subtree.contains(target) {
        return Err(TaskError::DropIntoDescendant {
            dragged: dragged.clone(),
            target: target.clone(),
        });
    }
    let Some(target_task) = tree::find(forest, target) else {
        debug!(%target, "relocate: drop target not found");
        return Ok(forest.clone());
    };
    if already_there(forest, dragged, target_task, position) {
        debug!(%dragged, %target, %position, "relocate: task is already in place");
        return Ok(forest.clone());
    }

    let without = tree::filter_forest(forest, |t| t.id != *dragged);
    Ok(insert(&without, target, subtree, position))
}

/// True if dropping `dragged` at `position` relative to `target` would put
/// it back where it is now
fn already_there(forest: &Forest, dragged: &TaskId, target: &Subtree, position: DropPosition) -> bool {
    let (Some((from_parent, from)), Some((to_parent, to))) =
        (tree::locate(forest, dragged), tree::locate(forest, &target.id))
    else {
        return false;
    };
    match position {
        DropPosition::Before => from_parent == to_parent && from + 1 == to,
        DropPosition::After => from_parent == to_parent && from == to + 1,
        DropPosition::Into => {
            from_parent.as_ref() == Some(&target.id)
                && from + 1 == target.children.len()
                && !target.collapsed
        }
    }
}

/// Insert an existing subtree relative to `target`. A missing target
/// leaves the forest unchanged.
pub fn insert(forest: &Forest, target: &TaskId, subtree: Subtree, position: DropPosition) -> Forest {
    match position {
        DropPosition::Into => tree::find_and_replace(forest, target, |t| {
            let mut t = t.clone();
            t.collapsed = false;
            t.children.push(subtree);
            t
        }),
        DropPosition::Before | DropPosition::After => {
            let after = position == DropPosition::After;
            match splice(forest.roots(), target, &subtree, after) {
                Some(roots) => Forest::from_subtrees(roots),
                None => forest.clone(),
            }
        }
    }
}

/// Insert `subtree` into whichever sibling list holds `target`
fn splice(nodes: &[Subtree], target: &TaskId, subtree: &Subtree, after: bool) -> Option<Vec<Subtree>> {
    if let Some(idx) = nodes.iter().position(|n| n.id == *target) {
        let mut out = nodes.to_vec();
        out.insert(idx + usize::from(after), Arc::clone(subtree));
        return Some(out);
    }
    for (i, node) in nodes.iter().enumerate() {
        if let Some(children) = splice(&node.children, target, subtree, after) {
            let mut parent = node.as_ref().clone();
            parent.children = children;
            let mut out = nodes.to_vec();
            out[i] = Arc::new(parent);
            return Some(out);
        }
    }
    None
}
