use std::iter::Sum;
use std::ops::Add;

use serde::Serialize;

use crate::model::{Forest, Task};

/// Completed leaves over total leaves in a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    /// Rounded percentage (half rounds up). An empty total reads as 0.
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((200 * self.done + self.total) / (2 * self.total)) as u8
    }

    pub fn is_complete(self) -> bool {
        self.done == self.total
    }
}

impl Add for Progress {
    type Output = Progress;

    fn add(self, other: Progress) -> Progress {
        Progress {
            done: self.done + other.done,
            total: self.total + other.total,
        }
    }
}

impl Sum for Progress {
    fn sum<I: Iterator<Item = Progress>>(iter: I) -> Progress {
        iter.fold(Progress::default(), Add::add)
    }
}

/// Leaf counts for a subtree. A leaf counts as one; an internal node's own
/// `completed` flag is ignored in favour of its descendants. Recomputed on
/// every call.
pub fn compute_progress(task: &Task) -> Progress {
    if task.is_leaf() {
        return Progress {
            done: usize::from(task.completed),
            total: 1,
        };
    }
    task.children.iter().map(|c| compute_progress(c)).sum()
}

/// Completion as the user sees it: aggregate for internal nodes, the flag
/// for leaves.
pub fn is_effectively_complete(task: &Task) -> bool {
    if task.is_leaf() {
        task.completed
    } else {
        compute_progress(task).is_complete()
    }
}

/// Progress summed over every root
pub fn forest_progress(forest: &Forest) -> Progress {
    forest.roots().iter().map(|t| compute_progress(t)).sum()
}
