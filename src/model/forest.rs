use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::task::{Subtree, Task, TaskKind};

/// The ordered sequence of root tasks.
///
/// Cloning is cheap: roots and child lists are reference-counted, and every
/// operation in `ops` returns a new forest that shares the subtrees it did
/// not touch. An operation that changes nothing hands back a forest for
/// which [`Forest::ptr_eq`] holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    roots: Arc<Vec<Subtree>>,
}

impl Forest {
    pub fn new(roots: Vec<Task>) -> Self {
        Forest::from_subtrees(roots.into_iter().map(Arc::new).collect())
    }

    pub fn from_subtrees(roots: Vec<Subtree>) -> Self {
        Forest {
            roots: Arc::new(roots),
        }
    }

    pub fn roots(&self) -> &[Subtree] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// True if both values are the very same forest (no rebuild happened)
    pub fn ptr_eq(&self, other: &Forest) -> bool {
        Arc::ptr_eq(&self.roots, &other.roots)
    }

    /// Total number of tasks at every depth
    pub fn len(&self) -> usize {
        self.roots.iter().map(|t| t.subtree_len()).sum()
    }

    /// The forest a fresh install starts with
    pub fn sample() -> Self {
        let mut dashboard = Task::with_id("sample-4", "Build personal dashboard", TaskKind::Todo)
            .with_children(vec![
                Task {
                    completed: true,
                    ..Task::with_id("sample-5", "Set up project structure", TaskKind::Todo)
                },
                Task::with_id("sample-6", "Implement data layer", TaskKind::Todo),
            ]);
        dashboard.collapsed = true;

        Forest::new(vec![
            Task::with_id("sample-1", "Morning Routine", TaskKind::Habit).with_children(vec![
                Task::with_id("sample-2", "Hydrate (500ml)", TaskKind::Habit),
                Task::with_id("sample-3", "Meditation (10m)", TaskKind::Habit),
            ]),
            dashboard,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_shape() {
        let forest = Forest::sample();
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(forest.len(), 6);
        assert!(!forest.roots()[0].collapsed);
        assert!(forest.roots()[1].collapsed);
        assert!(forest.roots()[1].children[0].completed);
    }

    #[test]
    fn clone_is_pointer_equal() {
        let forest = Forest::sample();
        let copy = forest.clone();
        assert!(forest.ptr_eq(&copy));
        assert!(!forest.ptr_eq(&Forest::sample()));
        assert_eq!(forest, Forest::sample());
    }

    #[test]
    fn serializes_as_a_plain_array() {
        let forest = Forest::new(vec![Task::with_id("a", "A", TaskKind::Todo)]);
        let json = serde_json::to_string(&forest).unwrap();
        assert!(json.starts_with('['));
        let back: Forest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, forest);
    }
}
