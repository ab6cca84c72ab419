//! Structure-sharing traversal primitives over a [`Forest`].
//!
//! Every function here is pure: it takes the current forest and returns a
//! new one. Only the nodes on the path to a change are rebuilt; all other
//! subtrees are the same `Arc`s as in the input. When nothing changes the
//! input forest itself is returned.

use std::sync::Arc;

use crate::model::{Forest, Subtree, Task, TaskId};

// ---------------------------------------------------------------------------
// Lookup and walks
// ---------------------------------------------------------------------------

/// Find a task by ID at any depth.
pub fn find<'a>(forest: &'a Forest, id: &TaskId) -> Option<&'a Subtree> {
    find_in(forest.roots(), id)
}

fn find_in<'a>(nodes: &'a [Subtree], id: &TaskId) -> Option<&'a Subtree> {
    for node in nodes {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Depth-first, pre-order walk. The callback receives each task and its
/// depth (0 = root).
pub fn walk(forest: &Forest, f: &mut dyn FnMut(&Task, usize)) {
    walk_nodes(forest.roots(), 0, f);
}

fn walk_nodes(nodes: &[Subtree], depth: usize, f: &mut dyn FnMut(&Task, usize)) {
    for node in nodes {
        f(node.as_ref(), depth);
        walk_nodes(&node.children, depth + 1, f);
    }
}

/// All task IDs in pre-order
pub fn ids(forest: &Forest) -> Vec<TaskId> {
    let mut out = Vec::new();
    walk(forest, &mut |task: &Task, _| out.push(task.id.clone()));
    out
}

/// IDs of the ancestors of `id`, root first. `None` if `id` is not in the forest.
pub fn ancestors(forest: &Forest, id: &TaskId) -> Option<Vec<TaskId>> {
    fn search(nodes: &[Subtree], id: &TaskId, path: &mut Vec<TaskId>) -> bool {
        for node in nodes {
            if node.id == *id {
                return true;
            }
            path.push(node.id.clone());
            if search(&node.children, id, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut path = Vec::new();
    search(forest.roots(), id, &mut path).then_some(path)
}

/// Where `id` sits: its parent's ID (`None` at root level) and its index
/// among its siblings.
pub fn locate(forest: &Forest, id: &TaskId) -> Option<(Option<TaskId>, usize)> {
    fn search(nodes: &[Subtree], parent: Option<&TaskId>, id: &TaskId) -> Option<(Option<TaskId>, usize)> {
        for (i, node) in nodes.iter().enumerate() {
            if node.id == *id {
                return Some((parent.cloned(), i));
            }
            if let Some(found) = search(&node.children, Some(&node.id), id) {
                return Some(found);
            }
        }
        None
    }

    search(forest.roots(), None, id)
}

// ---------------------------------------------------------------------------
// Find-and-replace
// ---------------------------------------------------------------------------

/// Replace the task with `id` by `transform(task)`.
///
/// The ancestors of the match are rebuilt around the replacement; every
/// other subtree is shared. A missing `id` returns the input forest.
pub fn find_and_replace<F>(forest: &Forest, id: &TaskId, transform: F) -> Forest
where
    F: FnOnce(&Task) -> Task,
{
    let mut transform = Some(transform);
    match replace_in(forest.roots(), id, &mut transform) {
        Some(roots) => Forest::from_subtrees(roots),
        None => forest.clone(),
    }
}

fn replace_in<F>(nodes: &[Subtree], id: &TaskId, transform: &mut Option<F>) -> Option<Vec<Subtree>>
where
    F: FnOnce(&Task) -> Task,
{
    for (i, node) in nodes.iter().enumerate() {
        let replacement = if node.id == *id {
            let f = transform.take()?;
            f(node.as_ref())
        } else if let Some(children) = replace_in(&node.children, id, transform) {
            with_children(node, children)
        } else {
            continue;
        };
        let mut rebuilt = nodes.to_vec();
        rebuilt[i] = Arc::new(replacement);
        return Some(rebuilt);
    }
    None
}

// ---------------------------------------------------------------------------
// Recursive map
// ---------------------------------------------------------------------------

/// Rebuild the forest bottom-up.
///
/// `f` sees each task after its children have been mapped and returns a
/// replacement, or `None` to keep the task as is. Subtrees in which `f`
/// changed nothing are shared with the input.
pub fn map_forest<F>(forest: &Forest, mut f: F) -> Forest
where
    F: FnMut(&Task) -> Option<Task>,
{
    match map_nodes(forest.roots(), &mut f) {
        Some(roots) => Forest::from_subtrees(roots),
        None => forest.clone(),
    }
}

/// [`map_forest`] restricted to one task and its descendants.
pub fn map_subtree<F>(task: &Task, mut f: F) -> Task
where
    F: FnMut(&Task) -> Option<Task>,
{
    let base = match map_nodes(&task.children, &mut f) {
        Some(children) => with_children(task, children),
        None => task.clone(),
    };
    f(&base).unwrap_or(base)
}

fn map_nodes<F>(nodes: &[Subtree], f: &mut F) -> Option<Vec<Subtree>>
where
    F: FnMut(&Task) -> Option<Task>,
{
    let mut out: Option<Vec<Subtree>> = None;
    for (i, node) in nodes.iter().enumerate() {
        let mapped = match map_nodes(&node.children, f) {
            Some(children) => {
                let base = with_children(node, children);
                Some(f(&base).unwrap_or(base))
            }
            None => f(node.as_ref()),
        };
        match mapped {
            Some(task) => out
                .get_or_insert_with(|| nodes[..i].to_vec())
                .push(Arc::new(task)),
            None => {
                if let Some(out) = out.as_mut() {
                    out.push(Arc::clone(node));
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Recursive filter
// ---------------------------------------------------------------------------

/// Drop every task for which `keep` is false, together with its whole
/// subtree. Kept tasks have their children filtered the same way.
pub fn filter_forest<F>(forest: &Forest, mut keep: F) -> Forest
where
    F: FnMut(&Task) -> bool,
{
    match filter_nodes(forest.roots(), &mut keep) {
        Some(roots) => Forest::from_subtrees(roots),
        None => forest.clone(),
    }
}

fn filter_nodes<F>(nodes: &[Subtree], keep: &mut F) -> Option<Vec<Subtree>>
where
    F: FnMut(&Task) -> bool,
{
    let mut out: Option<Vec<Subtree>> = None;
    for (i, node) in nodes.iter().enumerate() {
        if !keep(node.as_ref()) {
            out.get_or_insert_with(|| nodes[..i].to_vec());
            continue;
        }
        match filter_nodes(&node.children, keep) {
            Some(children) => out
                .get_or_insert_with(|| nodes[..i].to_vec())
                .push(Arc::new(with_children(node, children))),
            None => {
                if let Some(out) = out.as_mut() {
                    out.push(Arc::clone(node));
                }
            }
        }
    }
    out
}

/// A copy of `task` with new children
fn with_children(task: &Task, children: Vec<Subtree>) -> Task {
    Task {
        id: task.id.clone(),
        title: task.title.clone(),
        kind: task.kind,
        completed: task.completed,
        collapsed: task.collapsed,
        children,
        timer: task.timer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskKind;
    use pretty_assertions::assert_eq;

    fn t(id: &str) -> Task {
        Task::with_id(id, id.to_uppercase(), TaskKind::Todo)
    }

    /// a{b{c}, d}, e
    fn sample() -> Forest {
        Forest::new(vec![
            t("a").with_children(vec![t("b").with_children(vec![t("c")]), t("d")]),
            t("e"),
        ])
    }

    #[test]
    fn find_at_any_depth() {
        let forest = sample();
        assert_eq!(find(&forest, &"c".into()).unwrap().title, "C");
        assert_eq!(find(&forest, &"e".into()).unwrap().title, "E");
        assert!(find(&forest, &"zz".into()).is_none());
    }

    #[test]
    fn walk_is_preorder_with_depth() {
        let mut seen = Vec::new();
        walk(&sample(), &mut |task: &Task, depth| {
            seen.push((task.id.to_string(), depth))
        });
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 1),
                ("e".to_string(), 0),
            ]
        );
    }

    #[test]
    fn ancestors_root_first() {
        let forest = sample();
        assert_eq!(
            ancestors(&forest, &"c".into()),
            Some(vec!["a".into(), "b".into()])
        );
        assert_eq!(ancestors(&forest, &"e".into()), Some(vec![]));
        assert_eq!(ancestors(&forest, &"zz".into()), None);
    }

    #[test]
    fn locate_gives_parent_and_index() {
        let forest = sample();
        assert_eq!(locate(&forest, &"e".into()), Some((None, 1)));
        assert_eq!(locate(&forest, &"d".into()), Some((Some("a".into()), 1)));
        assert_eq!(locate(&forest, &"c".into()), Some((Some("b".into()), 0)));
        assert_eq!(locate(&forest, &"zz".into()), None);
    }

    #[test]
    fn replace_rebuilds_only_the_path() {
        let forest = sample();
        let next = find_and_replace(&forest, &"c".into(), |task| Task {
            title: "changed".into(),
            ..task.clone()
        });

        assert_eq!(find(&next, &"c".into()).unwrap().title, "changed");
        // the path a → b → c is new
        assert!(!Arc::ptr_eq(&forest.roots()[0], &next.roots()[0]));
        // siblings off the path are shared
        assert!(Arc::ptr_eq(
            &forest.roots()[0].children[1],
            &next.roots()[0].children[1]
        ));
        assert!(Arc::ptr_eq(&forest.roots()[1], &next.roots()[1]));
        // the input is untouched
        assert_eq!(find(&forest, &"c".into()).unwrap().title, "C");
    }

    #[test]
    fn replace_missing_id_returns_same_forest() {
        let forest = sample();
        let next = find_and_replace(&forest, &"zz".into(), |task| task.clone());
        assert!(next.ptr_eq(&forest));
    }

    #[test]
    fn map_shares_unchanged_subtrees() {
        let forest = sample();
        let next = map_forest(&forest, |task| {
            (task.id.as_str() == "d").then(|| Task {
                completed: true,
                ..task.clone()
            })
        });
        assert!(find(&next, &"d".into()).unwrap().completed);
        assert!(Arc::ptr_eq(
            &forest.roots()[0].children[0],
            &next.roots()[0].children[0]
        ));
        assert!(Arc::ptr_eq(&forest.roots()[1], &next.roots()[1]));

        let untouched = map_forest(&forest, |_| None);
        assert!(untouched.ptr_eq(&forest));
    }

    #[test]
    fn map_sees_mapped_children() {
        // each node records how many of its children were already marked
        let forest = sample();
        let next = map_forest(&forest, |task| {
            let marked = task.children.iter().filter(|c| c.completed).count();
            Some(Task {
                completed: true,
                title: format!("{}:{}", task.id, marked),
                ..task.clone()
            })
        });
        assert_eq!(find(&next, &"a".into()).unwrap().title, "a:2");
        assert_eq!(find(&next, &"b".into()).unwrap().title, "b:1");
    }

    #[test]
    fn map_subtree_stays_inside() {
        let forest = sample();
        let a = find(&forest, &"a".into()).unwrap();
        let mapped = map_subtree(a, |task| {
            Some(Task {
                collapsed: true,
                ..task.clone()
            })
        });
        assert!(mapped.collapsed);
        assert!(mapped.children[0].children[0].collapsed);
    }

    #[test]
    fn filter_drops_whole_subtrees() {
        let forest = sample();
        let next = filter_forest(&forest, |task| task.id.as_str() != "b");
        assert_eq!(
            ids(&next),
            vec![TaskId::from("a"), TaskId::from("d"), TaskId::from("e")]
        );
        // orphans are not promoted
        assert!(find(&next, &"c".into()).is_none());
        assert!(Arc::ptr_eq(&forest.roots()[1], &next.roots()[1]));
    }

    #[test]
    fn filter_keeping_everything_returns_same_forest() {
        let forest = sample();
        assert!(filter_forest(&forest, |_| true).ptr_eq(&forest));
    }

    #[test]
    fn filter_root() {
        let next = filter_forest(&sample(), |task| task.id.as_str() != "a");
        assert_eq!(ids(&next), vec![TaskId::from("e")]);
    }
}
