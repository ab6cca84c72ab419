//! The forest controller: owns the single current forest, turns each user
//! intent into a pure operation, and publishes the result to the store.

use tracing::{debug, info, warn};

use crate::io::store::{Store, StoreError};
use crate::model::{Forest, ProposedTask, Task, TaskId, TaskKind};
use crate::ops::progress::{self, Progress};
use crate::ops::relocate::{self, DropPosition};
use crate::ops::task_ops::{self, TaskError};
use crate::ops::timer_ops::{self, TimerControl};
use crate::ops::tree;

/// Hook called once for every timer that reaches zero
pub trait Notifier {
    fn timer_finished(&self, task: &Task);
}

impl<F: Fn(&Task)> Notifier for F {
    fn timer_finished(&self, task: &Task) {
        self(task)
    }
}

/// Yes/no prompt required before destructive operations
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, question: &str) -> bool {
        self(question)
    }
}

/// Confirms everything (`--yes`)
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Controller<S: Store> {
    forest: Forest,
    store: S,
    key: String,
}

impl<S: Store> Controller<S> {
    /// Load the forest saved under `key`. Nothing saved, or anything
    /// unreadable, starts from the seed forest.
    pub fn open(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let forest = match store.load(&key) {
            Ok(Some(forest)) => forest,
            Ok(None) => {
                debug!(%key, "nothing stored yet, starting from sample tasks");
                Forest::sample()
            }
            Err(e) => {
                warn!(error = %e, "could not load tasks, starting from sample tasks");
                Forest::sample()
            }
        };
        Controller { forest, store, key }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        tree::find(&self.forest, id).map(|t| t.as_ref())
    }

    pub fn progress(&self, id: &TaskId) -> Option<Progress> {
        self.find(id).map(progress::compute_progress)
    }

    /// Save `next` and make it current. An unchanged forest is not saved.
    /// Returns whether anything changed.
    fn publish(&mut self, next: Forest) -> Result<bool, ControllerError> {
        if next.ptr_eq(&self.forest) {
            return Ok(false);
        }
        self.store.save(&self.key, &next)?;
        self.forest = next;
        Ok(true)
    }

    // ---- add / edit / delete ----

    pub fn add_root(&mut self, title: &str, kind: TaskKind) -> Result<TaskId, ControllerError> {
        let task = task_ops::new_task(title, kind)?;
        let id = task.id.clone();
        self.publish(task_ops::add_root(&self.forest, task))?;
        Ok(id)
    }

    /// Add under `parent`. Returns `None` if the parent does not exist.
    pub fn add_child(
        &mut self,
        parent: &TaskId,
        title: &str,
        kind: TaskKind,
    ) -> Result<Option<TaskId>, ControllerError> {
        let task = task_ops::new_task(title, kind)?;
        let id = task.id.clone();
        if self.publish(task_ops::add_child(&self.forest, parent, task))? {
            Ok(Some(id))
        } else {
            debug!(%parent, "add_child: parent not found");
            Ok(None)
        }
    }

    pub fn edit(&mut self, id: &TaskId, title: &str, kind: TaskKind) -> Result<bool, ControllerError> {
        let next = task_ops::edit(&self.forest, id, title, kind)?;
        self.publish(next)
    }

    /// Delete a task and its subtree after confirmation. Returns whether
    /// anything was deleted.
    pub fn delete(&mut self, id: &TaskId, confirm: &dyn Confirm) -> Result<bool, ControllerError> {
        let Some(task) = self.find(id) else {
            debug!(%id, "delete: task not found");
            return Ok(false);
        };
        let question = match task.subtree_len() - 1 {
            0 => format!("Delete \"{}\"?", task.title),
            1 => format!("Delete \"{}\" and its subtask?", task.title),
            n => format!("Delete \"{}\" and its {} subtasks?", task.title, n),
        };
        if !confirm.confirm(&question) {
            return Ok(false);
        }
        self.publish(task_ops::delete(&self.forest, id))
    }

    // ---- completion and folding ----

    /// Set completion on a task and its whole subtree. Without a value the
    /// task's effective completion is flipped.
    pub fn toggle_complete(&mut self, id: &TaskId, value: Option<bool>) -> Result<bool, ControllerError> {
        let next = match value {
            Some(completed) => task_ops::set_completed(&self.forest, id, completed),
            None => task_ops::toggle_completed(&self.forest, id),
        };
        self.publish(next)
    }

    pub fn toggle_collapse(&mut self, id: &TaskId) -> Result<bool, ControllerError> {
        let next = task_ops::toggle_collapsed(&self.forest, id);
        self.publish(next)
    }

    pub fn expand_all(&mut self) -> Result<bool, ControllerError> {
        let next = task_ops::set_all_collapsed(&self.forest, false);
        self.publish(next)
    }

    pub fn collapse_all(&mut self) -> Result<bool, ControllerError> {
        let next = task_ops::set_all_collapsed(&self.forest, true);
        self.publish(next)
    }

    // ---- relocation ----

    pub fn relocate(
        &mut self,
        dragged: &TaskId,
        target: &TaskId,
        position: DropPosition,
    ) -> Result<bool, ControllerError> {
        let next = relocate::relocate(&self.forest, dragged, target, position)?;
        self.publish(next)
    }

    // ---- timers ----

    pub fn set_timer(&mut self, id: &TaskId, duration_secs: u32) -> Result<bool, ControllerError> {
        let next = timer_ops::set_timer(&self.forest, id, duration_secs)?;
        self.publish(next)
    }

    pub fn control_timer(&mut self, id: &TaskId, control: TimerControl) -> Result<bool, ControllerError> {
        let next = timer_ops::control_timer(&self.forest, id, control);
        self.publish(next)
    }

    pub fn has_running_timers(&self) -> bool {
        timer_ops::has_running_timers(&self.forest)
    }

    /// Advance every running timer one second. The notifier hears about each
    /// finished timer once, after the new forest has been saved.
    pub fn tick(&mut self, notifier: &dyn Notifier) -> Result<Vec<TaskId>, ControllerError> {
        let outcome = timer_ops::tick(&self.forest);
        self.publish(outcome.forest)?;
        for id in &outcome.finished {
            if let Some(task) = self.find(id) {
                info!(%id, title = %task.title, "timer finished");
                notifier.timer_finished(task);
            }
        }
        Ok(outcome.finished)
    }

    // ---- bulk ----

    /// Remove every completed task (with its subtree) after confirmation
    pub fn clear_completed(&mut self, confirm: &dyn Confirm) -> Result<bool, ControllerError> {
        let next = task_ops::clear_completed(&self.forest);
        if next.ptr_eq(&self.forest) {
            return Ok(false);
        }
        let removed = self.forest.len() - next.len();
        if !confirm.confirm(&format!("Remove {} completed task(s)?", removed)) {
            return Ok(false);
        }
        self.publish(next)
    }

    /// Replace everything with the sample tasks after confirmation
    pub fn reset_to_sample(&mut self, confirm: &dyn Confirm) -> Result<bool, ControllerError> {
        if !confirm.confirm("Replace all tasks with the sample tasks?") {
            return Ok(false);
        }
        self.store.save(&self.key, &Forest::sample())?;
        self.forest = Forest::sample();
        Ok(true)
    }

    /// Adopt breakdown proposals under `parent` (looked up in the current
    /// forest) or at root level. Returns the IDs of the new top-level tasks.
    pub fn adopt_breakdown(
        &mut self,
        parent: Option<&TaskId>,
        proposals: Vec<ProposedTask>,
    ) -> Result<Vec<TaskId>, ControllerError> {
        let (next, added) = task_ops::adopt_proposals(&self.forest, parent, proposals)?;
        self.publish(next)?;
        Ok(added)
    }
}
