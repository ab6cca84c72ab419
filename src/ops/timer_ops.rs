use std::str::FromStr;

use crate::model::{Forest, Task, TaskId, Timer};
use crate::ops::task_ops::TaskError;
use crate::ops::tree;

/// A timer command aimed at one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Start,
    Pause,
    /// Remove the timer entirely
    Reset,
    /// Add five minutes and run
    Extend,
}

impl FromStr for TimerControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TimerControl::Start),
            "pause" => Ok(TimerControl::Pause),
            "reset" => Ok(TimerControl::Reset),
            "extend" => Ok(TimerControl::Extend),
            other => Err(format!("unknown timer control: {}", other)),
        }
    }
}

/// Create or overwrite a task's timer: full and idle
pub fn set_timer(forest: &Forest, id: &TaskId, duration_secs: u32) -> Result<Forest, TaskError> {
    let timer = Timer::new(duration_secs).ok_or(TaskError::InvalidDuration)?;
    Ok(tree::find_and_replace(forest, id, |t| Task {
        timer: Some(timer),
        ..t.clone()
    }))
}

/// Apply a start/pause/reset/extend to a task's timer.
///
/// Start, pause and reset do nothing on a task without a timer. Extend on
/// such a task starts a fresh five-minute timer.
pub fn control_timer(forest: &Forest, id: &TaskId, control: TimerControl) -> Forest {
    let Some(task) = tree::find(forest, id) else {
        return forest.clone();
    };
    let next = match (control, task.timer) {
        (TimerControl::Reset, _) => None,
        (TimerControl::Extend, None) => Some(Timer::extension()),
        (_, None) => return forest.clone(),
        (TimerControl::Start, Some(timer)) => Some(timer.started()),
        (TimerControl::Pause, Some(timer)) => Some(timer.paused()),
        (TimerControl::Extend, Some(timer)) => Some(timer.extended()),
    };
    if next == task.timer {
        return forest.clone();
    }
    tree::find_and_replace(forest, id, |t| Task {
        timer: next,
        ..t.clone()
    })
}

/// Result of one global tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub forest: Forest,
    /// Tasks whose timer reached zero on this tick, in pre-order
    pub finished: Vec<TaskId>,
}

/// Advance every running timer by one second.
///
/// Timers that reach zero become finished and are reported exactly once.
/// Subtrees without a running timer are shared with the input; with no
/// running timers at all the input forest is returned.
pub fn tick(forest: &Forest) -> TickOutcome {
    let mut finished = Vec::new();
    let next = tree::map_forest(forest, |t| {
        let (timer, just_finished) = t.timer?.ticked()?;
        if just_finished {
            finished.push(t.id.clone());
        }
        Some(Task {
            timer: Some(timer),
            ..t.clone()
        })
    });
    // map_forest visits children first; report in display order
    if finished.len() > 1 {
        let order = tree::ids(&next);
        finished.sort_by_key(|id| order.iter().position(|o| o == id));
    }
    TickOutcome {
        forest: next,
        finished,
    }
}

/// True if any timer anywhere is counting down
pub fn has_running_timers(forest: &Forest) -> bool {
    let mut running = false;
    tree::walk(forest, &mut |t: &Task, _| {
        running |= t.timer.is_some_and(|timer| timer.is_running() && timer.remaining_secs > 0);
    });
    running
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskKind, TimerState};
    use crate::ops::tree::find;
    use std::sync::Arc;

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    fn timer_of(forest: &Forest, task: &str) -> Option<Timer> {
        find(forest, &id(task)).unwrap().timer
    }

    fn running(duration: u32, remaining: u32) -> Option<Timer> {
        Some(Timer {
            duration_secs: duration,
            remaining_secs: remaining,
            state: TimerState::Running,
        })
    }

    /// A{B, C}
    fn abc() -> Forest {
        Forest::new(vec![Task::with_id("A", "A", TaskKind::Todo).with_children(vec![
            Task::with_id("B", "B", TaskKind::Todo),
            Task::with_id("C", "C", TaskKind::Todo),
        ])])
    }

    #[test]
    fn test_set_timer() {
        let next = set_timer(&abc(), &id("B"), 1500).unwrap();
        assert_eq!(timer_of(&next, "B"), Timer::new(1500));
        assert!(matches!(
            set_timer(&abc(), &id("B"), 0),
            Err(TaskError::InvalidDuration)
        ));
    }

    #[test]
    fn test_set_timer_overwrites() {
        let forest = set_timer(&abc(), &id("B"), 60).unwrap();
        let forest = control_timer(&forest, &id("B"), TimerControl::Start);
        let forest = set_timer(&forest, &id("B"), 120).unwrap();
        assert_eq!(timer_of(&forest, "B"), Timer::new(120));
    }

    #[test]
    fn test_controls() {
        let forest = set_timer(&abc(), &id("B"), 60).unwrap();
        let forest = control_timer(&forest, &id("B"), TimerControl::Start);
        assert_eq!(timer_of(&forest, "B").unwrap().state, TimerState::Running);

        let forest = control_timer(&forest, &id("B"), TimerControl::Pause);
        assert_eq!(timer_of(&forest, "B").unwrap().state, TimerState::Paused);

        let forest = control_timer(&forest, &id("B"), TimerControl::Reset);
        assert_eq!(timer_of(&forest, "B"), None);
    }

    #[test]
    fn test_pause_idle_timer() {
        let forest = set_timer(&abc(), &id("B"), 60).unwrap();
        let paused = control_timer(&forest, &id("B"), TimerControl::Pause);
        assert_eq!(
            timer_of(&paused, "B"),
            Some(Timer {
                duration_secs: 60,
                remaining_secs: 60,
                state: TimerState::Paused,
            })
        );
        // a paused timer does not count down
        assert!(tick(&paused).forest.ptr_eq(&paused));
    }

    #[test]
    fn test_controls_without_timer() {
        let forest = abc();
        assert!(control_timer(&forest, &id("B"), TimerControl::Start).ptr_eq(&forest));
        assert!(control_timer(&forest, &id("B"), TimerControl::Pause).ptr_eq(&forest));
        assert!(control_timer(&forest, &id("B"), TimerControl::Reset).ptr_eq(&forest));
        assert!(control_timer(&forest, &id("zz"), TimerControl::Start).ptr_eq(&forest));

        let extended = control_timer(&forest, &id("B"), TimerControl::Extend);
        assert_eq!(timer_of(&extended, "B"), running(300, 300));
    }

    #[test]
    fn test_tick_example_scenario() {
        let forest = tree::find_and_replace(&abc(), &id("B"), |t| Task {
            timer: running(5, 1),
            ..t.clone()
        });
        let outcome = tick(&forest);
        assert_eq!(
            timer_of(&outcome.forest, "B"),
            Some(Timer {
                duration_secs: 5,
                remaining_secs: 0,
                state: TimerState::Finished,
            })
        );
        assert_eq!(outcome.finished, vec![id("B")]);
        // C untouched and shared
        assert!(Arc::ptr_eq(
            &forest.roots()[0].children[1],
            &outcome.forest.roots()[0].children[1]
        ));
        assert_eq!(outcome.forest.roots()[0].title, "A");

        // later ticks never fire again
        let again = tick(&outcome.forest);
        assert!(again.finished.is_empty());
        assert!(again.forest.ptr_eq(&outcome.forest));
    }

    #[test]
    fn test_tick_without_running_timers_is_identity() {
        let forest = set_timer(&abc(), &id("C"), 30).unwrap();
        let outcome = tick(&forest);
        assert!(outcome.forest.ptr_eq(&forest));
        assert!(outcome.finished.is_empty());
        assert!(!has_running_timers(&forest));
    }

    #[test]
    fn test_tick_counts_every_running_timer() {
        let forest = tree::find_and_replace(&abc(), &id("A"), |t| Task {
            timer: running(10, 10),
            ..t.clone()
        });
        let forest = tree::find_and_replace(&forest, &id("C"), |t| Task {
            timer: running(3, 3),
            ..t.clone()
        });
        assert!(has_running_timers(&forest));

        let mut current = forest;
        let mut fired = Vec::new();
        for _ in 0..12 {
            let outcome = tick(&current);
            fired.extend(outcome.finished);
            current = outcome.forest;
        }
        assert_eq!(fired, vec![id("C"), id("A")]);
        assert_eq!(timer_of(&current, "A").unwrap().remaining_secs, 0);
        assert!(!has_running_timers(&current));
    }

    #[test]
    fn test_finished_parent_and_child_same_tick_in_display_order() {
        let forest = tree::find_and_replace(&abc(), &id("A"), |t| Task {
            timer: running(5, 1),
            ..t.clone()
        });
        let forest = tree::find_and_replace(&forest, &id("B"), |t| Task {
            timer: running(5, 1),
            ..t.clone()
        });
        assert_eq!(tick(&forest).finished, vec![id("A"), id("B")]);
    }

    #[test]
    fn test_extend_after_finish_runs_again() {
        let forest = tree::find_and_replace(&abc(), &id("B"), |t| Task {
            timer: running(5, 1),
            ..t.clone()
        });
        let finished = tick(&forest).forest;
        let extended = control_timer(&finished, &id("B"), TimerControl::Extend);
        assert_eq!(timer_of(&extended, "B"), running(300, 300));

        let outcome = tick(&extended);
        assert_eq!(timer_of(&outcome.forest, "B").unwrap().remaining_secs, 299);
    }

    #[test]
    fn test_control_parse() {
        assert_eq!("extend".parse::<TimerControl>().unwrap(), TimerControl::Extend);
        assert!("stop".parse::<TimerControl>().is_err());
    }
}
