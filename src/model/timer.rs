use serde::{Deserialize, Serialize};

/// Seconds added by an extend
pub const EXTEND_SECS: u32 = 300;

/// Countdown lifecycle: idle → running ⇄ paused, idle → paused,
/// running → finished, finished → running (extend only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

impl TimerState {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Finished => "finished",
        }
    }
}

/// A per-task countdown. `remaining_secs` never exceeds `duration_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub state: TimerState,
}

impl Timer {
    /// A full, idle timer. Returns `None` for a zero duration.
    pub fn new(duration_secs: u32) -> Option<Self> {
        (duration_secs > 0).then_some(Timer {
            duration_secs,
            remaining_secs: duration_secs,
            state: TimerState::Idle,
        })
    }

    /// A running five-minute timer, for extending a task that had none
    pub fn extension() -> Self {
        Timer {
            duration_secs: EXTEND_SECS,
            remaining_secs: EXTEND_SECS,
            state: TimerState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Idle or paused → running. A finished timer stays finished.
    pub fn started(self) -> Self {
        match self.state {
            TimerState::Idle | TimerState::Paused => Timer {
                state: TimerState::Running,
                ..self
            },
            TimerState::Running | TimerState::Finished => self,
        }
    }

    /// Any state → paused, except that a finished timer stays finished
    /// until it is extended, reset or set again.
    pub fn paused(self) -> Self {
        match self.state {
            TimerState::Finished => self,
            _ => Timer {
                state: TimerState::Paused,
                ..self
            },
        }
    }

    /// Add five minutes and force running. The duration grows with the
    /// remaining time when needed.
    pub fn extended(self) -> Self {
        let remaining_secs = self.remaining_secs.saturating_add(EXTEND_SECS);
        Timer {
            duration_secs: self.duration_secs.max(remaining_secs),
            remaining_secs,
            state: TimerState::Running,
        }
    }

    /// Advance by one second. Returns `None` when the timer is not counting
    /// down, otherwise the new timer and whether this tick finished it.
    pub fn ticked(self) -> Option<(Self, bool)> {
        if self.state != TimerState::Running || self.remaining_secs == 0 {
            return None;
        }
        let remaining_secs = self.remaining_secs - 1;
        if remaining_secs == 0 {
            Some((
                Timer {
                    remaining_secs: 0,
                    state: TimerState::Finished,
                    ..self
                },
                true,
            ))
        } else {
            Some((
                Timer {
                    remaining_secs,
                    ..self
                },
                false,
            ))
        }
    }

    /// Percentage of the duration already elapsed, 0–100
    pub fn elapsed_percent(&self) -> u8 {
        if self.duration_secs == 0 {
            return 0;
        }
        let elapsed = self.duration_secs.saturating_sub(self.remaining_secs) as u64;
        ((elapsed * 100) / self.duration_secs as u64) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(duration: u32, remaining: u32) -> Timer {
        Timer {
            duration_secs: duration,
            remaining_secs: remaining,
            state: TimerState::Running,
        }
    }

    #[test]
    fn new_rejects_zero() {
        assert!(Timer::new(0).is_none());
        let t = Timer::new(90).unwrap();
        assert_eq!(t.remaining_secs, 90);
        assert_eq!(t.state, TimerState::Idle);
    }

    #[test]
    fn start_and_pause() {
        let t = Timer::new(10).unwrap().started();
        assert_eq!(t.state, TimerState::Running);
        let t = t.paused();
        assert_eq!(t.state, TimerState::Paused);
        assert_eq!(t.started().state, TimerState::Running);
    }

    #[test]
    fn pause_from_idle() {
        let t = Timer::new(10).unwrap().paused();
        assert_eq!(t.state, TimerState::Paused);
        assert_eq!(t.remaining_secs, 10);
        assert_eq!(t.paused(), t);
        assert!(t.ticked().is_none());
        assert_eq!(t.started().state, TimerState::Running);
    }

    #[test]
    fn finished_timer_ignores_start_and_pause() {
        let (done, _) = running(5, 1).ticked().unwrap();
        assert_eq!(done.started(), done);
        assert_eq!(done.paused(), done);
    }

    #[test]
    fn tick_counts_down_and_finishes_once() {
        let (t, finished) = running(5, 2).ticked().unwrap();
        assert_eq!(t.remaining_secs, 1);
        assert!(!finished);

        let (t, finished) = t.ticked().unwrap();
        assert_eq!(t.remaining_secs, 0);
        assert_eq!(t.state, TimerState::Finished);
        assert!(finished);

        assert!(t.ticked().is_none());
    }

    #[test]
    fn tick_ignores_non_running() {
        assert!(Timer::new(5).unwrap().ticked().is_none());
        assert!(running(5, 3).paused().ticked().is_none());
    }

    #[test]
    fn extend_resumes_finished_timer() {
        let (done, _) = running(60, 1).ticked().unwrap();
        let t = done.extended();
        assert_eq!(t.state, TimerState::Running);
        assert_eq!(t.remaining_secs, 300);
        assert_eq!(t.duration_secs, 300);

        let t = running(600, 120).paused().extended();
        assert_eq!(t.remaining_secs, 420);
        assert_eq!(t.duration_secs, 600);
        assert_eq!(t.state, TimerState::Running);
    }

    #[test]
    fn elapsed_percent() {
        assert_eq!(running(100, 100).elapsed_percent(), 0);
        assert_eq!(running(100, 25).elapsed_percent(), 75);
        assert_eq!(running(3, 0).elapsed_percent(), 100);
    }
}
