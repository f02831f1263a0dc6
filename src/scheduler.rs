use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::input::Command;

/// Fixed-cadence timer. Fires at most once per poll and never bursts to
/// catch up after a stall.
#[derive(Clone, Copy, Debug)]
pub struct RepeatingTimer {
    interval: Duration,
    next_due: Instant,
}

impl RepeatingTimer {
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Instant {
        self.next_due
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerChange {
    Unchanged,
    Started,
    Restarted,
    Stopped,
}

/// Owns the guard timer and the pending input commands. Everything runs on
/// the caller's thread; commands are applied in arrival order.
#[derive(Debug, Default)]
pub struct Scheduler {
    guard_timer: Option<RepeatingTimer>,
    queue: VecDeque<Command>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }

    /// Brings the guard timer in line with the game: stopped while the game
    /// is over, otherwise running at `interval`. A cadence change restarts
    /// the timer from `now`.
    pub fn sync(&mut self, active: bool, interval: Duration, now: Instant) -> TimerChange {
        let current = self.guard_timer.map(|timer| timer.interval());
        match (current, active) {
            (Some(_), false) => {
                self.guard_timer = None;
                debug!("guard timer stopped");
                TimerChange::Stopped
            }
            (None, false) => TimerChange::Unchanged,
            (None, true) => {
                self.guard_timer = Some(RepeatingTimer::start(interval, now));
                debug!(interval_ms = interval.as_millis() as u64, "guard timer started");
                TimerChange::Started
            }
            (Some(running), true) if running != interval => {
                self.guard_timer = Some(RepeatingTimer::start(interval, now));
                debug!(interval_ms = interval.as_millis() as u64, "guard timer restarted");
                TimerChange::Restarted
            }
            (Some(_), true) => TimerChange::Unchanged,
        }
    }

    pub fn guard_due(&mut self, now: Instant) -> bool {
        self.guard_timer
            .as_mut()
            .map(|timer| timer.poll(now))
            .unwrap_or(false)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.guard_timer.map(|timer| timer.deadline())
    }

    /// Drops the timer and any pending input.
    pub fn shutdown(&mut self) {
        self.guard_timer = None;
        self.queue.clear();
    }
}
