/*
 * Scheduler Module
 *
 * Decides when ticks fire. The scheduler is a small Idle/Running state machine
 * driven by explicit `Instant`s, so it never sleeps or touches the clock
 * itself and can be tested without real time. Whoever owns it (the runner
 * thread, the CLI) polls it and calls the stepper when a tick is due.
 *
 * Cadence is wall-clock time between ticks and is unrelated to the physics
 * timestep dt.
 */

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
        }
    }
}

// Tick delays for speed levels 1 through 6
const GAME_SPEED_DELAYS_MS: [u64; 6] = [500, 200, 100, 50, 20, 10];

/// Named cadence presets, from 1 (slowest) to 6 (fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GameSpeed(u8);

impl GameSpeed {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(level: u8) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ConfigError::GameSpeed(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn delay(self) -> Duration {
        Duration::from_millis(GAME_SPEED_DELAYS_MS[usize::from(self.0 - Self::MIN)])
    }

    // Preset whose delay is closest to `delay`; ties go to the faster preset
    pub fn nearest(delay: Duration) -> Self {
        let target = delay.as_millis();
        let mut best = Self(Self::MIN);
        let mut best_gap = u128::MAX;
        for level in Self::MIN..=Self::MAX {
            let candidate = Self(level);
            let gap = candidate.delay().as_millis().abs_diff(target);
            if gap <= best_gap {
                best = candidate;
                best_gap = gap;
            }
        }
        best
    }
}

impl Default for GameSpeed {
    fn default() -> Self {
        // 20 ms, the default tick delay
        Self(5)
    }
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    state: RunState,
    cadence: Duration,
    next_due: Option<Instant>,
}

impl TickScheduler {
    pub fn new(cadence: Duration) -> Self {
        Self {
            state: RunState::Idle,
            cadence,
            next_due: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    // Idle -> Running. The first tick is due one cadence from `now`.
    // Returns false if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = RunState::Running;
        self.next_due = Some(now + self.cadence);
        true
    }

    // Running -> Idle. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = RunState::Idle;
        self.next_due = None;
        true
    }

    pub fn toggle(&mut self, now: Instant) -> RunState {
        match self.state {
            RunState::Idle => self.start(now),
            RunState::Running => self.stop(),
        };
        self.state
    }

    // Move to `state`; no-op if already there
    pub fn force(&mut self, state: RunState, now: Instant) -> bool {
        match state {
            RunState::Running => self.start(now),
            RunState::Idle => self.stop(),
        }
    }

    // While running the timer is re-armed with the new cadence
    pub fn set_cadence(&mut self, cadence: Duration, now: Instant) {
        self.cadence = cadence;
        if self.is_running() {
            self.next_due = Some(now + cadence);
        }
    }

    // True if a tick should run now. At most one tick is reported per call,
    // and a late poll does not queue up missed ticks.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if self.is_running() && now >= due => {
                self.next_due = Some(now + self.cadence);
                true
            }
            _ => false,
        }
    }

    // Time until the next tick is due; None while idle
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
