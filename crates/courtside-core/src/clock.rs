// Countdown game clock.
//
// `time_remaining` is the single source of truth for the period clock. The
// host calls `tick()` once per real second while the clock runs; `start`
// and `pause` take the current `Instant` so elapsed real time that was not
// covered by ticks is still accounted for on pause.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{InvalidStateError, Result};
use crate::time_format::format_clock;

/// What a single `tick()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock was paused; nothing changed.
    Idle,
    /// One second came off the clock and it keeps running.
    Running(u32),
    /// The clock reached zero and paused itself.
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    time_remaining: u32,
    period_length: u32,
    /// Real-time reference for the seconds not yet consumed by ticks.
    /// `Some` while running. Not persisted: a restored clock is paused.
    #[serde(skip)]
    anchor: Option<Instant>,
}

/// Serializable view of the clock for display and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub time_remaining: u32,
    pub period_length: u32,
    pub is_running: bool,
    pub display: String,
}

impl GameClock {
    /// A paused clock set to the full period length (in seconds).
    pub fn new(period_length: u32) -> Self {
        GameClock {
            time_remaining: period_length,
            period_length,
            anchor: None,
        }
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn period_length(&self) -> u32 {
        self.period_length
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Start the clock. Returns `false` (no-op) if it is already running or
    /// has no time left.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.time_remaining == 0 {
            debug!("Clock start ignored: no time remaining");
            return false;
        }
        if self.anchor.is_some() {
            return false;
        }
        self.anchor = Some(now);
        info!("Clock started at {}", format_clock(self.time_remaining));
        true
    }

    /// Pause the clock, subtracting whole seconds elapsed since the last
    /// tick (or since start). Returns the seconds subtracted.
    pub fn pause(&mut self, now: Instant) -> u32 {
        let Some(anchor) = self.anchor.take() else {
            return 0;
        };
        let elapsed = now
            .checked_duration_since(anchor)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let taken = elapsed.min(self.time_remaining);
        self.time_remaining -= taken;
        info!("Clock paused at {}", format_clock(self.time_remaining));
        taken
    }

    /// Take one second off a running clock. At zero the clock pauses itself.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(anchor) = self.anchor else {
            return TickOutcome::Idle;
        };
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.anchor = None;
            info!("Period time expired");
            return TickOutcome::Expired;
        }
        self.anchor = Some(anchor + Duration::from_secs(1));
        TickOutcome::Running(self.time_remaining)
    }

    /// Manually correct a paused clock by `delta` seconds, clamped to the
    /// period length. Returns the new time remaining.
    pub fn adjust(&mut self, delta: i64) -> Result<u32> {
        if self.is_running() {
            return Err(InvalidStateError::ClockRunning.into());
        }
        let adjusted = (i64::from(self.time_remaining) + delta).clamp(0, i64::from(self.period_length));
        // Clamped to [0, period_length], which fits in u32.
        self.time_remaining = adjusted as u32;
        debug!("Clock adjusted by {}s to {}", delta, format_clock(self.time_remaining));
        Ok(self.time_remaining)
    }

    /// Stop the clock and set it to a fresh period of `period_length` seconds.
    pub fn reset(&mut self, period_length: u32) {
        self.anchor = None;
        self.period_length = period_length;
        self.time_remaining = period_length;
    }

    /// Stop the clock at 0:00.
    pub fn expire(&mut self) {
        self.anchor = None;
        self.time_remaining = 0;
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            time_remaining: self.time_remaining,
            period_length: self.period_length,
            is_running: self.is_running(),
            display: format_clock(self.time_remaining),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clock_is_full_and_paused() {
        let clock = GameClock::new(1200);
        assert_eq!(clock.time_remaining(), 1200);
        assert!(!clock.is_running());
    }

    #[test]
    fn five_ticks_then_pause_holds_at_1195() {
        let mut clock = GameClock::new(1200);
        let t0 = Instant::now();
        assert!(clock.start(t0));
        for _ in 0..5 {
            clock.tick();
        }
        assert_eq!(clock.time_remaining(), 1195);

        clock.pause(t0 + Duration::from_secs(5));
        assert!(!clock.is_running());
        assert_eq!(clock.time_remaining(), 1195);

        // Real time keeps passing; a paused clock does not move.
        assert_eq!(clock.tick(), TickOutcome::Idle);
        clock.pause(t0 + Duration::from_secs(60));
        assert_eq!(clock.time_remaining(), 1195);
    }

    #[test]
    fn pause_subtracts_whole_untracked_seconds() {
        let mut clock = GameClock::new(600);
        let t0 = Instant::now();
        clock.start(t0);
        clock.tick();
        let taken = clock.pause(t0 + Duration::from_millis(3_900));
        // One second was ticked; 2.9s more elapsed, floored to 2.
        assert_eq!(taken, 2);
        assert_eq!(clock.time_remaining(), 597);
    }

    #[test]
    fn pause_clamps_at_zero() {
        let mut clock = GameClock::new(60);
        let t0 = Instant::now();
        clock.start(t0);
        clock.pause(t0 + Duration::from_secs(500));
        assert_eq!(clock.time_remaining(), 0);
    }

    #[test]
    fn start_is_noop_at_zero() {
        let mut clock = GameClock::new(60);
        clock.adjust(-60).unwrap();
        assert!(!clock.start(Instant::now()));
        assert!(!clock.is_running());
    }

    #[test]
    fn start_twice_keeps_original_anchor() {
        let mut clock = GameClock::new(60);
        let t0 = Instant::now();
        assert!(clock.start(t0));
        assert!(!clock.start(t0 + Duration::from_secs(10)));
        clock.pause(t0 + Duration::from_secs(10));
        assert_eq!(clock.time_remaining(), 50);
    }

    #[test]
    fn tick_to_zero_expires_and_pauses() {
        let mut clock = GameClock::new(60);
        clock.adjust(-58).unwrap();
        clock.start(Instant::now());
        assert_eq!(clock.tick(), TickOutcome::Running(1));
        assert_eq!(clock.tick(), TickOutcome::Expired);
        assert!(!clock.is_running());
        assert_eq!(clock.tick(), TickOutcome::Idle);
        assert_eq!(clock.time_remaining(), 0);
    }

    #[test]
    fn adjust_rejected_while_running() {
        let mut clock = GameClock::new(600);
        clock.start(Instant::now());
        let err = clock.adjust(10).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(clock.time_remaining(), 600);
    }

    #[test]
    fn adjust_clamps_to_period_bounds() {
        let mut clock = GameClock::new(600);
        assert_eq!(clock.adjust(60).unwrap(), 600);
        assert_eq!(clock.adjust(-10).unwrap(), 590);
        assert_eq!(clock.adjust(-60).unwrap(), 530);
        assert_eq!(clock.adjust(-10_000).unwrap(), 0);
    }

    #[test]
    fn reset_stops_and_refills() {
        let mut clock = GameClock::new(600);
        clock.start(Instant::now());
        clock.tick();
        clock.reset(480);
        assert!(!clock.is_running());
        assert_eq!(clock.time_remaining(), 480);
        assert_eq!(clock.period_length(), 480);
    }

    #[test]
    fn snapshot_formats_display() {
        let mut clock = GameClock::new(1200);
        clock.adjust(-700).unwrap();
        let snap = clock.snapshot();
        assert_eq!(snap.display, "8:20");
        assert!(!snap.is_running);
    }

    #[test]
    fn restored_clock_is_paused() {
        let mut clock = GameClock::new(600);
        clock.start(Instant::now());
        let json = serde_json::to_string(&clock).unwrap();
        let restored: GameClock = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_running());
        assert_eq!(restored.time_remaining(), 600);
    }
}
