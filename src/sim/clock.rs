//! Race clock and global phase state machine
//!
//! Phases move strictly forward: idle -> countdown -> racing -> finished.
//! Only an explicit reset returns to idle. The tick methods report when
//! their governed transition fires so the orchestrator reacts exactly once.

use serde::{Deserialize, Serialize};

/// Global race phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Idle,
    Countdown,
    Racing,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceClock {
    pub phase: RacePhase,
    /// Seconds of countdown remaining.
    pub countdown_remaining: f32,
    /// Seconds of race time remaining.
    pub race_remaining: f32,
    total_race_time: f32,
    countdown_duration: f32,
}

impl RaceClock {
    pub fn new(total_race_time: f32, countdown_duration: f32) -> Self {
        Self {
            phase: RacePhase::Idle,
            countdown_remaining: countdown_duration,
            race_remaining: total_race_time,
            total_race_time,
            countdown_duration,
        }
    }

    /// Begin the countdown. No-op unless idle.
    pub fn start(&mut self) {
        if self.phase == RacePhase::Idle {
            self.phase = RacePhase::Countdown;
            self.countdown_remaining = self.countdown_duration;
            self.race_remaining = self.total_race_time;
        }
    }

    /// End the race early (all checkpoints filled before the deadline).
    pub fn finish(&mut self) {
        if self.phase == RacePhase::Racing {
            self.phase = RacePhase::Finished;
        }
    }

    /// Return to idle from any phase.
    pub fn reset(&mut self) {
        self.phase = RacePhase::Idle;
        self.countdown_remaining = self.countdown_duration;
        self.race_remaining = self.total_race_time;
    }

    /// Advance the countdown; returns true exactly when racing begins.
    pub fn tick_countdown(&mut self, dt: f32) -> bool {
        if self.phase != RacePhase::Countdown {
            return false;
        }
        self.countdown_remaining -= dt;
        if self.countdown_remaining <= 0.0 {
            self.countdown_remaining = 0.0;
            self.phase = RacePhase::Racing;
            return true;
        }
        false
    }

    /// Advance the race timer; returns true exactly when the deadline fires.
    pub fn tick_race(&mut self, dt: f32) -> bool {
        if self.phase != RacePhase::Racing {
            return false;
        }
        self.race_remaining = (self.race_remaining - dt).max(0.0);
        if self.race_remaining <= 0.0 {
            self.phase = RacePhase::Finished;
            return true;
        }
        false
    }

    /// Countdown value for display (3, 2, 1).
    pub fn countdown_number(&self) -> u32 {
        self.countdown_remaining.ceil().max(0.0) as u32
    }

    /// Remaining race time as mm:ss for display.
    pub fn formatted_time(&self) -> String {
        let total = self.race_remaining.ceil() as u32;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_progression() {
        let mut clock = RaceClock::new(120.0, 3.0);
        assert_eq!(clock.phase, RacePhase::Idle);
        assert!(!clock.tick_countdown(1.0)); // idle: countdown does not run

        clock.start();
        assert_eq!(clock.phase, RacePhase::Countdown);
        assert!(!clock.tick_countdown(1.0));
        assert!(!clock.tick_countdown(1.0));
        assert!(clock.tick_countdown(1.5)); // fires exactly once
        assert_eq!(clock.phase, RacePhase::Racing);
        assert!(!clock.tick_countdown(1.0));
    }

    #[test]
    fn test_race_deadline_fires_once() {
        let mut clock = RaceClock::new(2.0, 0.0);
        clock.start();
        assert!(clock.tick_countdown(0.0001) || clock.phase == RacePhase::Racing);
        assert!(!clock.tick_race(1.0));
        assert!(clock.tick_race(1.5));
        assert_eq!(clock.phase, RacePhase::Finished);
        assert!(!clock.tick_race(1.0));
        assert_eq!(clock.race_remaining, 0.0);
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut clock = RaceClock::new(60.0, 3.0);
        clock.start();
        clock.tick_countdown(5.0);
        assert_eq!(clock.phase, RacePhase::Racing);
        clock.start(); // must not restart the countdown
        assert_eq!(clock.phase, RacePhase::Racing);
    }

    #[test]
    fn test_reset_from_any_phase() {
        let mut clock = RaceClock::new(60.0, 3.0);
        clock.start();
        clock.tick_countdown(5.0);
        clock.tick_race(10.0);
        clock.reset();
        assert_eq!(clock.phase, RacePhase::Idle);
        assert_eq!(clock.race_remaining, 60.0);
        assert_eq!(clock.countdown_remaining, 3.0);
    }

    #[test]
    fn test_display_formatting() {
        let mut clock = RaceClock::new(125.0, 3.0);
        assert_eq!(clock.formatted_time(), "02:05");
        clock.start();
        assert_eq!(clock.countdown_number(), 3);
        clock.tick_countdown(0.5);
        assert_eq!(clock.countdown_number(), 3);
        clock.tick_countdown(1.0);
        assert_eq!(clock.countdown_number(), 2);
    }
}
