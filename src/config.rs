//! Race configuration and screen layout
//!
//! `RaceConfig` is an immutable value: it is sanitized once at setup and all
//! dependent quantities (checkpoint timings, winner totals, speed tiers) are
//! derived through pure functions. There is no mutable global config.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Base-speed tiers handed out at race setup, pixels/second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTiers {
    pub winner: f32,
    pub average: f32,
    pub slow: f32,
}

/// Race configuration, fixed for the lifetime of one race setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Number of racing ducks.
    pub total_ducks: u32,
    /// Number of gating checkpoints.
    pub total_checkpoints: u32,
    /// Winner slots per checkpoint.
    pub winners_per_checkpoint: u32,
    /// Total race time, seconds (counts down once racing starts).
    pub total_race_time: f32,
    /// Pre-race countdown, seconds.
    pub countdown_duration: f32,
    /// Trailing time reserved for the winners presentation, seconds.
    pub buffer_time: f32,
    /// Strategy draw weights: [early-leader, late-booster, steady, chaotic].
    pub strategy_weights: [f32; 4],
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            total_ducks: 180,
            total_checkpoints: 4,
            winners_per_checkpoint: 5,
            total_race_time: 120.0,
            countdown_duration: 3.0,
            buffer_time: 12.0,
            strategy_weights: [0.15, 0.40, 0.30, 0.15],
        }
    }
}

impl RaceConfig {
    /// Clamp every field to a safe range. Guarantees no division by zero in
    /// the timing derivations below.
    pub fn sanitized(mut self) -> Self {
        self.total_ducks = self.total_ducks.max(1);
        self.total_checkpoints = self.total_checkpoints.max(1);
        self.winners_per_checkpoint = self.winners_per_checkpoint.max(1);
        if !self.total_race_time.is_finite() || self.total_race_time < 10.0 {
            self.total_race_time = 10.0;
        }
        if !self.countdown_duration.is_finite() || self.countdown_duration < 0.0 {
            self.countdown_duration = 0.0;
        }
        if !self.buffer_time.is_finite() || self.buffer_time < 0.0 {
            self.buffer_time = 0.0;
        }
        // Buffer can never swallow the whole race.
        self.buffer_time = self.buffer_time.min(self.total_race_time * 0.5);
        for w in &mut self.strategy_weights {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
        if self.strategy_weights.iter().sum::<f32>() <= 0.0 {
            self.strategy_weights = [0.15, 0.40, 0.30, 0.15];
        }
        self
    }

    /// Total winner slots across all checkpoints.
    pub fn total_winners(&self) -> u32 {
        self.total_checkpoints * self.winners_per_checkpoint
    }

    /// Scheduled activation time for each checkpoint, seconds of race time.
    ///
    /// All checkpoints open within the first 45% of the race so the field has
    /// the remainder (plus `buffer_time`) to physically reach the last line.
    pub fn checkpoint_timings(&self) -> Vec<f32> {
        let interval = (self.total_race_time * 0.45) / self.total_checkpoints as f32;
        (1..=self.total_checkpoints)
            .map(|i| interval * i as f32)
            .collect()
    }

    /// Base-speed tiers such that the fastest ducks can cover `race_distance`
    /// inside the effective race time (total minus ceremony buffer).
    pub fn optimal_speeds(&self, race_distance: f32) -> SpeedTiers {
        let effective = (self.total_race_time - self.buffer_time).max(1.0);
        let base = race_distance.max(1.0) / effective;
        SpeedTiers {
            winner: base * 1.3,
            average: base * 1.1,
            slow: base * 0.85,
        }
    }
}

/// Derived screen layout, recomputed on resize and passed explicitly to
/// whoever needs it (lane placement, podium grid, render layer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    /// Grass band (podium area) occupies the top quarter.
    pub grass_height: f32,
    pub water_y_start: f32,
    pub water_height: f32,
    pub start_line_x: f32,
    pub finish_line_x: f32,
}

impl Layout {
    pub fn new(width: f32, height: f32) -> Self {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let grass_height = height * 0.25;
        Self {
            width,
            height,
            grass_height,
            water_y_start: grass_height,
            water_height: height * 0.75,
            start_line_x: START_LINE_X,
            finish_line_x: width - FINISH_LINE_OFFSET,
        }
    }

    /// Distance from the start line to the finish line.
    pub fn race_distance(&self) -> f32 {
        (self.finish_line_x - self.start_line_x).max(1.0)
    }

    /// Evenly spaced lane y-positions across the water band.
    pub fn lane_positions(&self, count: usize) -> Vec<f32> {
        let lane_padding = 16.0;
        let usable = (self.water_height - lane_padding * 2.0).max(40.0);
        let gap = usable / (count as f32 + 1.0);
        let top = self.water_y_start + (self.water_height - usable) / 2.0;
        (0..count).map(|i| top + gap * (i as f32 + 1.0)).collect()
    }

    /// Podium grid slot for the nth overall winner (0-based).
    pub fn podium_position(&self, index: usize) -> glam::Vec2 {
        let cols = PODIUM_GRID_COLS as usize;
        let row = index / cols;
        let col = index % cols;
        glam::Vec2::new(
            PODIUM_X + 100.0 + col as f32 * PODIUM_SPACING_X,
            PODIUM_Y + 55.0 + row as f32 * PODIUM_SPACING_Y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_degenerate_config() {
        let cfg = RaceConfig {
            total_ducks: 0,
            total_checkpoints: 0,
            winners_per_checkpoint: 0,
            total_race_time: -5.0,
            countdown_duration: f32::NAN,
            buffer_time: 1000.0,
            strategy_weights: [-1.0, f32::NAN, 0.0, 0.0],
        }
        .sanitized();

        assert_eq!(cfg.total_ducks, 1);
        assert_eq!(cfg.total_checkpoints, 1);
        assert_eq!(cfg.winners_per_checkpoint, 1);
        assert!(cfg.total_race_time >= 10.0);
        assert_eq!(cfg.countdown_duration, 0.0);
        assert!(cfg.buffer_time <= cfg.total_race_time * 0.5);
        assert!(cfg.strategy_weights.iter().sum::<f32>() > 0.0);
        // Timings must be computable without dividing by zero.
        assert_eq!(cfg.checkpoint_timings().len(), 1);
    }

    #[test]
    fn test_checkpoint_timings_fit_first_half() {
        let cfg = RaceConfig::default();
        let timings = cfg.checkpoint_timings();
        assert_eq!(timings.len(), 4);
        for pair in timings.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        // Last activation inside the first 45% of race time.
        assert!(timings[3] <= cfg.total_race_time * 0.45 + 1e-3);
    }

    #[test]
    fn test_optimal_speeds_reach_finish_in_time() {
        let cfg = RaceConfig::default();
        let layout = Layout::new(1600.0, 900.0);
        let tiers = cfg.optimal_speeds(layout.race_distance());
        let effective = cfg.total_race_time - cfg.buffer_time;
        // A winner-tier duck at base speed covers the course with room to spare.
        assert!(tiers.winner * effective > layout.race_distance());
        assert!(tiers.slow < tiers.average && tiers.average < tiers.winner);
    }

    #[test]
    fn test_lanes_stay_inside_water_band() {
        let layout = Layout::new(1200.0, 800.0);
        let lanes = layout.lane_positions(50);
        assert_eq!(lanes.len(), 50);
        for y in lanes {
            assert!(y > layout.water_y_start);
            assert!(y < layout.water_y_start + layout.water_height);
        }
    }

    #[test]
    fn test_podium_grid_slots() {
        let layout = Layout::new(1200.0, 800.0);
        let a = layout.podium_position(0);
        let b = layout.podium_position(1);
        let f = layout.podium_position(PODIUM_GRID_COLS as usize);
        assert!((b.x - a.x - PODIUM_SPACING_X).abs() < 1e-3);
        assert!((f.y - a.y - PODIUM_SPACING_Y).abs() < 1e-3);
        assert!((f.x - a.x).abs() < 1e-3); // wraps to first column
    }
}
