//! Duck motion and hidden strategy
//!
//! Each duck owns its kinematic state and a strategy drawn once at creation.
//! The racing-state speed is a product of independent multiplicative factors
//! (strategy curve, luck, micro-bursts, final chaos, position pressure),
//! clamped to the duck's speed bounds after every recomputation. Directives
//! set by the orchestrator override the whole product.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::ease_out_cubic;

/// Hidden per-duck strategy, fixed for the duck's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Fast start that decays mid-race and collapses late.
    EarlyLeader,
    /// Slow start, mid-race ramp, explosive finish.
    LateBooster,
    /// Mild oscillation around 1.0, keeps pack order mostly stable.
    SteadyRunner,
    /// Large multi-frequency swings plus a mid-race upward trend.
    Chaotic,
}

impl Strategy {
    /// Weighted draw; weights follow `RaceConfig::strategy_weights` order.
    pub fn draw(rng: &mut impl Rng, weights: &[f32; 4]) -> Self {
        const ALL: [Strategy; 4] = [
            Strategy::EarlyLeader,
            Strategy::LateBooster,
            Strategy::SteadyRunner,
            Strategy::Chaotic,
        ];
        let total: f32 = weights.iter().sum();
        let mut roll = rng.random::<f32>() * total;
        for (strategy, &w) in ALL.iter().zip(weights) {
            roll -= w;
            if roll <= 0.0 {
                return *strategy;
            }
        }
        ALL[3]
    }
}

/// Lifecycle state; transitions are one-way (racing -> winning -> finished).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuckState {
    Racing,
    Winning,
    Finished,
}

/// Orchestrator-assigned speed override. Takes priority over every
/// multiplicative factor while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedDirective {
    #[default]
    None,
    /// Guaranteed approach for a designated checkpoint winner.
    Boost,
    /// Holds non-winners short of an active line.
    SlowDown,
}

/// One racing duck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Duck {
    pub id: u32,
    pub name: String,
    pub pos: Vec2,
    pub radius: f32,
    pub state: DuckState,
    pub is_winner: bool,

    pub base_speed: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    /// Instantaneous speed after the last recomputation.
    pub speed: f32,

    pub strategy: Strategy,
    chaotic_phase: f32,
    chaotic_freq: f32,
    personal_factor: f32,
    luck_factor: f32,

    // Micro-burst timers
    next_burst_in: f32,
    burst_remaining: f32,
    burst_mult: f32,
    burst_active: bool,

    // Final chaos zone (one roll per duck, progress > 0.9)
    sprint_power: f32,
    chaos_rolled: bool,
    chaos_mult: f32,

    /// Orchestrator-assigned rank as a fraction of the field, 0 = leader.
    rank_frac: f32,
    pub directive: SpeedDirective,

    // Current stage reference for progress computation
    stage_start_x: f32,
    stage_distance: f32,

    // Winning-state interpolation
    pub target: Vec2,
    lerp_t: f32,

    // Vertical bob, consumed by the render layer only
    wobble_phase: f32,
    wobble_speed: f32,
    wobble_amp: f32,
}

impl Duck {
    pub fn new(
        id: u32,
        name: String,
        pos: Vec2,
        base_speed: f32,
        speed_min: f32,
        speed_max: f32,
        weights: &[f32; 4],
        rng: &mut impl Rng,
    ) -> Self {
        let strategy = Strategy::draw(rng, weights);
        Self {
            id,
            name,
            pos,
            radius: DUCK_RADIUS,
            state: DuckState::Racing,
            is_winner: false,
            base_speed,
            speed_min,
            speed_max,
            speed: base_speed.clamp(speed_min, speed_max),
            strategy,
            chaotic_phase: rng.random_range(0.0..std::f32::consts::TAU),
            chaotic_freq: rng.random_range(2.0..5.0),
            personal_factor: rng.random_range(0.88..1.12),
            luck_factor: rng.random_range(0.97..1.03),
            next_burst_in: rng.random_range(0.0..5.0),
            burst_remaining: 0.0,
            burst_mult: 1.0,
            burst_active: false,
            sprint_power: rng.random::<f32>(),
            chaos_rolled: false,
            chaos_mult: 1.0,
            rank_frac: 0.0,
            directive: SpeedDirective::None,
            stage_start_x: pos.x,
            stage_distance: 1000.0,
            target: pos,
            lerp_t: 0.0,
            wobble_phase: rng.random_range(0.0..std::f32::consts::TAU),
            wobble_speed: rng.random_range(2.0..3.2),
            wobble_amp: rng.random_range(2.0..4.0),
        }
    }

    /// Reinitialize all mutable race state for a fresh race. The hidden
    /// strategy and its constants survive; positions, timers and one-shot
    /// rolls do not.
    pub fn reset_for_race(&mut self, pos: Vec2, rng: &mut impl Rng) {
        self.pos = pos;
        self.state = DuckState::Racing;
        self.is_winner = false;
        self.speed = self.base_speed.clamp(self.speed_min, self.speed_max);
        self.target = pos;
        self.lerp_t = 0.0;
        self.directive = SpeedDirective::None;
        self.rank_frac = 0.0;
        self.next_burst_in = rng.random_range(0.0..5.0);
        self.burst_remaining = 0.0;
        self.burst_mult = 1.0;
        self.burst_active = false;
        self.chaos_rolled = false;
        self.chaos_mult = 1.0;
        self.stage_start_x = pos.x;
    }

    /// Reset the progress reference for a new stage target.
    pub fn set_stage(&mut self, distance: f32) {
        self.stage_start_x = self.pos.x;
        self.stage_distance = distance.max(1.0);
    }

    /// Stage progress in [0, 1].
    pub fn progress(&self) -> f32 {
        ((self.pos.x - self.stage_start_x) / self.stage_distance).clamp(0.0, 1.0)
    }

    /// Assign this duck's rank within the field (0 = leader).
    pub fn set_rank(&mut self, rank: u32, field_size: u32) {
        self.rank_frac = if field_size > 1 {
            rank as f32 / (field_size - 1) as f32
        } else {
            0.0
        };
    }

    /// Begin easing toward a podium slot. One-way: never returns to racing.
    pub fn begin_winning(&mut self, target: Vec2) {
        if self.state == DuckState::Racing {
            self.state = DuckState::Winning;
            self.target = target;
            self.lerp_t = 0.0;
            self.directive = SpeedDirective::None;
        }
    }

    /// Vertical bob offset for rendering.
    pub fn wobble_offset(&self) -> f32 {
        self.wobble_phase.sin() * self.wobble_amp
    }

    /// Advance the duck by `dt` seconds. Mutates position and speed in place.
    pub fn advance(&mut self, rng: &mut impl Rng, dt: f32, track_width: f32) {
        self.wobble_phase += dt * self.wobble_speed;

        match self.state {
            DuckState::Racing => self.advance_racing(rng, dt, track_width),
            DuckState::Winning => self.advance_winning(dt),
            DuckState::Finished => {}
        }
    }

    fn advance_racing(&mut self, rng: &mut impl Rng, dt: f32, track_width: f32) {
        let progress = self.progress();

        self.update_micro_burst(rng, dt, progress);
        self.roll_final_chaos(rng, progress);

        self.speed = match self.directive {
            SpeedDirective::Boost => self.base_speed * BOOST_DIRECTIVE_MULT,
            SpeedDirective::SlowDown => self.base_speed * SLOW_DIRECTIVE_MULT,
            SpeedDirective::None => {
                self.base_speed
                    * self.personal_factor
                    * self.strategy_multiplier(progress)
                    * self.luck_factor
                    * self.burst_mult
                    * self.chaos_mult
                    * self.position_pressure(progress)
            }
        };
        self.speed = self.speed.clamp(self.speed_min, self.speed_max);

        self.pos.x += self.speed * dt;

        // Never overshoot the playfield, independent of checkpoint logic.
        if self.pos.x + self.radius >= track_width {
            self.pos.x = track_width - self.radius;
        }
    }

    fn advance_winning(&mut self, dt: f32) {
        self.lerp_t = (self.lerp_t + dt * WIN_LERP_RATE).min(1.0);
        let ease = ease_out_cubic(self.lerp_t);
        self.pos += (self.target - self.pos) * ease;
        if self.lerp_t >= 0.99 {
            self.state = DuckState::Finished;
            self.pos = self.target;
            self.is_winner = true;
        }
    }

    fn update_micro_burst(&mut self, rng: &mut impl Rng, dt: f32, progress: f32) {
        self.next_burst_in -= dt;
        if self.next_burst_in <= 0.0 && !self.burst_active {
            self.burst_active = true;
            self.burst_remaining = rng.random_range(0.8..2.0);
            // Biased toward boost: 60% above 1x.
            self.burst_mult = if rng.random::<f32>() < 0.6 {
                rng.random_range(1.15..1.40)
            } else {
                rng.random_range(0.70..0.85)
            };
        }

        if self.burst_active {
            self.burst_remaining -= dt;
            if self.burst_remaining <= 0.0 {
                self.burst_active = false;
                self.burst_mult = 1.0;
                // Bursts come quicker late in the race.
                let interval = rng.random_range(3.0..8.0);
                self.next_burst_in = interval * (1.0 - 0.4 * progress);
            }
        }
    }

    fn roll_final_chaos(&mut self, rng: &mut impl Rng, progress: f32) {
        if progress <= 0.9 || self.chaos_rolled {
            return;
        }
        self.chaos_rolled = true;
        if rng.random::<f32>() >= 0.4 {
            return;
        }
        if self.sprint_power > 0.45 {
            let mut boost = 1.6 + self.sprint_power * 1.4;
            // Underdog miracle: deep pack gets an amplified sprint.
            if self.rank_frac > 0.6 {
                boost *= 1.35;
            }
            self.chaos_mult = boost;
        } else {
            // Low sprint power collapses instead.
            self.chaos_mult = 0.45 + self.sprint_power * 0.3;
        }
    }

    /// Rank-dependent late-race adjustment: leaders feel pressure, the deep
    /// pack gets a growing underdog boost as progress approaches 1.
    fn position_pressure(&self, progress: f32) -> f32 {
        if progress <= 0.7 {
            return 1.0;
        }
        let late = (progress - 0.7) / 0.3;
        if self.rank_frac < 0.1 {
            1.0 - 0.08 * late
        } else if self.rank_frac > 0.7 {
            1.0 + 0.25 * self.rank_frac * late
        } else {
            1.0
        }
    }

    /// Strategy curve over stage progress. Pure in (tag, constants, progress).
    pub fn strategy_multiplier(&self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self.strategy {
            Strategy::EarlyLeader => curve_early_leader(p),
            Strategy::LateBooster => curve_late_booster(p),
            Strategy::SteadyRunner => curve_steady_runner(p, self.id),
            Strategy::Chaotic => {
                curve_chaotic(p, self.id, self.chaotic_phase, self.chaotic_freq)
            }
        }
    }
}

/// Fast start, tiring mid-race, collapse at the end (comeback enabler).
fn curve_early_leader(p: f32) -> f32 {
    if p < 0.35 {
        1.35 + (0.35 - p) * 0.3
    } else if p < 0.65 {
        let t = (p - 0.35) / 0.3;
        1.35 - t * 0.5
    } else {
        let t = (p - 0.65) / 0.35;
        0.85 - t * 0.35
    }
}

/// Slow start, mid-race ramp, explosive finish in the final 15%.
fn curve_late_booster(p: f32) -> f32 {
    if p < 0.45 {
        0.55 + (p / 0.45) * 0.25
    } else if p < 0.85 {
        let t = (p - 0.45) / 0.4;
        0.80 + t * 0.5
    } else {
        let t = (p - 0.85) / 0.15;
        1.30 + t * t * 3.2
    }
}

/// Mild sinusoidal jitter around 1.0, phase keyed by id.
fn curve_steady_runner(p: f32, id: u32) -> f32 {
    use std::f32::consts::PI;
    let oscillation = (p * PI * 5.0 + id as f32 * 0.3).sin() * 0.12;
    let micro_trend = (p * PI * 2.0).sin() * 0.05;
    0.98 + oscillation + micro_trend
}

/// Multi-frequency swings plus a mid-race upward trend.
fn curve_chaotic(p: f32, id: u32, phase: f32, freq: f32) -> f32 {
    use std::f32::consts::PI;
    let osc1 = (p * PI * 7.0 + id as f32 * 0.7).sin() * 0.18;
    let osc2 = (p * PI * freq + phase).sin() * 0.12;
    let trend = ((p * PI - PI / 2.0).sin() + 1.0) * 0.25;
    0.82 + osc1 + osc2 + trend
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Strategy;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn test_duck(rng: &mut Pcg32) -> Duck {
        let weights = [0.15, 0.40, 0.30, 0.15];
        let mut duck = Duck::new(
            1,
            "Duck 1".into(),
            Vec2::new(80.0, 300.0),
            120.0,
            80.0,
            200.0,
            &weights,
            rng,
        );
        duck.set_stage(1000.0);
        duck
    }

    #[test]
    fn test_early_leader_fast_start_slow_finish() {
        assert!(curve_early_leader(0.0) > 1.3);
        assert!(curve_early_leader(1.0) < 0.7);
    }

    #[test]
    fn test_late_booster_explodes_at_the_end() {
        assert!(curve_late_booster(0.0) < 0.8);
        assert!(curve_late_booster(0.5) < 1.2);
        assert!(curve_late_booster(1.0) > 3.0);
    }

    #[test]
    fn test_steady_runner_stays_near_one() {
        for i in 0..=20 {
            let p = i as f32 / 20.0;
            let m = curve_steady_runner(p, 7);
            assert!((0.8..1.2).contains(&m), "m={m} at p={p}");
        }
    }

    #[test]
    fn test_strategy_draw_respects_zeroed_weights() {
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..100 {
            let s = Strategy::draw(&mut rng, &[0.0, 1.0, 0.0, 0.0]);
            assert_eq!(s, Strategy::LateBooster);
        }
    }

    #[test]
    fn test_boost_directive_overrides_everything() {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut duck = test_duck(&mut rng);
        duck.directive = SpeedDirective::Boost;
        duck.advance(&mut rng, 1.0 / 60.0, 2000.0);
        // base 120 * 2.5 = 300, clamped to max 200.
        assert_eq!(duck.speed, 200.0);

        duck.directive = SpeedDirective::SlowDown;
        duck.advance(&mut rng, 1.0 / 60.0, 2000.0);
        // base 120 * 0.15 = 18, clamped up to min 80.
        assert_eq!(duck.speed, 80.0);
    }

    #[test]
    fn test_track_width_clamp() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut duck = test_duck(&mut rng);
        duck.pos.x = 990.0;
        duck.advance(&mut rng, 0.1, 1000.0);
        assert!(duck.pos.x + duck.radius <= 1000.0);
    }

    #[test]
    fn test_winning_converges_and_finishes() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut duck = test_duck(&mut rng);
        let target = Vec2::new(150.0, 60.0);
        duck.begin_winning(target);
        assert_eq!(duck.state, DuckState::Winning);

        let mut ticks = 0;
        while duck.state == DuckState::Winning && ticks < 60 {
            duck.advance(&mut rng, 1.0 / 60.0, 2000.0);
            ticks += 1;
        }
        assert_eq!(duck.state, DuckState::Finished);
        assert!(duck.is_winner);
        assert_eq!(duck.pos, target);
        assert!(ticks <= 60, "took {ticks} ticks");
    }

    #[test]
    fn test_winning_is_one_way() {
        let mut rng = Pcg32::seed_from_u64(13);
        let mut duck = test_duck(&mut rng);
        duck.begin_winning(Vec2::new(100.0, 50.0));
        // A second begin_winning must not restart the interpolation.
        for _ in 0..30 {
            duck.advance(&mut rng, 1.0 / 60.0, 2000.0);
        }
        duck.begin_winning(Vec2::new(500.0, 500.0));
        assert_eq!(duck.state, DuckState::Finished);
        assert_eq!(duck.target, Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_underdog_chaos_amplified() {
        // Force the trigger by trying seeds until the 40% roll hits, then
        // compare leader vs deep-pack multipliers with equal sprint power.
        for seed in 0..64u64 {
            let mut rng_a = Pcg32::seed_from_u64(seed);
            let mut rng_b = Pcg32::seed_from_u64(seed);
            let mut leader = test_duck(&mut rng_a);
            let mut laggard = test_duck(&mut rng_b);
            leader.sprint_power = 0.9;
            laggard.sprint_power = 0.9;
            leader.set_rank(0, 100);
            laggard.set_rank(99, 100);

            leader.roll_final_chaos(&mut rng_a, 0.95);
            laggard.roll_final_chaos(&mut rng_b, 0.95);

            if leader.chaos_mult > 1.0 {
                assert!(laggard.chaos_mult > leader.chaos_mult);
                return;
            }
        }
        panic!("final chaos never triggered across seeds");
    }

    proptest! {
        /// Speed bound invariant: whatever the directive, rank, progress or
        /// random stream, a racing duck's speed stays within its bounds.
        #[test]
        fn prop_speed_within_bounds(seed in 0u64..5000, ticks in 1usize..400) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut duck = test_duck(&mut rng);
            duck.set_rank((seed % 100) as u32, 100);
            if seed % 3 == 1 {
                duck.directive = SpeedDirective::Boost;
            } else if seed % 3 == 2 {
                duck.directive = SpeedDirective::SlowDown;
            }
            for _ in 0..ticks {
                duck.advance(&mut rng, 1.0 / 60.0, 5000.0);
                prop_assert!(duck.speed >= duck.speed_min);
                prop_assert!(duck.speed <= duck.speed_max);
            }
        }

        /// Strategy curves never go negative or absurd anywhere in [0, 1].
        #[test]
        fn prop_curves_bounded(p in 0.0f32..=1.0, id in 0u32..500, phase in 0.0f32..6.28, freq in 2.0f32..5.0) {
            prop_assert!(curve_early_leader(p) > 0.2);
            prop_assert!(curve_early_leader(p) < 1.6);
            prop_assert!(curve_late_booster(p) > 0.4);
            prop_assert!(curve_late_booster(p) < 5.0);
            prop_assert!(curve_steady_runner(p, id) > 0.7);
            prop_assert!(curve_steady_runner(p, id) < 1.3);
            prop_assert!(curve_chaotic(p, id, phase, freq) > 0.3);
            prop_assert!(curve_chaotic(p, id, phase, freq) < 1.9);
        }
    }
}
