//! Race orchestration
//!
//! Per tick, in order: advance the clock with the real time step, advance
//! checkpoints and ducks with a possibly slow-motion-dilated step, then scan
//! ducks in ascending id for arrivals at the active checkpoint and admit them
//! first-come. Admitted ducks transition to the winning interpolation toward
//! their podium slot. The tick returns the events that fired so collaborators
//! (render, audio) can react exactly once.

use std::collections::HashMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::checkpoint::CheckpointField;
use super::clock::{RaceClock, RacePhase};
use super::duck::{Duck, DuckState, SpeedDirective};
use crate::config::{Layout, RaceConfig};
use crate::consts::*;

/// One ledger entry; `arrival_rank` is the overall admission order (0-based)
/// and doubles as the podium grid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub duck_id: u32,
    pub checkpoint: usize,
    pub arrival_rank: usize,
}

/// State changes surfaced to external collaborators, at most once each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    /// Countdown hit zero; racing began this tick.
    CountdownFinished,
    /// A checkpoint became visible and active.
    CheckpointActivated(usize),
    /// A non-final checkpoint filled and left the track.
    CheckpointClosed(usize),
    /// A duck was admitted into a winner slot.
    DuckAdmitted {
        duck_id: u32,
        checkpoint: usize,
        arrival_rank: usize,
    },
    /// The race ended: deadline hit, or every checkpoint filled.
    RaceFinished { complete: bool },
}

/// The race orchestrator. Owns every component; external collaborators only
/// see plain state and per-tick events.
pub struct Race {
    config: RaceConfig,
    layout: Layout,
    clock: RaceClock,
    field: CheckpointField,
    ducks: Vec<Duck>,
    winners: Vec<WinnerEntry>,
    /// Optional staged winners per checkpoint (boost/slow-down directives).
    priority_winners: HashMap<usize, Vec<u32>>,
    slow_mo_timer: f32,
    rng: Pcg32,
    seed: u64,
}

impl Race {
    pub fn new(config: RaceConfig, width: f32, height: f32, seed: u64) -> Self {
        let config = config.sanitized();
        let layout = Layout::new(width, height);
        let clock = RaceClock::new(config.total_race_time, config.countdown_duration);
        let field = CheckpointField::new(
            config.total_checkpoints,
            config.winners_per_checkpoint,
            &config.checkpoint_timings(),
            layout.width,
        );
        let mut rng = Pcg32::seed_from_u64(seed);
        let ducks = Self::build_ducks(&config, &layout, &mut rng);
        Self {
            config,
            layout,
            clock,
            field,
            ducks,
            winners: Vec::new(),
            priority_winners: HashMap::new(),
            slow_mo_timer: 0.0,
            rng,
            seed,
        }
    }

    /// Create the field with tiered base speeds and shuffled lanes.
    fn build_ducks(config: &RaceConfig, layout: &Layout, rng: &mut Pcg32) -> Vec<Duck> {
        let count = config.total_ducks as usize;
        let mut lanes = layout.lane_positions(count);
        shuffle(&mut lanes, rng);

        // Shuffled indices distribute the tiers fairly across ids.
        let mut tier_order: Vec<usize> = (0..count).collect();
        shuffle(&mut tier_order, rng);

        let race_distance = layout.race_distance();
        let tiers = config.optimal_speeds(race_distance);
        let speed_min = tiers.slow * 0.7;
        let speed_max = tiers.winner * 1.2;

        (0..count)
            .map(|i| {
                let slot = tier_order[i];
                let base_speed = if slot < 20 {
                    tiers.winner * rng.random_range(0.95..1.05)
                } else if slot < (count as f32 * 0.4) as usize {
                    tiers.average * rng.random_range(0.90..1.10)
                } else {
                    tiers.slow * rng.random_range(0.85..1.15)
                };
                let id = i as u32 + 1;
                let mut duck = Duck::new(
                    id,
                    format!("Duck {id}"),
                    Vec2::new(layout.start_line_x, lanes[i]),
                    base_speed,
                    speed_min,
                    speed_max,
                    &config.strategy_weights,
                    rng,
                );
                duck.set_stage(race_distance);
                duck
            })
            .collect()
    }

    /// Begin the countdown. No-op unless idle.
    pub fn start(&mut self) {
        if self.clock.phase == RacePhase::Idle {
            log::info!(
                "race started: {} ducks, {} checkpoints x {} winners, {:.0}s",
                self.config.total_ducks,
                self.config.total_checkpoints,
                self.config.winners_per_checkpoint,
                self.config.total_race_time
            );
            self.clock.start();
        }
    }

    /// Return to a clean idle state. Safe in any phase: zeroes all timers,
    /// clears all checkpoint/winner state and re-stages every duck.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.field.reset();
        self.winners.clear();
        self.slow_mo_timer = 0.0;
        self.priority_winners.clear();

        let mut lanes = self.layout.lane_positions(self.ducks.len());
        shuffle(&mut lanes, &mut self.rng);
        let race_distance = self.layout.race_distance();
        for (duck, lane) in self.ducks.iter_mut().zip(lanes) {
            duck.reset_for_race(Vec2::new(self.layout.start_line_x, lane), &mut self.rng);
            duck.set_stage(race_distance);
        }
    }

    /// Replace the configuration and rebuild the race (implies reset).
    pub fn configure(&mut self, config: RaceConfig) {
        self.config = config.sanitized();
        self.clock = RaceClock::new(self.config.total_race_time, self.config.countdown_duration);
        self.field = CheckpointField::new(
            self.config.total_checkpoints,
            self.config.winners_per_checkpoint,
            &self.config.checkpoint_timings(),
            self.layout.width,
        );
        self.ducks = Self::build_ducks(&self.config, &self.layout, &mut self.rng);
        self.winners.clear();
        self.priority_winners.clear();
        self.slow_mo_timer = 0.0;
    }

    /// Re-derive checkpoint targets and duck lanes for a new viewport without
    /// resetting race progress.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.layout = Layout::new(width, height);
        self.field.set_track_width(self.layout.width);

        // Redistribute lanes preserving relative vertical order.
        let mut order: Vec<usize> = (0..self.ducks.len()).collect();
        order.sort_by(|&a, &b| {
            self.ducks[a]
                .pos
                .y
                .partial_cmp(&self.ducks[b].pos.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let lanes = self.layout.lane_positions(self.ducks.len());
        for (lane_idx, &duck_idx) in order.iter().enumerate() {
            let duck = &mut self.ducks[duck_idx];
            match duck.state {
                DuckState::Racing => duck.pos.y = lanes[lane_idx],
                // Winners keep easing toward (or sitting on) the podium grid.
                DuckState::Winning | DuckState::Finished => {}
            }
        }
        for entry in &self.winners {
            let target = self.layout.podium_position(entry.arrival_rank);
            if let Some(duck) = self.ducks.iter_mut().find(|d| d.id == entry.duck_id) {
                duck.target = target;
                if duck.state == DuckState::Finished {
                    duck.pos = target;
                }
            }
        }
    }

    /// Install a staged winner list for one checkpoint. While that checkpoint
    /// is active, listed ducks get the boost directive and unlisted ducks
    /// inside the approach window are held short of the line.
    pub fn set_priority_winners(&mut self, checkpoint: usize, ids: Vec<u32>) {
        self.priority_winners.insert(checkpoint, ids);
    }

    /// Advance the whole race by one frame. `real_dt` is the elapsed wall
    /// time in seconds; it is clamped to a sane maximum.
    pub fn tick(&mut self, real_dt: f32) -> Vec<RaceEvent> {
        let dt = real_dt.clamp(0.0, MAX_FRAME_DT);
        let mut events = Vec::new();

        match self.clock.phase {
            RacePhase::Idle | RacePhase::Finished => return events,
            RacePhase::Countdown => {
                if self.clock.tick_countdown(dt) {
                    log::info!("countdown finished, racing");
                    events.push(RaceEvent::CountdownFinished);
                }
                return events;
            }
            RacePhase::Racing => {}
        }

        // The race clock always runs on real time.
        if self.clock.tick_race(dt) {
            log::info!("race deadline reached with {} winners", self.winners.len());
            events.push(RaceEvent::RaceFinished {
                complete: self.field.is_all_complete(),
            });
            return events;
        }

        // Everything below runs on the possibly dilated step.
        let mut sim_dt = dt;
        if self.slow_mo_timer > 0.0 {
            sim_dt = dt * SLOW_MO_FACTOR;
            self.slow_mo_timer = (self.slow_mo_timer - dt).max(0.0);
        }

        let flags_before = self.visibility_flags();

        self.field.tick(sim_dt);
        self.assign_ranks();
        self.apply_directives();

        let track_width = self.layout.width;
        for duck in &mut self.ducks {
            duck.advance(&mut self.rng, sim_dt, track_width);
        }

        self.detect_arrivals(&mut events);
        self.diff_visibility(&flags_before, &mut events);
        events
    }

    /// Scan ducks in ascending id against the active checkpoint line. The
    /// fixed order makes simultaneous crossings resolve deterministically:
    /// lower id wins the last slot.
    fn detect_arrivals(&mut self, events: &mut Vec<RaceEvent>) {
        let Some((index, line)) = self
            .field
            .current()
            .filter(|cp| cp.visible)
            .map(|cp| (cp.index, cp.current_x))
        else {
            return;
        };

        for i in 0..self.ducks.len() {
            let duck = &self.ducks[i];
            if duck.state != DuckState::Racing || duck.is_winner {
                continue;
            }
            if duck.pos.x + duck.radius < line {
                continue;
            }
            if !self.field.admit(index, duck.id) {
                continue;
            }

            let arrival_rank = self.winners.len();
            let duck_id = duck.id;
            self.winners.push(WinnerEntry {
                duck_id,
                checkpoint: index,
                arrival_rank,
            });
            let target = self.layout.podium_position(arrival_rank);
            self.ducks[i].begin_winning(target);
            self.slow_mo_timer = SLOW_MO_DURATION;
            events.push(RaceEvent::DuckAdmitted {
                duck_id,
                checkpoint: index,
                arrival_rank,
            });

            if self.field.is_all_complete() {
                log::info!("all checkpoints complete at {}", self.clock.formatted_time());
                self.clock.finish();
                events.push(RaceEvent::RaceFinished { complete: true });
                return;
            }
        }
    }

    /// Rank racing ducks by position (leader = 0), ascending id on ties, and
    /// feed the rank into each duck's position-pressure factor.
    fn assign_ranks(&mut self) {
        let mut order: Vec<usize> = (0..self.ducks.len())
            .filter(|&i| self.ducks[i].state == DuckState::Racing)
            .collect();
        let field_size = order.len() as u32;
        order.sort_by(|&a, &b| {
            self.ducks[b]
                .pos
                .x
                .partial_cmp(&self.ducks[a].pos.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(self.ducks[a].id.cmp(&self.ducks[b].id))
        });
        for (rank, &i) in order.iter().enumerate() {
            self.ducks[i].set_rank(rank as u32, field_size);
        }
    }

    /// Boost staged winners of the current checkpoint; hold everyone else who
    /// strays into the approach window so they cannot steal a slot. Directives
    /// key off the settled line position so the hold applies before the line
    /// finishes sliding in; they clear as soon as the checkpoint advances.
    fn apply_directives(&mut self) {
        let staged = self.field.current().map(|cp| (cp.index, cp.target_x));
        if let Some((index, line)) = staged
            && let Some(ids) = self.priority_winners.get(&index)
        {
            for duck in &mut self.ducks {
                if duck.state != DuckState::Racing || duck.is_winner {
                    continue;
                }
                duck.directive = if ids.contains(&duck.id) {
                    SpeedDirective::Boost
                } else if duck.pos.x + duck.radius > line - APPROACH_WINDOW {
                    SpeedDirective::SlowDown
                } else {
                    SpeedDirective::None
                };
            }
        } else {
            for duck in &mut self.ducks {
                duck.directive = SpeedDirective::None;
            }
        }
    }

    fn visibility_flags(&self) -> Vec<(bool, bool)> {
        self.field
            .checkpoints()
            .iter()
            .map(|cp| (cp.visible, cp.is_active))
            .collect()
    }

    fn diff_visibility(&self, before: &[(bool, bool)], events: &mut Vec<RaceEvent>) {
        for (i, cp) in self.field.checkpoints().iter().enumerate() {
            let (was_visible, was_active) = before[i];
            if cp.visible && !was_visible {
                events.push(RaceEvent::CheckpointActivated(i));
            }
            if was_active && !cp.is_active && cp.is_full(self.config.winners_per_checkpoint) {
                events.push(RaceEvent::CheckpointClosed(i));
            }
        }
    }

    // --- Queries ---

    pub fn phase(&self) -> RacePhase {
        self.clock.phase
    }

    pub fn countdown_number(&self) -> u32 {
        self.clock.countdown_number()
    }

    pub fn time_remaining(&self) -> f32 {
        self.clock.race_remaining
    }

    pub fn formatted_time(&self) -> String {
        self.clock.formatted_time()
    }

    pub fn ducks(&self) -> &[Duck] {
        &self.ducks
    }

    pub fn checkpoints(&self) -> &[super::checkpoint::Checkpoint] {
        self.field.checkpoints()
    }

    /// Ordered global winner ledger.
    pub fn winners(&self) -> &[WinnerEntry] {
        &self.winners
    }

    /// True exactly when every checkpoint has filled its capacity.
    pub fn is_complete(&self) -> bool {
        self.field.is_all_complete()
    }

    pub fn slow_mo_active(&self) -> bool {
        self.slow_mo_timer > 0.0
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn shuffle<T>(items: &mut [T], rng: &mut impl Rng) {
    use rand::seq::SliceRandom;
    items.shuffle(rng);
}
