//! Checkpoint admission
//!
//! An ordered sequence of gating lines, each with limited winner capacity.
//! Checkpoints activate on a schedule, admit ducks in arrival order, and
//! retire once full - except the final checkpoint, which stays on the track.
//! Slide in/out animation state lives here because the animated `current_x`
//! is the admission line while a checkpoint is still moving.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{ease_in_cubic, ease_out_cubic};

/// One gating checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub index: usize,
    /// Where the line settles once slid in.
    pub target_x: f32,
    /// Current admission line (animated).
    pub current_x: f32,
    pub visible: bool,
    pub is_active: bool,
    pub is_final: bool,
    /// Race-time offset at which this checkpoint may activate.
    pub scheduled_time: f32,
    /// Admitted duck ids, insertion order = arrival order.
    pub winners: Vec<u32>,
    animating: bool,
    animation_progress: f32,
    sliding_out: bool,
    slide_out_progress: f32,
}

impl Checkpoint {
    fn new(index: usize, target_x: f32, scheduled_time: f32, is_final: bool, track_width: f32) -> Self {
        Self {
            index,
            target_x,
            current_x: track_width + CHECKPOINT_APPEAR_OFFSET,
            visible: false,
            is_active: false,
            is_final,
            scheduled_time,
            winners: Vec::new(),
            animating: false,
            animation_progress: 0.0,
            sliding_out: false,
            slide_out_progress: 0.0,
        }
    }

    fn activate(&mut self) {
        self.visible = true;
        self.is_active = true;
        self.animating = true;
        self.animation_progress = 0.0;
    }

    fn update_animation(&mut self, dt: f32, track_width: f32) {
        if self.animating && !self.sliding_out {
            self.animation_progress += dt / CHECKPOINT_SLIDE_DURATION;
            if self.animation_progress >= 1.0 {
                self.animation_progress = 1.0;
                self.animating = false;
                self.current_x = self.target_x;
            } else {
                let eased = ease_out_cubic(self.animation_progress);
                let start_x = track_width + CHECKPOINT_APPEAR_OFFSET;
                self.current_x = start_x + (self.target_x - start_x) * eased;
            }
        }

        if self.sliding_out {
            self.slide_out_progress += dt / CHECKPOINT_SLIDE_DURATION;
            if self.slide_out_progress >= 1.0 {
                self.slide_out_progress = 1.0;
                self.visible = false;
                self.sliding_out = false;
            } else {
                let eased = ease_in_cubic(self.slide_out_progress);
                let end_x = -CHECKPOINT_APPEAR_OFFSET;
                self.current_x = self.target_x + (end_x - self.target_x) * eased;
            }
        }
    }

    pub fn is_full(&self, capacity: u32) -> bool {
        self.winners.len() >= capacity as usize
    }
}

/// The ordered field of checkpoints plus the admission state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointField {
    checkpoints: Vec<Checkpoint>,
    winners_per_checkpoint: u32,
    /// Pointer to the checkpoint currently accepting arrivals. Monotonic.
    current_index: usize,
    /// Elapsed racing time driving scheduled activations.
    elapsed: f32,
    track_width: f32,
}

impl CheckpointField {
    pub fn new(
        total_checkpoints: u32,
        winners_per_checkpoint: u32,
        timings: &[f32],
        track_width: f32,
    ) -> Self {
        let count = total_checkpoints as usize;
        let segment = track_width / (count as f32 + 1.0);
        let checkpoints = (0..count)
            .map(|i| {
                let target_x = segment * (i as f32 + 1.0) + START_LINE_X;
                let scheduled = timings.get(i).copied().unwrap_or(0.0);
                Checkpoint::new(i, target_x, scheduled, i == count - 1, track_width)
            })
            .collect();
        Self {
            checkpoints,
            winners_per_checkpoint,
            current_index: 0,
            elapsed: 0.0,
            track_width,
        }
    }

    /// Activate the next unactivated checkpoint ahead of schedule.
    pub fn activate_next(&mut self) -> Option<&Checkpoint> {
        let cp = self.checkpoints.get_mut(self.current_index)?;
        if !cp.visible {
            cp.activate();
            log::info!("checkpoint {} activated at x={:.0}", cp.index, cp.target_x);
        }
        Some(cp)
    }

    /// Advance elapsed time, auto-activate on schedule, update animations.
    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;

        // Only the current checkpoint may activate; visited ones never re-arm.
        if let Some(cp) = self.checkpoints.get_mut(self.current_index)
            && !cp.visible
            && !cp.animating
            && self.elapsed >= cp.scheduled_time
        {
            cp.activate();
            log::info!(
                "checkpoint {} activated on schedule ({:.1}s)",
                cp.index,
                self.elapsed
            );
        }

        for cp in &mut self.checkpoints {
            cp.update_animation(dt, self.track_width);
        }
    }

    /// Try to admit `duck_id` at `checkpoint_index`. Returns false (no-op) on
    /// an invalid index, a full checkpoint, or a duck already admitted
    /// anywhere. On filling the checkpoint, retires it (unless final) and
    /// advances to the next, activating it immediately.
    pub fn admit(&mut self, checkpoint_index: usize, duck_id: u32) -> bool {
        if checkpoint_index >= self.checkpoints.len() {
            return false;
        }
        if self
            .checkpoints
            .iter()
            .any(|cp| cp.winners.contains(&duck_id))
        {
            return false;
        }

        let capacity = self.winners_per_checkpoint;
        let cp = &mut self.checkpoints[checkpoint_index];
        if cp.is_full(capacity) {
            return false;
        }

        cp.winners.push(duck_id);
        log::info!(
            "duck {} admitted at checkpoint {} ({}/{})",
            duck_id,
            checkpoint_index,
            cp.winners.len(),
            capacity
        );

        if cp.is_full(capacity) {
            if !cp.is_final {
                cp.sliding_out = true;
                cp.slide_out_progress = 0.0;
                cp.is_active = false;
            }
            self.current_index += 1;
            self.activate_next();
        }

        true
    }

    /// The checkpoint currently accepting arrivals, if any remain.
    pub fn current(&self) -> Option<&Checkpoint> {
        self.checkpoints.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// True exactly when every checkpoint has filled its capacity.
    pub fn is_all_complete(&self) -> bool {
        self.checkpoints
            .iter()
            .all(|cp| cp.is_full(self.winners_per_checkpoint))
    }

    /// Re-derive target positions for a new track width without touching
    /// winners, activation state or the current pointer.
    pub fn set_track_width(&mut self, track_width: f32) {
        self.track_width = track_width;
        let segment = track_width / (self.checkpoints.len() as f32 + 1.0);
        for cp in &mut self.checkpoints {
            cp.target_x = segment * (cp.index as f32 + 1.0) + START_LINE_X;
            // Settled checkpoints snap to the new line; moving ones re-aim.
            if cp.visible && !cp.animating && !cp.sliding_out {
                cp.current_x = cp.target_x;
            } else if !cp.visible && !cp.sliding_out {
                cp.current_x = track_width + CHECKPOINT_APPEAR_OFFSET;
            }
        }
    }

    pub fn reset(&mut self) {
        self.current_index = 0;
        self.elapsed = 0.0;
        for cp in &mut self.checkpoints {
            cp.current_x = self.track_width + CHECKPOINT_APPEAR_OFFSET;
            cp.visible = false;
            cp.is_active = false;
            cp.animating = false;
            cp.animation_progress = 0.0;
            cp.winners.clear();
            cp.sliding_out = false;
            cp.slide_out_progress = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> CheckpointField {
        // 4 checkpoints x 2 winners on a 1100px track, scheduled every 10s.
        CheckpointField::new(4, 2, &[10.0, 20.0, 30.0, 40.0], 1100.0)
    }

    #[test]
    fn test_scheduled_activation_is_monotonic() {
        let mut f = field();
        assert!(f.current().is_some());
        assert!(!f.current().unwrap().visible);

        f.tick(9.0);
        assert!(!f.current().unwrap().visible);
        f.tick(1.5);
        assert!(f.current().unwrap().visible);
        assert!(f.current().unwrap().is_active);

        // Later checkpoints do not pre-activate on the same clock.
        assert!(!f.checkpoints()[1].visible);
    }

    #[test]
    fn test_admission_capacity_and_advance() {
        let mut f = field();
        f.activate_next();

        assert!(f.admit(0, 1));
        assert_eq!(f.current_index(), 0);
        assert!(f.admit(0, 2));

        // Checkpoint 0 is full: closed, pointer advanced, next active.
        assert_eq!(f.current_index(), 1);
        assert!(!f.checkpoints()[0].is_active);
        assert!(f.checkpoints()[1].is_active);

        // Over-capacity admission is a no-op failure.
        assert!(!f.admit(0, 3));
        assert_eq!(f.checkpoints()[0].winners.len(), 2);
    }

    #[test]
    fn test_no_duck_admitted_twice_anywhere() {
        let mut f = field();
        f.activate_next();
        assert!(f.admit(0, 7));
        assert!(!f.admit(0, 7));
        assert!(f.admit(0, 8));
        // Duck 7 already holds a slot at checkpoint 0.
        assert!(!f.admit(1, 7));
    }

    #[test]
    fn test_invalid_index_is_noop() {
        let mut f = field();
        assert!(!f.admit(99, 1));
        assert!(f.checkpoints().iter().all(|cp| cp.winners.is_empty()));
    }

    #[test]
    fn test_final_checkpoint_never_retires() {
        let mut f = field();
        for idx in 0..4 {
            f.activate_next();
            let a = (idx * 2 + 1) as u32;
            let b = (idx * 2 + 2) as u32;
            assert!(f.admit(idx, a));
            assert!(f.admit(idx, b));
        }
        assert!(f.is_all_complete());

        // Non-final checkpoints slide out; the final one stays visible.
        f.tick(CHECKPOINT_SLIDE_DURATION + 0.1);
        assert!(!f.checkpoints()[0].visible);
        assert!(f.checkpoints()[3].visible);
    }

    #[test]
    fn test_pointer_never_decreases() {
        let mut f = field();
        f.activate_next();
        let mut last = f.current_index();
        for id in 1..=8 {
            let idx = f.current_index();
            f.admit(idx, id);
            assert!(f.current_index() >= last);
            last = f.current_index();
        }
        assert_eq!(last, 4); // past the end once all are full
        assert!(f.current().is_none());
    }

    #[test]
    fn test_resize_preserves_progress() {
        let mut f = field();
        f.activate_next();
        f.tick(CHECKPOINT_SLIDE_DURATION + 0.1); // settle slide-in
        f.admit(0, 1);

        f.set_track_width(2200.0);
        assert_eq!(f.checkpoints()[0].winners, vec![1]);
        assert_eq!(f.current_index(), 0);
        assert!(f.checkpoints()[0].visible);
        // Settled line snapped to the re-derived position.
        let cp = &f.checkpoints()[0];
        assert_eq!(cp.current_x, cp.target_x);
        assert!((cp.target_x - (2200.0 / 5.0 + START_LINE_X)).abs() < 1e-3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut f = field();
        f.activate_next();
        f.tick(25.0);
        f.admit(0, 1);
        f.admit(0, 2);
        f.reset();
        assert_eq!(f.current_index(), 0);
        assert!(!f.is_all_complete());
        for cp in f.checkpoints() {
            assert!(cp.winners.is_empty());
            assert!(!cp.visible && !cp.is_active);
        }
    }
}
