//! Duck Derby - a mass race simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (duck motion, checkpoint admission, race clock)
//! - `config`: Immutable race configuration and explicit layout
//!
//! The crate is an in-process state machine library: it consumes a time step
//! and a track width per tick and exposes plain state (positions, progress,
//! checkpoint membership). Rendering, audio and input live outside.

pub mod config;
pub mod sim;

pub use config::{Layout, RaceConfig, SpeedTiers};
pub use sim::{Duck, DuckState, Race, RaceEvent, RacePhase, Strategy};

/// Simulation tuning constants
pub mod consts {
    /// Largest per-tick time step accepted, seconds. Frames stalled longer
    /// than this are clamped so the sim never takes a huge jump.
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Duck collision radius; the front edge is `x + DUCK_RADIUS`.
    pub const DUCK_RADIUS: f32 = 18.0;

    /// Horizontal start line offset from the left edge.
    pub const START_LINE_X: f32 = 80.0;
    /// Finish line offset from the right edge.
    pub const FINISH_LINE_OFFSET: f32 = 100.0;

    /// Slow-motion celebration beat after an admission, seconds.
    pub const SLOW_MO_DURATION: f32 = 0.6;
    /// Time-dilation factor applied to ducks/checkpoints while slow-mo runs.
    pub const SLOW_MO_FACTOR: f32 = 0.45;

    /// Checkpoint slide in/out animation length, seconds.
    pub const CHECKPOINT_SLIDE_DURATION: f32 = 2.0;
    /// How far off-screen a checkpoint starts (and retreats to), pixels.
    pub const CHECKPOINT_APPEAR_OFFSET: f32 = 200.0;

    /// Winner podium grid in the grass area.
    pub const PODIUM_X: f32 = 50.0;
    pub const PODIUM_Y: f32 = 20.0;
    pub const PODIUM_GRID_COLS: u32 = 5;
    pub const PODIUM_SPACING_X: f32 = 90.0;
    pub const PODIUM_SPACING_Y: f32 = 75.0;

    /// Winning-state interpolation rate; convergence completes in ~0.45 s.
    pub const WIN_LERP_RATE: f32 = 2.2;

    /// Boost directive multiplier (priority winners approaching the line).
    pub const BOOST_DIRECTIVE_MULT: f32 = 2.5;
    /// Slow-down directive multiplier for non-winners near an active line.
    pub const SLOW_DIRECTIVE_MULT: f32 = 0.15;
    /// Distance ahead of the admission line where slow-down applies.
    pub const APPROACH_WINDOW: f32 = 60.0;
}

/// Cubic ease-out over `t` in [0, 1]
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let p = 1.0 - t;
    1.0 - p * p * p
}

/// Cubic ease-in over `t` in [0, 1]
#[inline]
pub fn ease_in_cubic(t: f32) -> f32 {
    t * t * t
}
