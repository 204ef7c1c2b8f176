//! Deterministic race simulation
//!
//! All race logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only (one `Pcg32` owned by the race)
//! - Stable iteration order (ducks by ascending id)
//! - No rendering, audio or platform dependencies
//!
//! External collaborators drive it with `Race::tick(dt)` and read back plain
//! state plus the `RaceEvent`s returned by each tick.

pub mod checkpoint;
pub mod clock;
pub mod duck;
pub mod race;

pub use checkpoint::{Checkpoint, CheckpointField};
pub use clock::{RaceClock, RacePhase};
pub use duck::{Duck, DuckState, SpeedDirective, Strategy};
pub use race::{Race, RaceEvent, WinnerEntry};
