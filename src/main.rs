//! Headless race runner
//!
//! Runs one complete race at a fixed timestep and prints the winner board.
//! Useful for tuning pacing without a front end:
//!
//! ```text
//! RUST_LOG=info cargo run -- [seed]
//! ```

use duck_derby::sim::{Race, RaceEvent, RacePhase};
use duck_derby::RaceConfig;

const DT: f32 = 1.0 / 60.0;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0xD0CC);

    let config = RaceConfig::default();
    let mut race = Race::new(config, 1600.0, 900.0, seed);
    race.start();

    let mut elapsed = 0.0f32;
    while race.phase() != RacePhase::Finished {
        for event in race.tick(DT) {
            match event {
                RaceEvent::CountdownFinished => log::info!("[{elapsed:6.2}s] go!"),
                RaceEvent::CheckpointActivated(i) => {
                    log::info!("[{elapsed:6.2}s] checkpoint {i} on the track")
                }
                RaceEvent::CheckpointClosed(i) => {
                    log::info!("[{elapsed:6.2}s] checkpoint {i} full, retiring")
                }
                RaceEvent::DuckAdmitted {
                    duck_id,
                    checkpoint,
                    arrival_rank,
                } => log::info!(
                    "[{elapsed:6.2}s] duck {duck_id} takes slot {} at checkpoint {checkpoint}",
                    arrival_rank + 1
                ),
                RaceEvent::RaceFinished { complete } => {
                    log::info!("[{elapsed:6.2}s] race over (complete: {complete})")
                }
            }
        }
        elapsed += DT;
    }

    println!(
        "seed {seed}: {} winners in {elapsed:.1}s (complete: {})",
        race.winners().len(),
        race.is_complete()
    );
    match serde_json::to_string_pretty(race.winners()) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to serialize winner board: {err}"),
    }
}
