//! Tilt a platform of rocks and find where the rocks end up after any number of spin cycles.
//!
//! A [`Platform`] holds movable rocks (`O`), fixed rocks (`#`) and empty space (`.`).
//! Tilting it with [`Platform::compact`] rolls every movable rock as far as it can go;
//! a spin cycle tilts it north, west, south and then east. The [`Simulator`] spins a
//! platform until its layouts provably repeat, then reads the layout after any number
//! of cycles straight off its history.
//!
//! ```
//! use reflector_dish::{Platform, Simulator};
//!
//! let platform: Platform = "O.#\n..O\n#O.".parse()?;
//! let mut simulator = Simulator::new(platform);
//! let layout = simulator.run(1_000_000_000)?;
//! assert_eq!((layout.width(), layout.height()), (3, 3));
//! # Ok::<(), reflector_dish::Error>(())
//! ```

mod grid;
mod platform;
mod simulator;
mod snapshot;

pub use platform::{Cell, Direction, Error as PlatformError, Platform};
pub use simulator::{Config, Detector, Error as SimulatorError, Lookback, Phase, Simulator};
pub use snapshot::{History, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed grid: {0}")]
    MalformedGrid(#[from] PlatformError),
    #[error(transparent)]
    Simulation(#[from] SimulatorError),
}

/// Parse `input`, spin it `cycles` times, and return the resulting north load.
pub fn spin_load(input: &str, cycles: u64, config: Config) -> Result<u64, Error> {
    let platform = input.parse::<Platform>()?;
    let mut simulator = Simulator::with_config(platform, config);
    Ok(simulator.run(cycles)?.north_load())
}
