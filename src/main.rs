use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use reflector_dish::{Config, Platform, Simulator};

/// Report the north load on a platform of rocks, after one northward tilt and after many spin cycles.
#[derive(Debug, Parser)]
struct Args {
    /// Platform layout: one row per line of `O`, `#` and `.`.
    input: PathBuf,

    /// How many spin cycles to run.
    #[arg(long, default_value_t = 1_000_000_000)]
    cycles: u64,

    /// The most layouts to remember while looking for a repeat.
    #[arg(long, default_value_t = Config::DEFAULT_HISTORY_CAPACITY)]
    history: usize,

    /// Also print the final layout.
    #[arg(long)]
    print_grid: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let platform: Platform = input
        .parse()
        .with_context(|| format!("parsing {}", args.input.display()))?;
    log::info!(
        "loaded a {}x{} platform from {}",
        platform.width(),
        platform.height(),
        args.input.display()
    );

    println!("{}", platform.north_load_after_tilt());

    let config = Config::default().with_history_capacity(args.history);
    let mut simulator = Simulator::with_config(platform, config);
    let layout = simulator
        .run(args.cycles)
        .with_context(|| format!("spinning {} cycles", args.cycles))?;
    log::info!(
        "simulated {} of {} cycles ({:?})",
        simulator.cycles_simulated(),
        args.cycles,
        simulator.phase()
    );

    if args.print_grid {
        println!("{layout}");
    }
    println!("{}", layout.north_load());

    Ok(())
}
