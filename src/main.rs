use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use city_traffic::simulation::{SimConfig, Simulation, DEFAULT_SPAWN_INTERVAL};

#[derive(Parser)]
#[command(name = "city_traffic")]
#[command(about = "Grid city traffic simulation, run headless")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "200")]
    ticks: u64,

    /// Grid width in cells
    #[arg(long, default_value = "24")]
    width: i32,

    /// Grid height in cells
    #[arg(long, default_value = "24")]
    height: i32,

    /// Spawn vehicles on the first tick and every N ticks after
    #[arg(long, default_value_t = DEFAULT_SPAWN_INTERVAL)]
    spawn_interval: u64,

    /// Seed the random number generator for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Vehicle numbering starts after this many
    #[arg(long, default_value = "0")]
    vehicles: usize,

    /// Print a summary every N ticks (0 disables)
    #[arg(long, default_value = "50")]
    report_every: u64,

    /// Draw the ASCII map with each summary
    #[arg(long)]
    map: bool,

    /// Print the final world snapshot as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    let mut config = SimConfig::default().with_spawn_interval(cli.spawn_interval);
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let mut sim = Simulation::initialize_with_config(cli.vehicles, cli.width, cli.height, config)
        .context("Failed to set up the simulation")?;

    info!(
        "Running traffic simulation on a {}x{} grid for {} ticks",
        cli.width, cli.height, cli.ticks
    );

    if cli.map {
        sim.draw_map();
    }

    for _ in 0..cli.ticks {
        let tick = sim.step()?;

        if cli.report_every > 0 && tick % cli.report_every == 0 {
            println!("--- After tick {} ---", tick);
            sim.print_summary();
            if cli.map {
                sim.draw_map();
            }
            println!();
        }
    }

    sim.log_statistics();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
    }

    Ok(())
}
