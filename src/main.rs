/*
 * RPS Ecology - CLI Entry Point
 *
 * Headless rock-paper-scissors predator/prey simulation in a periodic box.
 */

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use rps_ecology::scheduler::{GameSpeed, TickScheduler};
use rps_ecology::species::species_name;
use rps_ecology::stepper::Stepper;
use rps_ecology::{SimulationParams, SimulationState};

#[derive(Parser)]
#[command(name = "rps-ecology")]
#[command(version)]
#[command(about = "Three-species rock-paper-scissors steering simulation in a periodic 3D box")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Configuration file (YAML); defaults are used if it does not exist
        #[arg(short, long, default_value = "ecology.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Use the spatial grid for neighbor search
        #[arg(long)]
        grid: bool,

        /// Pace ticks by the configured cadence instead of running flat out
        #[arg(long)]
        realtime: bool,

        /// Cadence preset 1 (slowest) to 6 (fastest); implies --realtime
        #[arg(long)]
        speed: Option<u8>,

        /// Print populations every N ticks (0 = only at the end)
        #[arg(long, default_value = "100")]
        report_every: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "ecology.yaml")]
        output: PathBuf,
    },

    /// Compare full-scan and grid-indexed tick times
    Bench {
        /// Number of ticks per run
        #[arg(short, long, default_value = "200")]
        steps: u64,

        /// Points per species
        #[arg(short, long, default_value = "500")]
        points: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            seed,
            grid,
            realtime,
            speed,
            report_every,
        } => run_simulation(config, steps, seed, grid, realtime, speed, report_every),

        Commands::Init { output } => generate_config(output),

        Commands::Bench { steps, points } => run_benchmark(steps, points),
    }
}

fn print_populations(state: &SimulationState) {
    let populations: Vec<String> = state
        .populations()
        .iter()
        .enumerate()
        .map(|(species, count)| format!("{} {}", species_name(species), count))
        .collect();
    println!("tick {:>6}: {}", state.tick(), populations.join(", "));
}

fn run_simulation(
    config_path: PathBuf,
    steps: u64,
    seed: Option<u64>,
    grid: bool,
    realtime: bool,
    speed: Option<u8>,
    report_every: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let mut params = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        SimulationParams::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        SimulationParams::default()
    };
    if let Some(s) = seed {
        println!("Using seed: {}", s);
        params.seed = Some(s);
    }
    if grid {
        params.use_grid_index = true;
    }
    if let Some(level) = speed {
        params.tick_delay_ms = GameSpeed::new(level)?.delay().as_millis() as u64;
    }
    let realtime = realtime || speed.is_some();

    let mut state = SimulationState::initialize(params)?;
    let mut stepper = Stepper::new();

    println!("Starting simulation");
    println!("  Species: {}", state.species_count());
    println!("  Points per species: {}", state.params().points_per_species);
    println!("  Collision mode: {:?}", state.params().collision_mode);
    println!("  Grid index: {}", state.params().use_grid_index);
    println!("  Steps: {}", steps);
    println!();

    let mut scheduler = TickScheduler::new(state.params().tick_delay());
    let start = Instant::now();
    scheduler.start(start);

    while state.tick() < steps {
        if realtime {
            let now = Instant::now();
            if !scheduler.poll(now) {
                thread::sleep(scheduler.time_until_next(now).unwrap_or(Duration::from_millis(1)));
                continue;
            }
        }

        state.advance(&mut stepper)?;

        if report_every > 0 && state.tick() % report_every == 0 {
            print_populations(&state);
        }

        // One species left means nothing can change any more
        let surviving = state.surviving_species();
        if surviving.len() <= 1 {
            match surviving.first() {
                Some(&winner) => println!("\n{} wins at tick {}", species_name(winner), state.tick()),
                None => println!("\nAll species extinct at tick {}", state.tick()),
            }
            break;
        }
    }

    let elapsed = start.elapsed();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Ticks: {}", state.tick());
    println!("Speed: {:.1} ticks/s", state.tick() as f64 / elapsed.as_secs_f64());
    print_populations(&state);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let params = SimulationParams::default();
    params.save(&output)?;
    println!("Default configuration saved to: {:?}", output);
    Ok(())
}

fn run_benchmark(steps: u64, points: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("Running benchmark: {} ticks, {} points per species", steps, points);
    println!();

    for use_grid_index in [false, true] {
        let params = SimulationParams {
            points_per_species: points,
            use_grid_index,
            seed: Some(42),
            ..SimulationParams::default()
        };
        let mut state = SimulationState::initialize(params)?;
        let mut stepper = Stepper::new();

        let start = Instant::now();
        for _ in 0..steps {
            state.advance(&mut stepper)?;
        }
        let elapsed = start.elapsed();

        println!(
            "{:<10} {:>8.2} ms/tick  ({:.1} ticks/s, final total {})",
            if use_grid_index { "grid" } else { "full scan" },
            elapsed.as_secs_f64() * 1000.0 / steps.max(1) as f64,
            steps as f64 / elapsed.as_secs_f64(),
            state.total_population()
        );
    }

    Ok(())
}
