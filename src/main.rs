//! tripmerge: merge SUMO route files by person departure time
//!
//! Usage: tripmerge <COMMAND> [OPTIONS]

mod logging;

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

use tripmerge::commands::{
    verify_sorted, GenerateCommand, GenerateConfig, MergeCommand, SizeSpec,
};
use tripmerge::routes::RouteError;

#[derive(Parser)]
#[command(name = "tripmerge")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "tripmerge: merge SUMO route files into one stream ordered by person departure time", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge route files into one document ordered by person depart time
    Merge {
        /// Input route files (use - for stdin)
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail if any input lists persons out of departure order
        #[arg(long)]
        check_sorted: bool,

        /// Use smaller I/O buffers
        #[arg(long)]
        low_memory: bool,

        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Check that route files list persons by non-decreasing depart time
    Verify {
        /// Input route files
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },

    /// Generate synthetic sorted route files for benchmarking
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "./tripmerge_bench_data")]
        output: PathBuf,

        /// Number of route files
        #[arg(long, default_value = "4")]
        files: usize,

        /// Persons per file (e.g., 1K, 5M)
        #[arg(long, default_value = "100K")]
        persons: String,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Maximum vehicles defined before a riding person
        #[arg(long, default_value = "2")]
        max_vehicles: u32,

        /// Share of persons that ride a vehicle (0..=1)
        #[arg(long, default_value = "0.6")]
        ride_share: f64,

        /// Time horizon in seconds departures are spread over
        #[arg(long, default_value = "86400")]
        horizon: f64,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Merge {
            inputs,
            output,
            check_sorted,
            low_memory,
            stats,
        } => run_merge(inputs, output, check_sorted, low_memory, stats),

        Commands::Verify { inputs } => run_verify(inputs),

        Commands::Generate {
            output,
            files,
            persons,
            seed,
            max_vehicles,
            ride_share,
            horizon,
            force,
        } => run_generate(
            output,
            files,
            persons,
            seed,
            max_vehicles,
            ride_share,
            horizon,
            force,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_merge(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    check_sorted: bool,
    low_memory: bool,
    stats: bool,
) -> Result<(), RouteError> {
    let cmd = MergeCommand::new()
        .with_check_sorted(check_sorted)
        .with_low_memory(low_memory);

    // Open inputs before creating the output file
    let readers = cmd.open_inputs(&inputs)?;

    let result = match output {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::create(&path).map_err(|source| RouteError::OutputUnavailable {
                output: path.display().to_string(),
                source,
            })?;
            cmd.run_readers(readers, file)?
        }
        _ => {
            let stdout = io::stdout();
            cmd.run_readers(readers, stdout.lock())?
        }
    };

    if stats {
        eprintln!("Merge stats: {}", result);
    }

    Ok(())
}

fn run_verify(inputs: Vec<PathBuf>) -> Result<(), RouteError> {
    for path in &inputs {
        let report = verify_sorted(path)?;
        println!("{}: sorted ({})", path.display(), report);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    output: PathBuf,
    files: usize,
    persons: String,
    seed: u64,
    max_vehicles: u32,
    ride_share: f64,
    horizon: f64,
    force: bool,
) -> Result<(), RouteError> {
    let persons = SizeSpec::from_str(&persons).ok_or_else(|| {
        RouteError::InvalidArgument(format!(
            "Invalid persons count '{}'. Use formats like 1K, 5M, 100",
            persons
        ))
    })?;

    let config = GenerateConfig {
        output_dir: output,
        files,
        persons: persons.count,
        seed,
        max_vehicles,
        ride_share,
        horizon,
        force,
    };

    let stats = GenerateCommand::new(config).run()?;
    eprintln!("Complete: {}", stats);

    Ok(())
}
