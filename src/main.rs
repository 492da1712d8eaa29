use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use glam::IVec3;
use watercycle::cli::commands::{self, HumidityAction, RegionTarget};
use watercycle::config::simulation::CycleConfig;
use watercycle::persistence;
use watercycle::world::RegionPos;

#[derive(Parser)]
#[command(name = "watercycle")]
#[command(about = "A regional water cycle simulation: rain accumulation, evaporation, and humidity-driven weather")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Path to the sandbox world parameters
    #[arg(short, long)]
    sandbox: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation on the sandbox world
    Run {
        /// Number of steps to simulate
        #[arg(short, long, default_value_t = 24_000)]
        ticks: u64,
    },

    /// Inspect or override regional humidity
    Humidity {
        #[command(subcommand)]
        action: HumidityCommand,
    },

    /// Show aggregate humidity statistics
    Inspect {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage store snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(clap::Args)]
struct RegionArgs {
    /// Region x coordinate (defaults to the observer's region)
    #[arg(requires = "z", allow_negative_numbers = true)]
    x: Option<i32>,

    /// Region z coordinate
    #[arg(allow_negative_numbers = true)]
    z: Option<i32>,

    /// Address the region containing this cell instead
    #[arg(long, num_args = 2, value_names = ["X", "Z"], conflicts_with = "x", allow_negative_numbers = true)]
    pos: Option<Vec<i32>>,
}

impl RegionArgs {
    fn target(&self) -> RegionTarget {
        if let Some(pos) = &self.pos {
            if let [x, z] = pos.as_slice() {
                return RegionTarget::Cell(IVec3::new(*x, 0, *z));
            }
        }
        match (self.x, self.z) {
            (Some(x), Some(z)) => RegionTarget::Region(RegionPos::new(x, z)),
            _ => RegionTarget::Observer,
        }
    }
}

#[derive(Subcommand)]
enum HumidityCommand {
    /// Show a region's humidity
    Get {
        #[command(flatten)]
        region: RegionArgs,
    },

    /// Overwrite a region's humidity
    Set {
        /// Humidity in milli-units
        #[arg(allow_negative_numbers = true)]
        amount: i32,

        #[command(flatten)]
        region: RegionArgs,
    },

    /// Forget a region's humidity so it is derived again
    Reset {
        #[command(flatten)]
        region: RegionArgs,
    },

    /// Forget every region's humidity
    ResetAll {
        /// Required; this cannot be undone
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List available snapshots
    List {
        /// Snapshot directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<String>,
    },
}

fn load_config(path: &str) -> CycleConfig {
    let path = Path::new(path);
    if !path.exists() {
        return CycleConfig::default();
    }
    match CycleConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_logging(&config.log_level, cli.json_logs);
    let sandbox = cli.sandbox.as_deref();

    match cli.command {
        Commands::Run { ticks } => {
            if let Err(e) = commands::run_simulation(&config, sandbox, ticks) {
                eprintln!("Simulation error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Humidity { action } => {
            let result = match action {
                HumidityCommand::Get { region } => {
                    commands::humidity(&config, sandbox, region.target(), HumidityAction::Get)
                }
                HumidityCommand::Set { amount, region } => {
                    commands::humidity(&config, sandbox, region.target(), HumidityAction::Set(amount))
                }
                HumidityCommand::Reset { region } => {
                    commands::humidity(&config, sandbox, region.target(), HumidityAction::Reset)
                }
                HumidityCommand::ResetAll { confirm } => {
                    commands::humidity_reset_all(&config, sandbox, confirm)
                }
            };
            match result {
                Ok(message) => println!("{}", message),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Inspect { json } => {
            if let Err(e) = commands::inspect(&config, sandbox, json) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Snapshots { action } => match action {
            SnapshotAction::List { dir } => {
                let dir = dir.unwrap_or_else(|| config.snapshot_directory.clone());
                let snapshot_dir = Path::new(&dir);
                match persistence::list_snapshots(snapshot_dir) {
                    Ok(snapshots) => {
                        if snapshots.is_empty() {
                            println!("No snapshots found in {}", snapshot_dir.display());
                        } else {
                            println!("{:<24} {:>10} {:>10}  {}", "World", "Tick", "Bytes", "File");
                            println!("{}", "-".repeat(72));
                            for s in &snapshots {
                                let name = s
                                    .path
                                    .file_name()
                                    .and_then(|n| n.to_str())
                                    .unwrap_or("?");
                                println!(
                                    "{:<24} {:>10} {:>10}  {}",
                                    s.world, s.tick_count, s.size_bytes, name
                                );
                            }
                            println!(
                                "\n{} snapshot(s) in {}",
                                snapshots.len(),
                                snapshot_dir.display()
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Error listing snapshots: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
    }
}
