mod settings;

use std::fmt::Debug;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use msts_data::env_file::read_env_file;
use msts_data::rdb_file::read_rdb_file;
use serde::Serialize;

use crate::settings::{Loader, OutputFormat, Settings};

/// Decode MSTS environment and road database files.
#[derive(Parser)]
#[command(name = "msts-rs", version, about)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How to print the decoded file
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode an environment (.env) file
    Env {
        file: PathBuf,
    },

    /// Decode a road database (.rdb) file
    Rdb {
        file: PathBuf,
    },

    /// Find the junction node placed by a world object
    #[command(allow_negative_numbers = true)]
    Junction {
        /// Road database (.rdb) file
        file: PathBuf,
        tile_x: i32,
        tile_z: i32,
        /// World object id of the switch
        uid: i32,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(&settings, cli.verbose);
    let format = settings.output.format;

    match cli.command {
        Command::Env { file } => {
            let env = read_env_file(&file)
                .wrap_err_with(|| format!("decoding {}", file.display()))?;
            print(&env, format)?;
        }
        Command::Rdb { file } => {
            let rdb = read_rdb_file(&file)
                .wrap_err_with(|| format!("decoding {}", file.display()))?;
            print(&rdb, format)?;
        }
        Command::Junction {
            file,
            tile_x,
            tile_z,
            uid,
        } => {
            let rdb = read_rdb_file(&file)
                .wrap_err_with(|| format!("decoding {}", file.display()))?;
            let node = rdb.junction_node(tile_x, tile_z, uid)?;
            log::info!(
                "junction found in slot {:?}",
                rdb.road_track_db.track_node_index(node)
            );
            print(node, format)?;
        }
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut loader = Loader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if let Some(format) = cli.format {
        loader = loader.set_override("output.format", format.as_str())?;
    }
    let settings = loader.build().wrap_err("loading configuration")?;
    Ok(settings)
}

fn init_logging(settings: &Settings, verbose: u8) {
    let level = match verbose {
        0 => settings.log.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print<T: Serialize + Debug + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Debug => println!("{value:#?}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
