// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reach simulator CLI.
//!
//! Runs JSON scenarios against the headless physics and pose adapters and
//! manages the interaction settings stored under the user config directory.
//!
//! # Usage
//! ```text
//! reach-sim run <SCENARIO> [--json] [--no-config]
//! reach-sim settings show [--defaults]
//! reach-sim settings save <FILE>
//! reach-sim settings reset
//! ```
//!
//! The CLI exits with code `0` on success and non-zero on error.

mod report;
mod scenario;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use reach_app_core::SettingsService;
use reach_config_fs::FsConfigStore;
use reach_core::InteractionSettings;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(
    name = "reach-sim",
    version,
    about = "Headless Reach interaction simulator",
    disable_help_subcommand = true
)]
struct Cli {
    /// Log verbosity on stderr: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Store settings under DIR instead of the user config directory.
    #[arg(long, value_name = "DIR", global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and report the final interaction state.
    Run(RunArgs),
    /// Inspect or store interaction settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct RunArgs {
    /// Scenario file (JSON).
    scenario: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Start from default settings, ignoring the stored ones.
    #[arg(long)]
    no_config: bool,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the stored settings (or the defaults) as JSON.
    Show {
        /// Print the built-in defaults.
        #[arg(long)]
        defaults: bool,
    },
    /// Validate a settings file and store it.
    Save {
        /// Settings file (JSON); missing fields take their defaults.
        file: PathBuf,
    },
    /// Store the built-in defaults.
    Reset,
}

const fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level(cli.verbose))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match cli.command {
        Commands::Run(args) => run(&args, cli.config_dir.as_deref()),
        Commands::Settings(cmd) => settings(cmd, cli.config_dir.as_deref()),
    }
}

fn open_config(dir: Option<&Path>) -> Result<SettingsService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::with_base(dir),
        None => FsConfigStore::new(),
    }
    .context("failed to open the settings store")?;
    Ok(SettingsService::new(store))
}

fn stored_settings(config: &SettingsService<FsConfigStore>) -> Result<InteractionSettings> {
    config.load().context("failed to load stored settings")
}

fn run(args: &RunArgs, config_dir: Option<&Path>) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let base = if args.no_config {
        InteractionSettings::default()
    } else {
        match open_config(config_dir) {
            Ok(config) => stored_settings(&config)?,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "settings store unavailable; using defaults");
                InteractionSettings::default()
            }
        }
    };
    let report = scenario::run(&scenario, base)
        .with_context(|| format!("scenario {:?} failed", scenario.name))?;

    let mut out = std::io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        report::write_text(&mut out, &report)?;
    }
    Ok(())
}

fn settings(cmd: SettingsCommand, config_dir: Option<&Path>) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match cmd {
        SettingsCommand::Show { defaults } => {
            let settings = if defaults {
                InteractionSettings::default()
            } else {
                stored_settings(&open_config(config_dir)?)?
            };
            serde_json::to_writer_pretty(&mut out, &settings)?;
            writeln!(out)?;
        }
        SettingsCommand::Save { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let settings: InteractionSettings = serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            settings
                .validate()
                .with_context(|| format!("{} holds invalid settings", file.display()))?;
            let config = open_config(config_dir)?;
            config.save(&settings).context("failed to store settings")?;
            info!(dir = %config.store().base().display(), "settings stored");
            writeln!(out, "settings stored in {}", config.store().base().display())?;
        }
        SettingsCommand::Reset => {
            let config = open_config(config_dir)?;
            config.reset().context("failed to store settings")?;
            writeln!(out, "default settings stored in {}", config.store().base().display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level(0), Level::WARN);
        assert_eq!(level(2), Level::DEBUG);
        assert_eq!(level(9), Level::TRACE);
    }
}
