//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::infra::LauncherConfig;

/// Supervise the processes of a tiled display wall
#[derive(Parser)]
#[command(
    name = "tilewall",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Log supervision events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the fleet or the listed components and stream their output
    Start(commands::start::StartArgs),

    /// Stop the fleet or the listed components
    Stop(commands::stop::StopArgs),

    /// Show liveness of every component
    Status,

    /// Show or edit component settings
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the launcher configuration is invalid or the
    /// command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            verbose: _,
            command,
        } = self;

        if let Command::Version = command {
            return commands::version::run(json);
        }

        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        };
        let app = AppContext::new(&flags, LauncherConfig::from_env()?);

        match command {
            Command::Start(args) => commands::start::run(&app, &args).await,
            Command::Stop(args) => commands::stop::run(&app, &args),
            Command::Status => commands::status::run(&app),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(json),
        }
    }
}
