//! Tilewall - supervise the processes of a tiled display wall

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tilewall_cli::cli::Cli;
use tilewall_cli::output::json;

/// Logs go to stderr so they never mix with `--json` output. `RUST_LOG`
/// overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            if json_mode {
                let message = format!("{e:#}");
                match json::format_error(&message, "command_failed") {
                    Ok(text) => println!("{text}"),
                    Err(_) => eprintln!("Error: {message}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
