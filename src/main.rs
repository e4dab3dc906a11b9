//! anistream - anime discovery and episode playback from the terminal
//!
//! # Usage
//!
//! ```bash
//! anistream search "frieren"
//! anistream sources frieren-beyond-journeys-end-18542 -e 1
//! anistream play frieren-beyond-journeys-end-18542 -e 1 -Q 1080p
//! anistream comments list 'frieren$episode$1' --json
//! ```

use anistream::cli::{self, Cli, Command, ExitCode, Output};
use anistream::commands;
use anistream::config::Config;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output::new(&cli);
    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs).into(),
        },
        None => Config::load(),
    };

    run_cli(cli, &config, &output).await.into()
}

/// Logs go to stderr so stdout stays parseable
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("ANISTREAM_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("anistream={}", default)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: &Config, output: &Output) -> ExitCode {
    match cli.command {
        Command::Search(cmd) => commands::search_cmd(cmd, config, output).await,

        Command::Top(cmd) => commands::top_cmd(cmd, config, output).await,

        Command::Recent(cmd) => commands::recent_cmd(cmd, config, output).await,

        Command::Info(cmd) => commands::info_cmd(cmd, config, output).await,

        Command::Servers(cmd) => commands::servers_cmd(cmd, config, output).await,

        Command::Sources(cmd) => {
            if let Err(e) = cli::validate_id(&cmd.target) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::sources_cmd(cmd, config, output).await
        }

        Command::Probe(cmd) => {
            if let Err(e) = cli::validate_id(&cmd.target) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::probe_cmd(cmd, config, output).await
        }

        Command::Play(cmd) => {
            if let Err(e) = cli::validate_id(&cmd.episode.target) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::play_cmd(cmd, config, output).await
        }

        Command::Suggest(cmd) => commands::suggest_cmd(cmd, config, output).await,

        Command::Comments(cmd) => commands::comments_cmd(cmd, config, output).await,
    }
}
