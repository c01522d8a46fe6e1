mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigArgs, ConfigCommand};
use crate::config::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let default = format!("warn,netpulse={level},netpulse_core={level},netpulse_api={level},netpulse_config={level}");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Neither needs a readable config file.
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "netpulse", &mut std::io::stdout());
            Ok(())
        }
        Command::Config(ConfigArgs {
            command: ConfigCommand::Path,
        }) => {
            commands::config_cmd::print_path();
            Ok(())
        }

        cmd => {
            let mut ctx = Context::load(&cli.global)?;
            tracing::debug!(command = ?cmd, profile = %ctx.profile, "dispatching command");
            commands::dispatch(cmd, &mut ctx).await
        }
    }
}
