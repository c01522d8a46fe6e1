//! Command dispatch: bridges CLI args -> monitor/auth calls -> output.

pub mod alerts;
pub mod auth;
pub mod config_cmd;
pub mod network;
pub mod util;
pub mod watch;

use crate::cli::Command;
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a backend-bound command to its handler.
pub async fn dispatch(cmd: Command, ctx: &mut Context) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(args, ctx).await,
        Command::Signup(args) => auth::signup(args, ctx).await,
        Command::Logout => auth::logout(ctx).await,
        Command::ResetPassword(args) => auth::reset_password(args, ctx).await,
        Command::Whoami => auth::whoami(ctx).await,
        Command::Overview => network::overview(ctx).await,
        Command::Traffic(args) => network::traffic(&args, ctx).await,
        Command::Anomalies(args) => network::anomalies(&args, ctx).await,
        Command::Devices => network::devices(ctx).await,
        Command::TopTalkers(args) => network::top_talkers(&args, ctx).await,
        Command::Alerts(args) => alerts::handle(&args, ctx).await,
        Command::Watch(args) => watch::handle(&args, ctx).await,
        Command::Config(args) => config_cmd::handle(args, ctx),
        // Generated before any config is loaded.
        Command::Completions(_) => Ok(()),
    }
}
