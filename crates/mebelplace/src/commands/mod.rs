//! Command handlers, one module per command group.

pub mod api;
pub mod auth;
pub mod config_cmd;
pub mod util;

use mebelplace_core::QueryClient;

use crate::cli::Command;
use crate::config::Config;
use crate::error::CliError;
use crate::output::Printer;

/// Dispatch a command that needs an API client.
pub async fn dispatch(
    cmd: Command,
    client: &QueryClient,
    cfg: &Config,
    printer: &Printer,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(&args, client, printer).await,
        Command::Register(args) => auth::register(args, client, printer).await,
        Command::Logout => auth::logout(client, printer).await,
        Command::Whoami => auth::whoami(client, printer).await,
        Command::Status => auth::status(client, cfg, printer),
        Command::Refresh => auth::refresh(client, printer).await,
        Command::Api(args) => api::handle(args, client, printer).await,
        Command::Config(_) | Command::Completions(_) => unreachable!("handled before dispatch"),
    }
}
