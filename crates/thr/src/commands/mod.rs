//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod config_cmd;
pub mod controls;
pub mod families;
pub mod techs;
pub mod util;

use thr_core::Registry;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a registry-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    registry: &Registry,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Families(args) => families::handle(registry, args, global).await,
        Command::Techs(args) => techs::handle(registry, args, global).await,
        Command::Controls(args) => controls::handle(registry, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a registry".into(),
        )),
    }
}
