//! Command dispatch: bridges CLI args -> engine runs -> output formatting.

pub mod matches;
pub mod replay;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an engine-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Replay(args) => replay::handle(args, global).await,
        Command::Match(args) => matches::handle(&args, global),
        // Generated in main before dispatch.
        Command::Completions(_) => Ok(()),
    }
}
