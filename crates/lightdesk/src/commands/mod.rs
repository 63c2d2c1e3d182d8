//! Command dispatch: routes each subcommand to its handler.

pub mod changes;
pub mod channels;
pub mod config_cmd;
pub mod mapping;
pub mod scripts;
pub mod track;
pub mod universes;
pub mod util;

use lightdesk_core::{DeskConfig, LightingDesk};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend command.
///
/// `scripts` is REST-only and never opens the socket. Everything else
/// connects, runs, then closes the connection.
pub async fn dispatch(
    cmd: Command,
    config: DeskConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if matches!(cmd, Command::Scripts) {
        return scripts::handle(&config, global).await;
    }

    let desk = LightingDesk::connect(config)?;
    let result = match cmd {
        Command::Channels(args) => channels::handle(&desk, &args, global).await,
        Command::Mapping(args) => mapping::handle(&desk, &args, global).await,
        Command::Universes => universes::handle(&desk, global).await,
        Command::Track(args) => track::handle(&desk, &args, global).await,
        Command::Changes(args) => changes::handle(&desk, &args, global).await,
        // Scripts, Config and Completions are handled before connecting
        Command::Scripts | Command::Config(_) | Command::Completions(_) => unreachable!(),
    };
    desk.shutdown().await;
    result
}
