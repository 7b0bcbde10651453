//! Clap adapter.
//!
//! Compiled only with the `clap` Cargo feature (on by default). [`StoreArgs`]
//! embeds into an app's `#[derive(Parser)]` to give it
//! `config list|get|set|unset|sync` subcommands. [`StoreArgs::into_action()`]
//! is the only bridge to the core; from there everything flows through
//! [`Store::handle()`](crate::Store::handle).

use clap::{Args, Subcommand};

use crate::types::StoreAction;

/// Clap-derived args for a `config` subcommand group.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(StoreArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub action: Option<StoreSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum StoreSubcommand {
    /// Show every stored key-value pair.
    List,
    /// Show the stored value for a key.
    Get {
        /// Dotted key path (e.g. "ui.locale").
        key: String,
    },
    /// Store a value and save.
    Set {
        /// Dotted key path (e.g. "ui.locale").
        key: String,
        /// Value to set.
        value: String,
    },
    /// Remove a value and save.
    Unset {
        /// Dotted key path (e.g. "ui.locale").
        key: String,
    },
    /// Pick up changes saved by other processes.
    Sync,
}

impl StoreArgs {
    /// Bare `config` and explicit `config list` both map to
    /// `StoreAction::List`.
    pub fn into_action(self) -> StoreAction {
        match self.action {
            None | Some(StoreSubcommand::List) => StoreAction::List,
            Some(StoreSubcommand::Get { key }) => StoreAction::Get { key },
            Some(StoreSubcommand::Set { key, value }) => StoreAction::Set { key, value },
            Some(StoreSubcommand::Unset { key }) => StoreAction::Unset { key },
            Some(StoreSubcommand::Sync) => StoreAction::Sync,
        }
    }
}
