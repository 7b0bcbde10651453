//! A configuration file shared by several processes at once.
//!
//! Each process opens its own [`Store`] on the same path, edits the in-memory
//! document, and calls [`save()`](Store::save) or [`sync()`](Store::sync).
//! Edits made by different processes to different leaves all survive; edits
//! to the same leaf resolve last-writer-wins. The whole protocol runs on plain
//! file renames, so it needs no lock daemon and no OS lock API.
//!
//! ```ignore
//! let mut store = Store::builder()
//!     .app_name("myapp")
//!     .schema(Schema::load(Path::new("schema.toml"))?)
//!     .open()?;
//!
//! store.set("ui.locale", "fr")?;
//! store.save()?;
//! ```
//!
//! # Files on disk
//!
//! Next to the primary file `myapp.toml` live up to four side files:
//!
//! | File | Meaning |
//! |------|---------|
//! | `myapp.toml.temp` | the lock; a process is mid-save |
//! | `myapp.toml.sentinel` | the store has existed before |
//! | `myapp.toml.backup` | the previous complete state |
//! | `myapp.toml.backup.temp` | the next backup being staged |
//!
//! A save renames the primary to `.temp` (taking the lock), copies it to the
//! backup, writes the new document into `.temp` and renames it back. A reader
//! that finds the primary missing while the sentinel exists knows a save is in
//! flight and waits. If the primary never comes back within the lock timeout,
//! the holder is presumed dead: `open` recovers from the backup, and `save`
//! takes the abandoned `.temp` over.
//!
//! # Schema
//!
//! A [`Schema`] declares typed fields with optional defaults, nested sections,
//! and a `*` wildcard section whose layout applies to every sub-section of its
//! parent (a table of records keyed by an arbitrary id). Validation fills
//! defaults, coerces parseable strings (`"5"` for an integer, `"yes"` for a
//! boolean), and reports every failure at once:
//!
//! ```
//! use sharedconf::{Field, Schema};
//!
//! let schema = Schema::new().field("count", Field::integer().default(0));
//! let mut doc: toml::Table = "name = \"x\"".parse()?;
//! schema.validate(&mut doc)?;
//! assert_eq!(doc["count"].as_integer(), Some(0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Keys the schema does not mention are left alone; a shared file usually
//! carries sections owned by other consumers.
//!
//! Schemas can also be written as TOML and loaded with
//! [`Schema::from_toml`] / [`Schema::load`]:
//!
//! ```toml
//! [keypairdb."*"]
//! name = { type = "string", default = "" }
//! added = { type = "float" }
//! available = { type = "boolean", default = false }
//! ```
//!
//! # Sync depth
//!
//! [`sync()`](Store::sync) replays this process's edits on top of the file
//! another process saved. [`SyncDepth`] controls how finely that happens. At
//! `Levels(0)` a changed section travels as a whole, possibly carrying stale
//! sibling values with it. The default `Levels(1)` merges the entries of each
//! top-level section independently.
//!
//! # Typed access
//!
//! [`Store::extract`] deserializes the document into a
//! [confique](https://docs.rs/confique) config struct, and
//! [`Store::extract_section`] does the same for one section, rejecting keys the
//! struct does not declare.
//!
//! # Clap adapter
//!
//! With the `clap` feature (on by default) [`StoreArgs`] gives an app
//! `config list|get|set|unset|sync` subcommands. [`into_action()`](StoreArgs::into_action)
//! produces a [`StoreAction`] that [`Store::handle`] executes.
//!
//! # Logging
//!
//! Lock contention, stale-lock takeover and backup recovery are reported
//! through [`tracing`](https://docs.rs/tracing). Install a subscriber to see
//! them.

pub mod error;
pub mod keypath;
pub mod merge;
pub mod paths;
pub mod schema;
pub mod types;
pub mod validate;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod extract;
mod lock;
mod ops;
mod store;

#[cfg(test)]
mod fixtures;

pub use builder::{DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, StoreBuilder};
#[cfg(feature = "clap")]
pub use cli::{StoreArgs, StoreSubcommand};
pub use error::{StoreError, ValidationError, ValidationFailure};
pub use merge::{diff, merge};
pub use ops::{StoreResult, format_value};
pub use paths::StorePaths;
pub use schema::{Entry, Field, Schema, Section, ValueKind};
pub use store::Store;
pub use types::{StoreAction, SyncDepth};
