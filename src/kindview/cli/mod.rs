//! # CLI Behavior
//!
//! This is one possible UI client for kindview. It is the only place that knows
//! about terminal I/O, exit codes and output formatting; everything it does goes
//! through [`kindview::api::BrowserApi`].
//!
//! ## Stores
//!
//! `--data-file PATH` (or `data-file` in the config) browses a JSON entity dump.
//! Without it, the CLI talks to the Datastore emulator at the configured host.
//!
//! ## Naked Execution
//!
//! Running `kindview` with no command lists the kinds, which is where every
//! browsing session starts.
//!
//! ## Module Structure
//!
//! - `commands`: per-command handlers and the interactive `browse` loop
//! - `render`: table layout and template rendering
//! - `setup`: argument parsing via clap, grouped help
//! - `styles`: semantic style names and the console theme
//! - `templates`: embedded output templates

mod commands;
mod render;
pub mod setup;
mod styles;
mod templates;

pub use commands::run;
