//! Command-line front end for pagepipe.
//!
//! The library half holds the pager, rendering and the demo server so they
//! can be tested without the binary.

pub mod args;
pub mod config;
pub mod error;
pub mod pager;
pub mod render;
pub mod repl;
#[cfg(feature = "serve")]
pub mod server;

pub use config::{load_config, resolve_config_path};
pub use error::{CliError, CliResult};
pub use pager::{Action, Command, Pager};
