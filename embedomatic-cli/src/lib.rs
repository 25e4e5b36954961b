//! Terminal front end for Embed-o-Matic.
//!
//! The `embedomatic` binary wraps [`embedomatic_rag`] with one-shot
//! subcommands (`ingest`, `ask`, `search`) and an interactive `shell`.

pub mod app;
pub mod args;
pub mod render;
pub mod shell;

pub use app::{Backend, build_session, upload};
pub use args::{Cli, Command, GlobalOptions, QueryOptions};
pub use shell::{Shell, ShellCommand};
