//! CLI layer - Command-line interface
//!
//! Argument parsing, output formatting, signal handling, logging setup and
//! the command runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod logging;
pub mod presenter;
pub mod signals;

pub use app::{run_list, run_play, run_record, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction};
pub use presenter::Presenter;
