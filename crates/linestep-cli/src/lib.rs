//! Crate implementing the `linestep` command.

mod cli;
mod config;
mod handler;
mod run;

pub use self::cli::CliOpts;
pub use self::config::StepConfig;
pub use self::handler::{ConsoleHandler, Error};
pub use self::run::evaluate_run;
