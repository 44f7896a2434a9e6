//! Command Line Interface (CLI) layer for canvasfit.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! the terminal progress bar (`progress`) and the orchestration logic
//! (`runner`) that maps each subcommand onto `canvasfit::api`.
//!
//! If you are embedding canvasfit into another application, prefer using
//! the high-level `canvasfit::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod progress;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
