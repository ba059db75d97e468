//! Command line interface

pub mod actions;
pub mod commands;
pub mod display;

pub use commands::{CliArgs, Commands, GlobalArgs};
