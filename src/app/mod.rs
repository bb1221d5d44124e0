//! Binary-side wiring: configuration, terminal output and command handlers.

pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod config_runtime;
pub(crate) mod exit_handler;
pub(crate) mod progress;
pub(crate) mod runtime;
pub(crate) mod source;
pub(crate) mod terminal;
