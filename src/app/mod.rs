//! Application runtime composition modules.

pub(crate) mod config;
pub(crate) mod exit_handler;
pub(crate) mod open;
pub(crate) mod orchestrator;
pub(crate) mod reporter;
pub(crate) mod terminal;
