//! Gas Town ephemeral coordination: wisps, hook files, and work handoff.

pub mod beads;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gitignore;
pub mod mail;
pub mod telemetry;
pub mod wisp;
