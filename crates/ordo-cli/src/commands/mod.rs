//! Subcommand implementations.

pub mod admin;
pub mod articles;
pub mod audit;
