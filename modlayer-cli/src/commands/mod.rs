//! CLI subcommands.

pub mod cache;
pub mod catalog;
pub mod common;
pub mod config;
pub mod load;
pub mod resolve;
