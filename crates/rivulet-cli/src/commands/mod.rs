//! CLI command implementations.

pub mod common;
pub mod config;
pub mod info;
pub mod run;
