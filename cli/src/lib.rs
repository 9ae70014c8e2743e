//! ibkr-readonly-cli: terminal reports over the read-only gateway client.
//!
//! Loads an optional TOML config, merges it with the environment and
//! command-line flags, checks the gateway session, then renders account,
//! portfolio and market-data reports. Nothing here can trade.

pub mod commands;
pub mod config;
pub mod error;
pub mod report;
