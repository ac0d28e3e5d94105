//! IPNI advertisement CLI library components.
//!
//! Exposes the command handlers and fixture configuration for testing.

pub mod commands;
pub mod config;
