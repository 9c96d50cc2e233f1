//! `sui`: node-side preset management and controller-side fleet export.
//!
//! The binary is a thin clap front end over the modules here; everything is
//! reachable from tests without spawning the process.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod config;
pub mod directory;
pub mod docker;
pub mod logging;
