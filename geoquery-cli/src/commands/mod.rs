//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`ranges`] - Print the geohash ranges covering a circle
//! - [`watch`] - Replay a fixture scenario against a live query

pub mod common;
pub mod ranges;
pub mod watch;
