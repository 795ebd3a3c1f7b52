//! # Pulse Core
//!
//! Core types and error definitions shared by every Pulse crate.
//! This crate provides the unified error type, result aliases and
//! logging initialization.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
