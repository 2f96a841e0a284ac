//! Shared utilities for finai
//!
//! This crate provides common functionality used across the finai workspace:
//! tracing setup and small helpers for reading typed settings from the environment.

pub mod env;
pub mod logging;

pub use env::{EnvError, EnvLookup, ProcessEnv, parse_bool, parse_var};
pub use logging::{LogFormat, init_stderr_tracing, init_tracing, init_tracing_with};
