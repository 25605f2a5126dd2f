//! # prime-core
//!
//! Core types and utilities for working with Cisco Prime Infrastructure.
//!
//! This crate provides error handling, connection configuration, and the retry policy shared by
//! Prime Infrastructure clients.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`config`] - Connection configuration with validation
//! - [`client`] - HTTP client settings, retry policy, and response classification

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;

pub use client::{
    classify_status, Backoff, ClientConfig, FatalKind, JitterBackoff, Outcome, RetryPolicy,
};
pub use config::{ApiVersion, PrimeConfig};
pub use error::{Error, Result};
