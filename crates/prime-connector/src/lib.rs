//! Cisco Prime Infrastructure connector.
//!
//! Provides an asynchronous client that authenticates with HTTP basic auth, polls job status,
//! and fetches device, inventory and client records as JSON. Calls the server rejects as too
//! busy (`503`/`403`) are retried with a randomized pause; every other failure is returned as a
//! [`prime_core::Error`].

#![deny(missing_docs)]

pub mod client;
pub mod endpoints;
pub mod models;

pub use client::{write_pretty, HttpVerb, PrimeClient, PrimeClientBuilder, TEST_ACCESS_POINT};
pub use endpoints::Endpoint;
pub use models::{JobResult, JobSummaryResponse, RunHistoryResponse};

/// Convenient result alias that reuses the shared Prime error type.
pub type Result<T> = prime_core::Result<T>;
