//! HTTP client module shared by registry lookups.

mod client;

pub use client::{DEFAULT_TIMEOUT, HttpClient, USER_AGENT};
