//! HTTP networking module
//!
//! Provides the HTTP client the backend adapters run their requests through.

mod client;

pub use client::HttpClient;
