//! Utility modules shared by message sources.
//!
//! - [`HttpClient`]: reqwest client with timeouts and bearer authentication

mod http;

pub use http::HttpClient;
