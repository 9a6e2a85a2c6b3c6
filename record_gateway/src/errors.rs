use shared_utils::env::EnvError;
use snafu::{Backtrace, Snafu};

/// Errors that can occur while building an [`HttpRecordSystem`](crate::HttpRecordSystem).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GatewayInitError {
    /// The bearer token variable is unset or empty.
    #[snafu(display("Missing API token: {source}"))]
    MissingToken {
        source: EnvError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Token contains characters not allowed in a header.
    #[snafu(display("Invalid API token format: {source}"))]
    InvalidToken {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// Base URL is not an absolute http(s) URL.
    #[snafu(display("Invalid base URL {url:?}: {message}"))]
    InvalidBaseUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },
}
