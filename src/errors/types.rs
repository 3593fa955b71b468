//! Error type definitions for the IPTV aggregator
//!
//! This module defines all error types used throughout the application.
//! The taxonomy mirrors the pipeline stages: fetching a source, parsing
//! its playlist text, and probing individual streams each have their own
//! error type, and none of them is fatal to the overall request.

use thiserror::Error;

/// Top-level application error type
///
/// This is the only error callers of the pipeline ever see. Per-source
/// and per-entry failures are recovered locally inside the pipeline and
/// recorded in the per-source reports instead of being raised here.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (e.g. no sources configured at all)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The optional overall wall-clock budget for a request expired
    #[error("Request budget exceeded after {budget_secs}s")]
    BudgetExceeded { budget_secs: u64 },
}

impl AppError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Failure to retrieve one playlist source
///
/// A fetch failure skips the source; processing of other sources continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceFetchError {
    /// The fetch did not complete within the configured timeout
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// The source answered with a non-success HTTP status
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Connection, DNS or transfer failure
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

/// Malformed playlist text
///
/// A format error rejects the whole source; no partial recovery is
/// attempted. Recoverable oddities (dangling info lines, duplicate
/// headers) are handled inside the parser and never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The first non-empty line is not the `#EXTM3U` header sentinel
    /// (this also covers completely empty input)
    #[error("Missing #EXTM3U header sentinel")]
    MissingHeader,

    /// The text carries the header but contains no `#EXTINF` markers
    #[error("No #EXTINF entry markers found")]
    NoEntries,
}

/// Why a liveness probe classified a stream as dead
///
/// Probes never escalate to a pipeline-level failure; the failure kind is
/// kept so diagnostics and tests can distinguish causes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The probe did not complete within the per-probe timeout
    #[error("Probe timeout")]
    Timeout,

    /// Connection, DNS or transfer failure
    #[error("Network error: {message}")]
    Network { message: String },

    /// The stream answered with a non-success HTTP status
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// Fewer body bytes than required arrived within the grace window
    #[error("Short body: read {read} of {required} bytes")]
    ShortBody { read: usize, required: usize },

    /// Sampling mode probed a subset and none of the sampled streams
    /// was alive, so the unsampled remainder is rejected wholesale
    #[error("No sampled stream was alive")]
    SampleRejected,
}

impl ProbeFailure {
    /// Create a network failure from any displayable error
    pub fn network<M: ToString>(message: M) -> Self {
        Self::Network {
            message: message.to_string(),
        }
    }
}
