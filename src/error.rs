//! Error types for the mailbox client.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by mailbox operations.
///
/// Transient failures (transport errors and 5xx responses) are retried
/// internally; what surfaces here is either a fatal protocol problem or
/// [`Error::RetriesExhausted`] after the backoff budget is spent. A poll
/// that times out without a match is not an error: the wait methods
/// return `false` / `None` for that case.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure: connect, timeout, DNS, or body decode.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The server answered with a status the operation does not accept.
    #[error("{label} failed with status {status}: {body}")]
    Status {
        /// Operation that produced the response.
        label: &'static str,
        /// HTTP status code of the response.
        status: StatusCode,
        /// Response body, best-effort; `<empty>` when unreadable or blank.
        body: String,
    },

    /// A transient failure persisted through every retry attempt.
    #[error("{label} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Operation that kept failing.
        label: &'static str,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The last failure observed.
        source: Box<Error>,
    },

    /// A success response did not carry a field the contract requires.
    #[error("{label} response is missing `{field}`")]
    MissingField {
        label: &'static str,
        field: &'static str,
    },

    /// A provider answered the domain listing with no entries.
    #[error("{base} returned an empty domain list")]
    NoDomains { base: String },

    /// Domain discovery failed against every configured provider.
    #[error("no usable mailbox domain across providers: {source}")]
    AllProvidersFailed { source: Box<Error> },

    /// The builder was given an empty provider list.
    #[error("at least one provider base URL is required")]
    NoProviders,

    /// No matching email arrived before the deadline and the client is
    /// configured to treat that as a failure.
    #[error("no matching email for {address} within {timeout:?}")]
    EmailNotReceived { address: String, timeout: Duration },
}

impl Error {
    /// Whether this failure is expected to resolve on retry.
    ///
    /// Transport errors and 5xx responses qualify; everything else is
    /// terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request(_) => true,
            Error::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}
