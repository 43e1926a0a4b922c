//! # Tempmail Client
//! Asynchronous client for Mail.tm-compatible disposable email APIs (api.mail.gw, api.mail.tm), providing simple methods to provision throwaway inboxes and poll them for expected messages from Rust using [`Client`] and [`ClientBuilder`].
//!
//! ## Audience and uses
//! For Rust developers verifying account-confirmation emails in end-to-end tests, demos, or automation scripts without running mail infrastructure: configure with [`ClientBuilder`], provision an address, then wait for a message by count, subject pattern, or body content ([`Message`]). Transient provider failures are retried with exponential backoff, and domain discovery fails over across providers automatically.
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest`, so ensure the chosen Tokio features (`rt-multi-thread` or `current_thread`) are available in your application.
//!
//! ## Out of scope
//! Not a general-purpose mail client, SMTP sender, or durable mailbox. It only proxies Mail.tm-compatible services and inherits their availability, rate limits, and account retention.
//!
//! ## Errors
//! Transport failures and 5xx statuses are retried internally and surface as [`Error::RetriesExhausted`] once the backoff budget is spent; unexpected statuses and malformed success bodies fail fast as [`Error::Status`] and [`Error::MissingField`]. A wait that times out is not an error: it returns `false` or `None`, and the `expect_*` variants escalate it only under [`MissingEmailPolicy::Fail`]. The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use tempmail_client::{Client, PollOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tempmail_client::Error> {
//!     let mut client = Client::new()?;
//!     let email = client
//!         .create_email(&Client::random_alias("signup"), None)
//!         .await?;
//!     println!("Created: {}", email);
//!
//!     if client.wait_for_emails(&email, 1, PollOptions::default()).await? {
//!         for subject in client.subjects(&email).await? {
//!             println!("Subject: {}", subject);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod models;
mod retry;

pub use client::{Client, ClientBuilder, MissingEmailPolicy, PollOptions};
pub use error::Error;
pub use models::{Inbox, Message, MessageDetail};

/// Result type alias for mailbox operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
