//! Wire types for the Mail.tm-compatible JSON API.
//!
//! Only the fields this client reads are modeled; providers return
//! considerably more per message and the rest is ignored on decode.

use serde::Deserialize;

/// One inbox entry as returned by the message listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Server-assigned message id, usable with [`Client::fetch_message`].
    ///
    /// [`Client::fetch_message`]: crate::Client::fetch_message
    pub id: String,
    /// Subject line, when the provider reports one.
    #[serde(default)]
    pub subject: Option<String>,
    /// Short plain-text preview of the body.
    #[serde(default)]
    pub intro: Option<String>,
}

/// A full inbox listing: the messages plus the server-side total.
///
/// Fetched fresh on every call; the client never diffs or caches inbox
/// state between polls.
#[derive(Debug, Clone, Deserialize)]
pub struct Inbox {
    #[serde(rename = "hydra:member", default)]
    pub messages: Vec<Message>,
    #[serde(rename = "hydra:totalItems", default)]
    pub total: usize,
}

/// A single message fetched by id.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDetail {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub intro: Option<String>,
    /// Plain-text body, when present.
    #[serde(default)]
    pub text: Option<String>,
    /// HTML body parts, when present.
    #[serde(default)]
    pub html: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainList {
    #[serde(rename = "hydra:member", default)]
    pub(crate) domains: Vec<DomainEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainEntry {
    pub(crate) domain: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub(crate) address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) token: Option<String>,
}
