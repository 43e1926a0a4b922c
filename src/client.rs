//! Mailbox client implementation.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use tokio::time::Instant;

use crate::models::{AccountResponse, DomainList, TokenResponse};
use crate::retry::RetryPolicy;
use crate::{Error, Inbox, Message, MessageDetail, Result};

/// Async client for Mail.tm-compatible temporary email services.
///
/// The client provisions throwaway mailboxes, authenticates against them,
/// and polls their inboxes until an expected message arrives. Use
/// [`Client::new`] for defaults or [`Client::builder`] for custom settings
/// like provider base URLs, a fixed domain, or a proxy.
///
/// One client instance is meant to serve one test scenario, with calls
/// issued sequentially. Instances share nothing, so parallel scenarios
/// each construct their own.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    bases: Vec<String>,
    active: usize,
    domain: Option<String>,
    password: String,
    retry: RetryPolicy,
    missing_email_policy: MissingEmailPolicy,
    tokens: HashMap<String, String>,
}

impl Client {
    /// Create a builder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new client with default settings.
    ///
    /// Tries the known public providers in order (api.mail.gw, then
    /// api.mail.tm) when a mailbox domain has to be discovered.
    ///
    /// # Examples
    /// ```no_run
    /// # use tempmail_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), tempmail_client::Error> {
    /// let mut client = Client::new()?;
    /// let email = client.create_email("myalias", None).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// The provider base URL requests currently go to.
    ///
    /// Starts as the first configured base and moves forward when domain
    /// discovery fails over to a later provider. It is never reverted
    /// automatically.
    pub fn active_base(&self) -> &str {
        &self.bases[self.active]
    }

    /// Generate a unique mailbox local-part like `prefix_k3x9w1qa`.
    ///
    /// Handy for deriving one throwaway inbox per test run.
    pub fn random_alias(prefix: &str) -> String {
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("{prefix}_{}", suffix.to_lowercase())
    }

    /// Create a mailbox `alias@domain` and return its address.
    ///
    /// The domain is resolved in order of precedence: the `domain`
    /// argument, the builder's domain override, then [`Client::valid_domain`].
    /// The server-assigned address from the 201 response is the contract
    /// value, not the locally constructed one.
    ///
    /// # Examples
    /// ```no_run
    /// # use tempmail_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), tempmail_client::Error> {
    /// let mut client = Client::new()?;
    /// let email = client
    ///     .create_email(&Client::random_alias("signup"), None)
    ///     .await?;
    /// println!("{email}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_email(&mut self, alias: &str, domain: Option<&str>) -> Result<String> {
        let domain = match domain {
            Some(d) => d.to_string(),
            None => match &self.domain {
                Some(d) => d.clone(),
                None => self.valid_domain().await?,
            },
        };

        let address = format!("{alias}@{domain}");
        tracing::debug!("provisioning mailbox {address}");

        let payload = serde_json::json!({
            "address": address,
            "password": self.password,
        });
        let url = self.endpoint("accounts");
        let account: AccountResponse = self
            .retry
            .fetch_json(
                "create_email",
                |status| status == StatusCode::CREATED,
                || self.http.post(&url).json(&payload),
            )
            .await?;

        account.address.ok_or(Error::MissingField {
            label: "create_email",
            field: "address",
        })
    }

    /// Get a bearer token for a mailbox, authenticating on first use.
    ///
    /// Tokens are cached per address for the lifetime of the client and
    /// never invalidated; a token revoked server-side surfaces as a
    /// failed downstream request rather than a re-authentication.
    pub async fn get_token(&mut self, address: &str) -> Result<String> {
        if let Some(token) = self.tokens.get(address) {
            return Ok(token.clone());
        }

        let payload = serde_json::json!({
            "address": address,
            "password": self.password,
        });
        let url = self.endpoint("token");
        let auth: TokenResponse = self
            .retry
            .fetch_json(
                "get_token",
                |status| status == StatusCode::OK,
                || self.http.post(&url).json(&payload),
            )
            .await?;

        let token = auth.token.ok_or(Error::MissingField {
            label: "get_token",
            field: "token",
        })?;
        self.tokens.insert(address.to_string(), token.clone());
        Ok(token)
    }

    /// Fetch the full inbox for a mailbox.
    ///
    /// Every call is an independent fetch; nothing about inbox state is
    /// cached between calls.
    pub async fn get_messages(&mut self, address: &str) -> Result<Inbox> {
        let token = self.get_token(address).await?;
        let url = self.endpoint("messages");
        self.retry
            .fetch_json(
                "get_messages",
                |status| status == StatusCode::OK,
                || self.http.get(&url).bearer_auth(&token),
            )
            .await
    }

    /// Fetch a single message by id.
    pub async fn fetch_message(&mut self, address: &str, id: &str) -> Result<MessageDetail> {
        let token = self.get_token(address).await?;
        let url = self.endpoint(&format!("messages/{id}"));
        self.retry
            .fetch_json(
                "fetch_message",
                |status| status == StatusCode::OK,
                || self.http.get(&url).bearer_auth(&token),
            )
            .await
    }

    /// Subjects of all messages currently in the inbox.
    ///
    /// Messages without a subject contribute an empty string.
    pub async fn subjects(&mut self, address: &str) -> Result<Vec<String>> {
        let inbox = self.get_messages(address).await?;
        Ok(inbox
            .messages
            .into_iter()
            .map(|m| m.subject.unwrap_or_default())
            .collect())
    }

    /// Body previews of all messages currently in the inbox.
    pub async fn intros(&mut self, address: &str) -> Result<Vec<String>> {
        let inbox = self.get_messages(address).await?;
        Ok(inbox
            .messages
            .into_iter()
            .map(|m| m.intro.unwrap_or_default())
            .collect())
    }

    /// Ids of all messages currently in the inbox.
    pub async fn message_ids(&mut self, address: &str) -> Result<Vec<String>> {
        let inbox = self.get_messages(address).await?;
        Ok(inbox.messages.into_iter().map(|m| m.id).collect())
    }

    /// First body preview containing `needle`, case-insensitive.
    pub async fn find_intro_containing(
        &mut self,
        address: &str,
        needle: &str,
    ) -> Result<Option<String>> {
        let needle = needle.to_lowercase();
        let inbox = self.get_messages(address).await?;
        Ok(inbox
            .messages
            .into_iter()
            .filter_map(|m| m.intro)
            .find(|intro| intro.to_lowercase().contains(&needle)))
    }

    /// Resolve a mailbox domain to provision addresses under.
    ///
    /// A configured domain override short-circuits without any network
    /// call. Otherwise the providers are tried in order, each with the
    /// full retry budget; the first domain of the first provider that
    /// answers wins, and that provider stays active for subsequent
    /// requests. Providers are not revisited within one resolution.
    pub async fn valid_domain(&mut self) -> Result<String> {
        if let Some(domain) = &self.domain {
            return Ok(domain.clone());
        }

        let mut last: Option<Error> = None;
        for index in 0..self.bases.len() {
            self.active = index;
            let url = self.endpoint("domains");
            tracing::debug!("looking for a mailbox domain at {}", self.active_base());

            let outcome: Result<DomainList> = self
                .retry
                .fetch_json(
                    "valid_domain",
                    |status| status == StatusCode::OK,
                    || self.http.get(&url).header(ACCEPT, "application/ld+json"),
                )
                .await;

            match outcome {
                Ok(list) => match list.domains.into_iter().next() {
                    Some(entry) => return Ok(entry.domain),
                    None => {
                        last = Some(Error::NoDomains {
                            base: self.active_base().to_string(),
                        });
                    }
                },
                Err(err) => last = Some(err),
            }
        }

        match last {
            Some(source) => Err(Error::AllProvidersFailed {
                source: Box::new(source),
            }),
            None => Err(Error::NoProviders),
        }
    }

    /// Poll until the inbox holds at least `min_count` messages.
    ///
    /// Returns `Ok(true)` as soon as a poll observes enough messages and
    /// `Ok(false)` when the deadline passes first.
    ///
    /// # Examples
    /// ```no_run
    /// # use tempmail_client::{Client, PollOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), tempmail_client::Error> {
    /// let mut client = Client::new()?;
    /// let email = client.create_email("myalias", None).await?;
    /// if client.wait_for_emails(&email, 1, PollOptions::default()).await? {
    ///     println!("confirmation arrived");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait_for_emails(
        &mut self,
        address: &str,
        min_count: usize,
        opts: PollOptions,
    ) -> Result<bool> {
        let hit = self
            .poll(address, opts, |inbox| {
                (inbox.total >= min_count).then_some(())
            })
            .await?;
        Ok(hit.is_some())
    }

    /// Poll until a message subject matches `pattern`.
    ///
    /// Returns the first matching message, or `Ok(None)` on deadline.
    ///
    /// # Examples
    /// ```no_run
    /// # use tempmail_client::{Client, PollOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), tempmail_client::Error> {
    /// # let mut client = Client::new()?;
    /// # let email = client.create_email("myalias", None).await?;
    /// let pattern = regex::Regex::new("(?i)welcome|verify|confirm").unwrap();
    /// if let Some(msg) = client
    ///     .wait_for_subject(&email, &pattern, PollOptions::default())
    ///     .await?
    /// {
    ///     println!("got: {}", msg.subject.unwrap_or_default());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait_for_subject(
        &mut self,
        address: &str,
        pattern: &Regex,
        opts: PollOptions,
    ) -> Result<Option<Message>> {
        self.poll(address, opts, |inbox| {
            inbox
                .messages
                .iter()
                .find(|m| m.subject.as_deref().is_some_and(|s| pattern.is_match(s)))
                .cloned()
        })
        .await
    }

    /// Poll until a message preview contains `needle`, case-insensitive.
    ///
    /// Returns the first matching message, or `Ok(None)` on deadline.
    pub async fn wait_for_body_contains(
        &mut self,
        address: &str,
        needle: &str,
        opts: PollOptions,
    ) -> Result<Option<Message>> {
        let needle = needle.to_lowercase();
        self.poll(address, opts, |inbox| {
            inbox
                .messages
                .iter()
                .find(|m| {
                    m.intro
                        .as_deref()
                        .is_some_and(|intro| intro.to_lowercase().contains(&needle))
                })
                .cloned()
        })
        .await
    }

    /// Like [`Client::wait_for_emails`], applying the configured
    /// [`MissingEmailPolicy`] when the deadline passes.
    pub async fn expect_emails(
        &mut self,
        address: &str,
        min_count: usize,
        opts: PollOptions,
    ) -> Result<bool> {
        let got = self.wait_for_emails(address, min_count, opts).await?;
        if !got {
            self.missed(address, opts)?;
        }
        Ok(got)
    }

    /// Like [`Client::wait_for_subject`], applying the configured
    /// [`MissingEmailPolicy`] when the deadline passes.
    pub async fn expect_subject(
        &mut self,
        address: &str,
        pattern: &Regex,
        opts: PollOptions,
    ) -> Result<Option<Message>> {
        let hit = self.wait_for_subject(address, pattern, opts).await?;
        if hit.is_none() {
            self.missed(address, opts)?;
        }
        Ok(hit)
    }

    /// Like [`Client::wait_for_body_contains`], applying the configured
    /// [`MissingEmailPolicy`] when the deadline passes.
    pub async fn expect_body_contains(
        &mut self,
        address: &str,
        needle: &str,
        opts: PollOptions,
    ) -> Result<Option<Message>> {
        let hit = self.wait_for_body_contains(address, needle, opts).await?;
        if hit.is_none() {
            self.missed(address, opts)?;
        }
        Ok(hit)
    }

    /// Shared poll loop: fetch, probe, sleep, until a hit or the deadline.
    ///
    /// The deadline is checked before each iteration, so a zero timeout
    /// performs no fetch at all.
    async fn poll<T>(
        &mut self,
        address: &str,
        opts: PollOptions,
        probe: impl Fn(&Inbox) -> Option<T>,
    ) -> Result<Option<T>> {
        let deadline = Instant::now() + opts.timeout;
        while Instant::now() < deadline {
            let inbox = self.get_messages(address).await?;
            if let Some(hit) = probe(&inbox) {
                return Ok(Some(hit));
            }
            tracing::trace!(
                "no matching email for {address} yet ({} in inbox)",
                inbox.total
            );
            tokio::time::sleep(opts.interval).await;
        }
        Ok(None)
    }

    fn missed(&self, address: &str, opts: PollOptions) -> Result<()> {
        match self.missing_email_policy {
            MissingEmailPolicy::Fail => Err(Error::EmailNotReceived {
                address: address.to_string(),
                timeout: opts.timeout,
            }),
            MissingEmailPolicy::Warn => {
                tracing::warn!("no matching email for {address} within {:?}", opts.timeout);
                Ok(())
            }
        }
    }

    /// Endpoint URL relative to the active provider base.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.active_base().trim_end_matches('/'), path)
    }
}

const DEFAULT_BASES: [&str; 2] = ["https://api.mail.gw", "https://api.mail.tm"];
const DEFAULT_PASSWORD: &str = "tempmail-client-static-pw";
const DEFAULT_USER_AGENT: &str = concat!("tempmail-client/", env!("CARGO_PKG_VERSION"));

/// How the `expect_*` methods treat a poll that times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingEmailPolicy {
    /// Log a warning and hand the miss back as `false` / `None`.
    #[default]
    Warn,
    /// Escalate the miss as [`Error::EmailNotReceived`].
    Fail,
}

/// Timeout and poll interval for the wait methods.
///
/// Defaults to a 120 second deadline polled every 3 seconds.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Total time budget for the wait.
    pub timeout: Duration,
    /// Sleep between poll iterations.
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(3),
        }
    }
}

impl PollOptions {
    /// Override the total time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the sleep between poll iterations.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Builder for configuring a mailbox client.
///
/// Start with [`Client::builder`] to override defaults.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    bases: Vec<String>,
    domain: Option<String>,
    password: String,
    proxy: Option<String>,
    danger_accept_invalid_certs: bool,
    user_agent: String,
    retry_base_delay: Duration,
    missing_email_policy: MissingEmailPolicy,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - Provider bases api.mail.gw then api.mail.tm, tried in order
    /// - No domain override (discovered via the `domains` endpoint)
    /// - Fixed client-internal account password
    /// - No proxy, strict TLS validation
    /// - 300ms retry backoff base
    /// - [`MissingEmailPolicy::Warn`]
    pub fn new() -> Self {
        Self {
            bases: DEFAULT_BASES.iter().map(|s| s.to_string()).collect(),
            domain: None,
            password: DEFAULT_PASSWORD.to_string(),
            proxy: None,
            danger_accept_invalid_certs: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_base_delay: crate::retry::BASE_DELAY,
            missing_email_policy: MissingEmailPolicy::default(),
        }
    }

    /// Create a builder seeded from the process environment.
    ///
    /// Reads `EMAIL_BASE_URL` (replaces the provider list with a single
    /// base), `EMAIL_DOMAIN` (domain override, skips discovery), and
    /// `REQUIRE_EMAIL=1` (treat a missing expected email as a failure
    /// instead of a warning). The environment is read once, here.
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(base) = std::env::var("EMAIL_BASE_URL") {
            if !base.is_empty() {
                builder.bases = vec![base];
            }
        }
        if let Ok(domain) = std::env::var("EMAIL_DOMAIN") {
            if !domain.is_empty() {
                builder.domain = Some(domain);
            }
        }
        if std::env::var("REQUIRE_EMAIL").is_ok_and(|v| v == "1") {
            builder.missing_email_policy = MissingEmailPolicy::Fail;
        }
        builder
    }

    /// Replace the provider base URLs, tried in the given order.
    pub fn base_urls<I, S>(mut self, bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bases = bases.into_iter().map(Into::into).collect();
        self
    }

    /// Force a mailbox domain, skipping the `domains` call entirely.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Override the account password used for provisioning and login.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set a proxy URL (e.g., "http://127.0.0.1:8080").
    ///
    /// This uses reqwest's proxy support for all requests.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Accept invalid TLS certificates (default: false).
    ///
    /// Needed behind intercepting corporate proxies.
    pub fn danger_accept_invalid_certs(mut self, value: bool) -> Self {
        self.danger_accept_invalid_certs = value;
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the exponential backoff base delay (default 300ms).
    ///
    /// Useful for testing against a local mock server.
    pub fn retry_base_delay(mut self, base_delay: Duration) -> Self {
        self.retry_base_delay = base_delay;
        self
    }

    /// Choose how the `expect_*` methods treat a missing email.
    pub fn missing_email_policy(mut self, policy: MissingEmailPolicy) -> Self {
        self.missing_email_policy = policy;
        self
    }

    /// Build the client.
    ///
    /// No network calls happen here; domain discovery and authentication
    /// are lazy. Fails if the provider list is empty or the HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<Client> {
        if self.bases.is_empty() {
            return Err(Error::NoProviders);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent)
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs);

        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Client {
            http: builder.build()?,
            bases: self.bases,
            active: 0,
            domain: self.domain,
            password: self.password,
            retry: RetryPolicy::with_base_delay(self.retry_base_delay),
            missing_email_policy: self.missing_email_policy,
            tokens: HashMap::new(),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let client = Client::new().unwrap();
        assert_eq!(client.active_base(), "https://api.mail.gw");
        assert!(client.domain.is_none());
        assert!(client.tokens.is_empty());
        assert_eq!(client.missing_email_policy, MissingEmailPolicy::Warn);
    }

    #[test]
    fn empty_provider_list_is_rejected() {
        let result = Client::builder().base_urls(Vec::<String>::new()).build();
        assert!(matches!(result, Err(Error::NoProviders)));
    }

    #[test]
    fn endpoint_joins_with_and_without_trailing_slash() {
        let client = Client::builder()
            .base_urls(["https://api.mail.gw/"])
            .build()
            .unwrap();
        assert_eq!(client.endpoint("messages"), "https://api.mail.gw/messages");

        let client = Client::builder()
            .base_urls(["https://api.mail.gw"])
            .build()
            .unwrap();
        assert_eq!(client.endpoint("domains"), "https://api.mail.gw/domains");
    }

    #[test]
    fn random_alias_shape() {
        let alias = Client::random_alias("signup");
        let (prefix, suffix) = alias.split_once('_').unwrap();
        assert_eq!(prefix, "signup");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(suffix, suffix.to_lowercase());
        assert_ne!(Client::random_alias("signup"), alias);
    }

    #[test]
    fn poll_options_defaults() {
        let opts = PollOptions::default();
        assert_eq!(opts.timeout, Duration::from_secs(120));
        assert_eq!(opts.interval, Duration::from_secs(3));

        let opts = PollOptions::default()
            .timeout(Duration::from_secs(240))
            .interval(Duration::from_millis(500));
        assert_eq!(opts.timeout, Duration::from_secs(240));
        assert_eq!(opts.interval, Duration::from_millis(500));
    }
}
