//! Self-renewing authentication tokens.

use crate::client::{Request, execute, pair};
use crate::config::ClientConfig;
use crate::error::{ClientResult, Error};
use crate::protocol::TokenResponse;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

/// Remaining lifetime below which a token is regenerated.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// A token value and when it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    /// `None` for tokens that never expire.
    pub expires: Option<DateTime<Utc>>,
}

impl IssuedToken {
    pub fn new(value: impl Into<String>, expires: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires,
        }
    }

    /// True when less than the expiry margin remains.
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        self.expires
            .is_some_and(|expires| expires - now < Duration::seconds(EXPIRY_MARGIN_SECS))
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Produces fresh tokens.
#[async_trait]
pub trait TokenGenerator: Send + Sync {
    /// Stable key of the credentials behind the tokens. Part of the
    /// connection identity.
    fn key(&self) -> String;

    async fn generate(&self) -> ClientResult<IssuedToken>;
}

/// Observable state of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No value generated yet.
    Unpopulated,
    Valid,
    /// Within the expiry margin; the next read regenerates.
    Expiring,
    Regenerating,
}

/// An authentication token that renews itself when close to expiry.
///
/// A token built from a literal never expires. A token backed by a
/// [`TokenGenerator`] generates its first value on first read and a new one
/// whenever less than [`EXPIRY_MARGIN_SECS`] remain. Concurrent readers wait
/// for a regeneration in progress instead of starting their own.
pub struct Token {
    key: String,
    generator: Option<Arc<dyn TokenGenerator>>,
    current: Mutex<Option<IssuedToken>>,
    regenerating: AtomicBool,
    generated: broadcast::Sender<IssuedToken>,
}

/// Holds the regenerating flag up until dropped, including when the
/// generating future is cancelled.
struct RegeneratingFlag<'a>(&'a AtomicBool);

impl<'a> RegeneratingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RegeneratingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Token {
    /// A fixed token that never expires.
    pub fn from_literal(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            key: value.clone(),
            generator: None,
            current: Mutex::new(Some(IssuedToken::new(value, None))),
            regenerating: AtomicBool::new(false),
            generated: broadcast::channel(16).0,
        }
    }

    /// A token produced and renewed by `generator`.
    pub fn with_generator(generator: Arc<dyn TokenGenerator>) -> Self {
        Self {
            key: generator.key(),
            generator: Some(generator),
            current: Mutex::new(None),
            regenerating: AtomicBool::new(false),
            generated: broadcast::channel(16).0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Notifies every token generated from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<IssuedToken> {
        self.generated.subscribe()
    }

    pub async fn state(&self) -> TokenState {
        if self.regenerating.load(Ordering::Acquire) {
            return TokenState::Regenerating;
        }
        match self.current.lock().await.as_ref() {
            None => TokenState::Unpopulated,
            Some(token) if self.generator.is_some() && token.is_expiring(Utc::now()) => {
                TokenState::Expiring
            }
            Some(_) => TokenState::Valid,
        }
    }

    /// Returns the current value, regenerating it first when needed.
    pub async fn value(&self) -> ClientResult<String> {
        let mut current = self.current.lock().await;

        let Some(generator) = &self.generator else {
            return current
                .as_ref()
                .map(|token| token.value.clone())
                .ok_or_else(|| Error::Token("token has no value".to_string()));
        };

        if let Some(token) = current.as_ref().filter(|t| !t.is_expiring(Utc::now())) {
            return Ok(token.value.clone());
        }

        debug!(key = %self.key, "regenerating token");
        let result = {
            let _regenerating = RegeneratingFlag::raise(&self.regenerating);
            generator.generate().await
        };

        let token = result?;
        info!(key = %self.key, expires = ?token.expires, "token generated");
        let value = token.value.clone();
        *current = Some(token.clone());
        let _ = self.generated.send(token);
        Ok(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("self_renewing", &self.generator.is_some())
            .finish_non_exhaustive()
    }
}

/// How the token endpoint binds issued tokens to their users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClient {
    /// Bound to the requesting IP address.
    RequestIp,
    /// Bound to an HTTP referer.
    Referer(String),
}

/// Generates tokens from a username and password.
pub struct CredentialsTokenGenerator {
    http: Client,
    token_url: String,
    username: String,
    password: String,
    client: TokenClient,
    expiration_minutes: u32,
}

impl CredentialsTokenGenerator {
    pub fn new(
        token_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ClientResult<Self> {
        Ok(Self {
            http: ClientConfig::default().http_client()?,
            token_url: token_url.into(),
            username: username.into(),
            password: password.into(),
            client: TokenClient::RequestIp,
            expiration_minutes: 60,
        })
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.client = TokenClient::Referer(referer.into());
        self
    }

    /// Requested token lifetime.
    pub fn with_expiration_minutes(mut self, minutes: u32) -> Self {
        self.expiration_minutes = minutes;
        self
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }
}

impl fmt::Debug for CredentialsTokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsTokenGenerator")
            .field("token_url", &self.token_url)
            .field("username", &self.username)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenGenerator for CredentialsTokenGenerator {
    fn key(&self) -> String {
        format!("{}@{}", self.username, self.token_url)
    }

    async fn generate(&self) -> ClientResult<IssuedToken> {
        let mut params = vec![pair("username", &self.username), pair("password", &self.password)];
        match &self.client {
            TokenClient::RequestIp => params.push(pair("client", "requestip")),
            TokenClient::Referer(referer) => {
                params.push(pair("client", "referer"));
                params.push(pair("referer", referer));
            }
        }
        params.push(pair("expiration", self.expiration_minutes));
        params.push(pair("f", "json"));

        let request = Request {
            url: self.token_url.clone(),
            params,
            post: true,
        };
        let response: TokenResponse = execute(&self.http, request).await?.decode()?;

        let expires = match response.expires {
            Some(millis) => Some(DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                Error::Token(format!("token expiry {millis} is out of range"))
            })?),
            None => None,
        };
        Ok(IssuedToken::new(response.token, expires))
    }
}
