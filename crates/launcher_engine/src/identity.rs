use std::fmt;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub username: String,
}

/// What a successful acquisition hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub account: Option<AccountInfo>,
    pub expires_on: Option<SystemTime>,
}

impl AuthenticationResult {
    pub fn username(&self) -> Option<&str> {
        self.account.as_ref().map(|account| account.username.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Silent acquisition needs the user (expired or revoked refresh token,
    /// consent or MFA required).
    InteractionRequired,
    /// The local client could not complete the flow: no cached account, the
    /// user declined, or the device code expired.
    Client,
    /// The identity platform rejected the request with this error code.
    Server { code: String },
    Network,
    Configuration,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorKind::InteractionRequired => write!(f, "interaction required"),
            AuthErrorKind::Client => write!(f, "client error"),
            AuthErrorKind::Server { code } => write!(f, "server error {code}"),
            AuthErrorKind::Network => write!(f, "network error"),
            AuthErrorKind::Configuration => write!(f, "configuration error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn server_code(&self) -> Option<&str> {
        match &self.kind {
            AuthErrorKind::Server { code } => Some(code),
            _ => None,
        }
    }
}

/// Instructions the user must follow to finish an interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionPrompt {
    pub user_code: String,
    pub verification_uri: String,
    pub message: String,
    pub expires_in: Duration,
    pub login_hint: Option<String>,
}

pub trait InteractionSink: Send + Sync {
    fn prompt(&self, prompt: &InteractionPrompt);
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Acquire a token without user interaction, from cache or by refresh.
    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: Option<&str>,
        force_refresh: bool,
    ) -> Result<AuthenticationResult, AuthError>;

    /// Acquire a token with the user in the loop.
    async fn acquire_token_interactive(
        &self,
        scopes: &[String],
        login_hint: Option<&str>,
        sink: &dyn InteractionSink,
    ) -> Result<AuthenticationResult, AuthError>;

    async fn login(
        &self,
        scopes: &[String],
        sink: &dyn InteractionSink,
    ) -> Result<AuthenticationResult, AuthError> {
        self.acquire_token_interactive(scopes, None, sink).await
    }

    async fn logout(&self, account: Option<&str>) -> Result<(), AuthError>;
}
