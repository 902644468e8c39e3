//! Microsoft identity platform client.
//!
//! Interactive sign-in uses the device code flow, the only interactive flow a
//! terminal can drive. Silent acquisition serves cached access tokens and
//! redeems refresh tokens. Plain HTTP against the v2 endpoints, no SDK.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use launcher_logging::{launcher_debug, launcher_info, launcher_warn};
use serde::{Deserialize, Serialize};

use crate::identity::{
    AccountInfo, AuthError, AuthErrorKind, AuthenticationResult, IdentityProvider,
    InteractionPrompt, InteractionSink,
};
use crate::persist::{read_if_exists, AtomicFileWriter};
use crate::types::u64_from_string_or_number;

/// Requested on top of the application scopes so the platform returns an id
/// token (for the username) and a refresh token.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

const CACHE_FILENAME: &str = "token_cache.json";
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Cached tokens this close to expiry are refreshed instead of served.
const EXPIRY_SKEW: Duration = Duration::from_secs(300);
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bounds for server-supplied lifetimes.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
const MAX_DEVICE_CODE_LIFETIME: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// Tenant authority, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    pub client_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Overrides the polling interval the platform asks for.
    pub poll_interval: Option<Duration>,
    /// Where the account cache is persisted. `None` keeps it in memory.
    pub cache_dir: Option<PathBuf>,
}

impl AzureSettings {
    pub fn new(authority: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            client_id: client_id.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: None,
            cache_dir: None,
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/oauth2/v2.0/{name}",
            self.authority.trim_end_matches('/')
        )
    }
}

fn default_interval() -> u64 {
    5
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_url")]
    verification_uri: String,
    #[serde(deserialize_with = "u64_from_string_or_number")]
    expires_in: u64,
    #[serde(
        default = "default_interval",
        deserialize_with = "u64_from_string_or_number"
    )]
    interval: u64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(
        default = "default_expires_in",
        deserialize_with = "u64_from_string_or_number"
    )]
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    preferred_username: Option<String>,
    upn: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedAccount {
    username: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Unix seconds.
    expires_at: u64,
    #[serde(default)]
    scopes: Vec<String>,
}

impl CachedAccount {
    /// A timestamp past what `SystemTime` can hold reads as already expired.
    fn expires_on(&self) -> SystemTime {
        UNIX_EPOCH
            .checked_add(Duration::from_secs(self.expires_at))
            .unwrap_or(UNIX_EPOCH)
    }

    fn is_fresh(&self, scopes: &[String], now: SystemTime) -> bool {
        let covers = scopes.iter().all(|wanted| {
            self.scopes
                .iter()
                .any(|granted| granted.eq_ignore_ascii_case(wanted))
        });
        covers
            && now
                .checked_add(EXPIRY_SKEW)
                .is_some_and(|cutoff| cutoff < self.expires_on())
    }

    fn to_result(&self) -> AuthenticationResult {
        AuthenticationResult {
            access_token: self.access_token.clone(),
            account: Some(AccountInfo {
                username: self.username.clone(),
            }),
            expires_on: Some(self.expires_on()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountCache {
    accounts: Vec<CachedAccount>,
}

impl AccountCache {
    fn find(&self, username: &str) -> Option<&CachedAccount> {
        self.accounts
            .iter()
            .find(|account| account.username.eq_ignore_ascii_case(username))
    }

    fn upsert(&mut self, account: CachedAccount) {
        self.accounts
            .retain(|existing| !existing.username.eq_ignore_ascii_case(&account.username));
        self.accounts.push(account);
    }

    /// Forgets one account, or every account when `username` is `None`.
    fn remove(&mut self, username: Option<&str>) {
        match username {
            Some(username) => self
                .accounts
                .retain(|account| !account.username.eq_ignore_ascii_case(username)),
            None => self.accounts.clear(),
        }
    }
}

pub struct AzureIdentityProvider {
    settings: AzureSettings,
    client: reqwest::Client,
    cache: Mutex<AccountCache>,
}

impl AzureIdentityProvider {
    pub fn new(settings: AzureSettings) -> Result<Self, AuthError> {
        if settings.client_id.trim().is_empty() {
            return Err(AuthError::new(
                AuthErrorKind::Configuration,
                "client id is empty",
            ));
        }
        url::Url::parse(&settings.authority).map_err(|err| {
            AuthError::new(
                AuthErrorKind::Configuration,
                format!("invalid authority {}: {err}", settings.authority),
            )
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| AuthError::new(AuthErrorKind::Configuration, err.to_string()))?;
        let cache = settings
            .cache_dir
            .as_deref()
            .map(load_cache)
            .unwrap_or_default();

        Ok(Self {
            settings,
            client,
            cache: Mutex::new(cache),
        })
    }

    /// Usernames with a cached token, in sign-in order.
    pub fn cached_accounts(&self) -> Vec<String> {
        self.lock_cache()
            .accounts
            .iter()
            .map(|account| account.username.clone())
            .collect()
    }

    fn lock_cache(&self) -> MutexGuard<'_, AccountCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cached(&self, username: &str) -> Option<CachedAccount> {
        self.lock_cache().find(username).cloned()
    }

    fn scope_string(scopes: &[String]) -> String {
        let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
        for extra in DEFAULT_SCOPES {
            if !all.iter().any(|scope| scope.eq_ignore_ascii_case(extra)) {
                all.push(extra);
            }
        }
        all.join(" ")
    }

    async fn redeem(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(self.settings.endpoint("token"))
            .form(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return response.json::<TokenResponse>().await.map_err(|err| {
                AuthError::new(
                    AuthErrorKind::Server {
                        code: "invalid_response".to_string(),
                    },
                    err.to_string(),
                )
            });
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        Err(error_from_body(status.as_u16(), &body))
    }

    async fn request_device_code(&self, scope: &str) -> Result<DeviceCodeResponse, AuthError> {
        let params = [
            ("client_id", self.settings.client_id.as_str()),
            ("scope", scope),
        ];
        launcher_info!("Starting device code flow with scope: {}", scope);

        let response = self
            .client
            .post(self.settings.endpoint("devicecode"))
            .form(&params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(map_reqwest_error)?;
            return Err(error_from_body(status.as_u16(), &body));
        }
        response.json::<DeviceCodeResponse>().await.map_err(|err| {
            AuthError::new(
                AuthErrorKind::Server {
                    code: "invalid_response".to_string(),
                },
                err.to_string(),
            )
        })
    }

    async fn poll_device_code(&self, device: &DeviceCodeResponse) -> Result<TokenResponse, AuthError> {
        let mut interval = self
            .settings
            .poll_interval
            .unwrap_or_else(|| {
                Duration::from_secs(device.interval)
                    .clamp(MIN_POLL_INTERVAL, MAX_DEVICE_CODE_LIFETIME)
            });
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(device.expires_in).min(MAX_DEVICE_CODE_LIFETIME);
        let form = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("client_id", self.settings.client_id.as_str()),
            ("device_code", device.device_code.as_str()),
        ];

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= deadline {
                return Err(AuthError::new(
                    AuthErrorKind::Client,
                    "expired_token: sign-in was not completed in time",
                ));
            }
            match self.redeem(&form).await {
                Ok(token) => return Ok(token),
                Err(err) => match err.server_code() {
                    Some("authorization_pending") => {
                        launcher_debug!("Authorization pending, continuing to poll");
                    }
                    Some("slow_down") => {
                        interval = interval
                            .saturating_add(self.settings.poll_interval.unwrap_or(SLOW_DOWN_STEP));
                        launcher_warn!("Received slow_down, polling every {:?}", interval);
                    }
                    _ => return Err(err),
                },
            }
        }
    }

    /// Caches the grant under the id token's username (or `fallback_username`)
    /// and converts it into a result.
    fn remember(
        &self,
        token: TokenResponse,
        scopes: &[String],
        fallback_username: Option<&str>,
    ) -> AuthenticationResult {
        let username = token
            .id_token
            .as_deref()
            .and_then(username_from_id_token)
            .or_else(|| fallback_username.map(ToOwned::to_owned));
        let expires_on =
            SystemTime::now() + Duration::from_secs(token.expires_in).min(MAX_TOKEN_LIFETIME);

        if let Some(username) = &username {
            let mut cache = self.lock_cache();
            let refresh_token = token
                .refresh_token
                .clone()
                .or_else(|| cache.find(username).and_then(|a| a.refresh_token.clone()));
            cache.upsert(CachedAccount {
                username: username.clone(),
                access_token: token.access_token.clone(),
                refresh_token,
                expires_at: expires_on
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_secs())
                    .unwrap_or_default(),
                scopes: scopes.to_vec(),
            });
            self.save(&cache);
        } else {
            launcher_warn!("Token response carried no username; not caching it");
        }

        AuthenticationResult {
            access_token: token.access_token,
            account: username.map(|username| AccountInfo { username }),
            expires_on: Some(expires_on),
        }
    }

    fn save(&self, cache: &AccountCache) {
        let Some(dir) = &self.settings.cache_dir else {
            return;
        };
        let content = match serde_json::to_string_pretty(cache) {
            Ok(text) => text,
            Err(err) => {
                launcher_warn!("Failed to serialize token cache: {}", err);
                return;
            }
        };
        if let Err(err) = AtomicFileWriter::new(dir.clone()).write(CACHE_FILENAME, &content) {
            launcher_warn!("Failed to write token cache to {:?}: {}", dir, err);
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for AzureIdentityProvider {
    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: Option<&str>,
        force_refresh: bool,
    ) -> Result<AuthenticationResult, AuthError> {
        let Some(username) = account.filter(|name| !name.is_empty()) else {
            return Err(AuthError::new(
                AuthErrorKind::Client,
                "no_account: no account given for silent acquisition",
            ));
        };
        let Some(cached) = self.cached(username) else {
            return Err(AuthError::new(
                AuthErrorKind::Client,
                format!("no_account: {username} has not signed in on this device"),
            ));
        };

        if !force_refresh && cached.is_fresh(scopes, SystemTime::now()) {
            launcher_debug!("Serving cached access token for {}", username);
            return Ok(cached.to_result());
        }

        let Some(refresh_token) = cached.refresh_token.as_deref() else {
            return Err(AuthError::new(
                AuthErrorKind::InteractionRequired,
                "no refresh token cached",
            ));
        };
        let scope = Self::scope_string(scopes);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.settings.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];
        let token = self.redeem(&form).await?;
        Ok(self.remember(token, scopes, Some(&cached.username)))
    }

    async fn acquire_token_interactive(
        &self,
        scopes: &[String],
        login_hint: Option<&str>,
        sink: &dyn InteractionSink,
    ) -> Result<AuthenticationResult, AuthError> {
        let scope = Self::scope_string(scopes);
        let device = self.request_device_code(&scope).await?;

        let message = device.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}",
                device.verification_uri, device.user_code
            )
        });
        sink.prompt(&InteractionPrompt {
            user_code: device.user_code.clone(),
            verification_uri: device.verification_uri.clone(),
            message,
            expires_in: Duration::from_secs(device.expires_in),
            login_hint: login_hint.map(ToOwned::to_owned),
        });

        let token = self.poll_device_code(&device).await?;
        let result = self.remember(token, scopes, None);
        if let (Some(hint), Some(username)) = (login_hint, result.username()) {
            if !hint.eq_ignore_ascii_case(username) {
                launcher_info!("Signed in as {} instead of hinted {}", username, hint);
            }
        }
        Ok(result)
    }

    async fn logout(&self, account: Option<&str>) -> Result<(), AuthError> {
        let mut cache = self.lock_cache();
        cache.remove(account);
        self.save(&cache);
        Ok(())
    }
}

fn load_cache(dir: &Path) -> AccountCache {
    let path = dir.join(CACHE_FILENAME);
    match read_if_exists(&path) {
        Ok(Some(text)) => serde_json::from_str(&text).unwrap_or_else(|err| {
            launcher_warn!("Ignoring malformed token cache {:?}: {}", path, err);
            AccountCache::default()
        }),
        Ok(None) => AccountCache::default(),
        Err(err) => {
            launcher_warn!("Failed to read token cache {:?}: {}", path, err);
            AccountCache::default()
        }
    }
}

/// Reads the display username from an id token payload. The signature is not
/// checked: the value is only used as a label and a login hint.
fn username_from_id_token(raw: &str) -> Option<String> {
    let payload = raw.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    claims
        .preferred_username
        .or(claims.upn)
        .or(claims.email)
        .filter(|name| !name.is_empty())
}

fn error_from_body(status: u16, body: &str) -> AuthError {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(error) => map_token_error(error),
        Err(_) => AuthError::new(
            AuthErrorKind::Server {
                code: format!("http_{status}"),
            },
            body.to_string(),
        ),
    }
}

fn map_token_error(error: TokenErrorResponse) -> AuthError {
    let message = error
        .error_description
        .unwrap_or_else(|| error.error.clone());
    let kind = match error.error.as_str() {
        "invalid_grant" | "interaction_required" | "login_required" | "consent_required" => {
            AuthErrorKind::InteractionRequired
        }
        "authorization_declined" | "expired_token" | "bad_verification_code" | "access_denied" => {
            AuthErrorKind::Client
        }
        "invalid_client" | "unauthorized_client" => AuthErrorKind::Configuration,
        code => AuthErrorKind::Server {
            code: code.to_string(),
        },
    };
    AuthError::new(kind, message)
}

fn map_reqwest_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        return AuthError::new(AuthErrorKind::Network, format!("timeout: {err}"));
    }
    AuthError::new(AuthErrorKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_token(payload: &str) -> String {
        format!("eyJhbGciOiJub25lIn0.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn username_prefers_preferred_username() {
        let token = id_token(r#"{"preferred_username":"alice@contoso.com","email":"a@x"}"#);
        assert_eq!(
            username_from_id_token(&token).as_deref(),
            Some("alice@contoso.com")
        );
    }

    #[test]
    fn username_falls_back_to_upn_then_email() {
        assert_eq!(
            username_from_id_token(&id_token(r#"{"upn":"bob@contoso.com"}"#)).as_deref(),
            Some("bob@contoso.com")
        );
        assert_eq!(
            username_from_id_token(&id_token(r#"{"email":"carol@x"}"#)).as_deref(),
            Some("carol@x")
        );
        assert_eq!(username_from_id_token("not-a-jwt"), None);
    }

    #[test]
    fn scope_string_adds_platform_scopes_once() {
        let scopes = vec!["api://app/access".to_string(), "openid".to_string()];
        assert_eq!(
            AzureIdentityProvider::scope_string(&scopes),
            "api://app/access openid profile offline_access"
        );
    }

    #[test]
    fn token_errors_map_to_kinds() {
        let err = |code: &str| {
            map_token_error(TokenErrorResponse {
                error: code.to_string(),
                error_description: None,
            })
            .kind
        };
        assert_eq!(err("invalid_grant"), AuthErrorKind::InteractionRequired);
        assert_eq!(err("authorization_declined"), AuthErrorKind::Client);
        assert_eq!(err("invalid_client"), AuthErrorKind::Configuration);
        assert_eq!(
            err("temporarily_unavailable"),
            AuthErrorKind::Server {
                code: "temporarily_unavailable".to_string()
            }
        );
    }

    #[test]
    fn cached_token_near_expiry_is_not_fresh() {
        let now = SystemTime::now();
        let soon = now + Duration::from_secs(60);
        let account = CachedAccount {
            username: "alice".to_string(),
            access_token: "T".to_string(),
            refresh_token: None,
            expires_at: soon.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            scopes: vec!["api://app/access".to_string()],
        };
        assert!(!account.is_fresh(&["api://app/access".to_string()], now));
    }

    #[test]
    fn absurd_cached_expiry_reads_as_expired() {
        let account = CachedAccount {
            username: "alice".to_string(),
            access_token: "T".to_string(),
            refresh_token: Some("R".to_string()),
            expires_at: u64::MAX,
            scopes: vec!["api://app/access".to_string()],
        };
        assert_eq!(account.expires_on(), UNIX_EPOCH);
        assert!(!account.is_fresh(&["api://app/access".to_string()], SystemTime::now()));
    }

    #[test]
    fn cached_token_must_cover_requested_scopes() {
        let now = SystemTime::now();
        let later = now + Duration::from_secs(3600);
        let account = CachedAccount {
            username: "alice".to_string(),
            access_token: "T".to_string(),
            refresh_token: None,
            expires_at: later.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            scopes: vec!["api://app/access".to_string()],
        };
        assert!(account.is_fresh(&["API://app/access".to_string()], now));
        assert!(!account.is_fresh(&["api://other".to_string()], now));
    }
}
