//! Bearer tokens for the Sheets API: a fixed access token, or one minted
//! from a service account with the OAuth JWT-bearer grant and cached until
//! shortly before it expires.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use arena_core::store::StoreError;

use crate::config::SheetsConfig;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion. Google caps it at an hour.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// A cached token is replaced once it is this close to expiring.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub(crate) struct ServiceAccount {
    email: String,
    token_url: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

pub(crate) enum TokenSource {
    Fixed(String),
    ServiceAccount(Box<ServiceAccount>),
}

fn unconfigured(reason: impl std::fmt::Display) -> StoreError {
    StoreError::Unconfigured(format!("google sheets credentials: {reason}"))
}

impl TokenSource {
    pub(crate) fn from_config(config: &SheetsConfig) -> Result<Self, StoreError> {
        if !config.has_service_account() {
            return Ok(Self::Fixed(config.access_token.trim().to_string()));
        }
        let pem = config.private_key_pem().map_err(unconfigured)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(unconfigured)?;
        Ok(Self::ServiceAccount(Box::new(ServiceAccount {
            email: config.service_account_email.trim().to_string(),
            token_url: config.token_url.trim().to_string(),
            key,
            cached: Mutex::new(None),
        })))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Fixed(_) => "access_token",
            Self::ServiceAccount(_) => "service_account",
        }
    }

    /// Token for the next request, minting a fresh one if needed.
    pub(crate) async fn bearer(&self, http: &reqwest::Client) -> Result<String, StoreError> {
        match self {
            Self::Fixed(token) => Ok(token.clone()),
            Self::ServiceAccount(account) => account.bearer(http).await,
        }
    }

    /// Drop any cached token so the next request mints again.
    pub(crate) async fn invalidate(&self) {
        if let Self::ServiceAccount(account) = self {
            account.cached.lock().await.take();
        }
    }
}

impl ServiceAccount {
    async fn bearer(&self, http: &reqwest::Client) -> Result<String, StoreError> {
        // Held across the exchange; at most one mint runs at a time
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }
        let fresh = self.mint(http).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn assertion(&self) -> Result<String, StoreError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Backend(format!("system clock: {e}")))?
            .as_secs();
        let claims = Claims {
            iss: &self.email,
            scope: SHEETS_SCOPE,
            aud: &self.token_url,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StoreError::Backend(format!("signing token assertion: {e}")))
    }

    async fn mint(&self, http: &reqwest::Client) -> Result<CachedToken, StoreError> {
        let assertion = self.assertion()?;
        let resp = http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("token exchange: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
            tracing::warn!(%status, email = %self.email, "service account token exchange failed");
            return Err(StoreError::Backend(format!(
                "token exchange: HTTP {status}: {excerpt}"
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("token exchange: {e}")))?;
        tracing::debug!(expires_in = token.expires_in, "minted sheets access token");
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}
