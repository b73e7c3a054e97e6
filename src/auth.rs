use crate::config::OAuthConfig;
use crate::errors::FitError;
use crate::models::TokenPair;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

/// Read scopes requested for the dashboard.
pub const FIT_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/fitness.activity.read",
    "https://www.googleapis.com/auth/fitness.body.read",
    "https://www.googleapis.com/auth/fitness.sleep.read",
    "https://www.googleapis.com/auth/fitness.heart_rate.read",
];

/// OAuth client for linking the fitness-data account.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, http: Client) -> Self {
        Self { config, http }
    }

    /// Consent URL with a fresh random `state`, so a cached consent screen is
    /// never reused.
    pub fn build_authorization_url(&self) -> Result<String, FitError> {
        if self.config.client_id.trim().is_empty() {
            return Err(FitError::InvalidConfig("OAuth client id is not set".to_string()));
        }
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|err| FitError::InvalidConfig(format!("invalid auth URL: {err}")))?;

        let state = Uuid::new_v4().to_string();
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("scope", &FIT_SCOPES.join(" "))
            .append_pair("prompt", "consent")
            .append_pair("include_granted_scopes", "false")
            .append_pair("state", &state)
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri);

        Ok(url.to_string())
    }

    /// Trades an authorization code for a token pair. The redirect URI must
    /// match the one registered with the provider exactly.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair, FitError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(FitError::AuthCodeMissing);
        }

        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|err| token_exchange_failed(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| token_exchange_failed(err.to_string()))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.error_description.or(parsed.error))
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            return Err(token_exchange_failed(reason));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| token_exchange_failed(format!("invalid token response: {err}")))?;

        info!(has_refresh_token = parsed.refresh_token.is_some(), "token exchange succeeded");
        Ok(token_pair_from(parsed, Utc::now().timestamp_millis()))
    }
}

fn token_exchange_failed(reason: String) -> FitError {
    error!("token exchange failed: {reason}");
    FitError::TokenExchange(reason)
}

fn token_pair_from(response: TokenResponse, now_millis: i64) -> TokenPair {
    TokenPair {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expiry_date: response
            .expires_in
            .map(|seconds| now_millis.saturating_add(seconds.saturating_mul(1_000))),
        scope: response.scope,
        token_type: response.token_type,
    }
}
