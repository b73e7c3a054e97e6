use crate::models::TokenPair;
use chrono::Utc;

/// Credentials for one connected fitness account, handed to every fetcher
/// call. Created when the OAuth callback succeeds, dropped at logout.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tokens: Option<TokenPair>,
}

impl Session {
    pub fn new(tokens: TokenPair) -> Self {
        Self {
            tokens: Some(tokens),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token_at(Utc::now().timestamp_millis())
    }

    /// The bearer token, unless absent, blank, or expired at `now_millis`.
    pub fn access_token_at(&self, now_millis: i64) -> Option<&str> {
        self.tokens
            .as_ref()
            .filter(|pair| !pair.is_expired_at(now_millis))
            .map(|pair| pair.access_token.as_str())
            .filter(|token| !token.is_empty())
    }
}
