use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "data/state.json";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/googlefit/callback";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_FIT_API_BASE: &str = "https://www.googleapis.com/fitness/v1";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EDAMAM_API_BASE: &str = "https://api.edamam.com";
pub const DEFAULT_NEWS_API_BASE: &str = "https://newsapi.org";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct EdamamConfig {
    pub app_id: String,
    pub app_key: String,
    pub user_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub http_timeout_secs: u64,
    pub oauth: OAuthConfig,
    pub fit_api_base: String,
    pub gemini: GeminiConfig,
    pub edamam: EdamamConfig,
    pub news: NewsConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset or blank keys fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = get("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let http_timeout_secs = get("HTTP_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            port,
            data_path: PathBuf::from(get_or("APP_DATA_PATH", DEFAULT_DATA_PATH)),
            http_timeout_secs,
            oauth: OAuthConfig {
                client_id: get_or("GOOGLE_FIT_CLIENT_ID", ""),
                client_secret: get_or("GOOGLE_FIT_CLIENT_SECRET", ""),
                redirect_uri: get_or("GOOGLE_FIT_REDIRECT_URI", DEFAULT_REDIRECT_URI),
                auth_url: get_or("GOOGLE_OAUTH_AUTH_URL", DEFAULT_AUTH_URL),
                token_url: get_or("GOOGLE_OAUTH_TOKEN_URL", DEFAULT_TOKEN_URL),
            },
            fit_api_base: get_or("GOOGLE_FIT_API_BASE", DEFAULT_FIT_API_BASE),
            gemini: GeminiConfig {
                api_key: get_or("GEMINI_API_KEY", ""),
                model: get_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: get_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            edamam: EdamamConfig {
                app_id: get_or("EDAMAM_APP_ID", ""),
                app_key: get_or("EDAMAM_APP_KEY", ""),
                user_id: get_or("EDAMAM_USER_ID", ""),
                base_url: get_or("EDAMAM_API_BASE", DEFAULT_EDAMAM_API_BASE),
            },
            news: NewsConfig {
                api_key: get_or("NEWS_API_KEY", ""),
                base_url: get_or("NEWS_API_BASE", DEFAULT_NEWS_API_BASE),
            },
        }
    }
}
