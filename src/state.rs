use crate::auth::OAuthClient;
use crate::config::Config;
use crate::errors::AppError;
use crate::http::build_client;
use crate::metrics::FitClient;
use crate::models::{AppData, TokenPair, UserProfile};
use crate::news::NewsClient;
use crate::recipes::RecipeClient;
use crate::session::Session;
use crate::storage::persist_data;
use crate::suggestions::SuggestionClient;
use chrono::Utc;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Upstream clients, all sharing one connection pool.
#[derive(Debug)]
pub struct Services {
    pub oauth: OAuthClient,
    pub fit: FitClient,
    pub suggestions: SuggestionClient,
    pub recipes: RecipeClient,
    pub news: NewsClient,
}

impl Services {
    pub fn from_config(config: &Config) -> Self {
        let http = build_client(config.http_timeout_secs);
        Self {
            oauth: OAuthClient::new(config.oauth.clone(), http.clone()),
            fit: FitClient::new(config.fit_api_base.clone(), http.clone()),
            suggestions: SuggestionClient::new(config.gemini.clone(), http.clone()),
            recipes: RecipeClient::new(config.edamam.clone(), http.clone()),
            news: NewsClient::new(config.news.clone(), http),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(data_path: PathBuf, data: AppData, services: Services) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            services: Arc::new(services),
        }
    }

    /// Session for the stored token pair. A pair found past its expiry is
    /// deleted from the store and the session comes back anonymous.
    pub async fn session(&self) -> Session {
        let mut data = self.data.lock().await;
        let expired = data
            .tokens
            .as_ref()
            .is_some_and(|tokens| tokens.is_expired_at(Utc::now().timestamp_millis()));

        if expired {
            info!("stored token pair expired, removing it");
            data.tokens = None;
            if let Err(err) = persist_data(&self.data_path, &data).await {
                warn!("failed to persist token removal: {}", err.message);
            }
        }

        data.tokens.clone().map(Session::new).unwrap_or_default()
    }

    pub async fn sign_in(&self, tokens: TokenPair) -> Result<Session, AppError> {
        let mut data = self.data.lock().await;
        data.tokens = Some(tokens.clone());
        persist_data(&self.data_path, &data).await?;
        info!("fitness account connected");
        Ok(Session::new(tokens))
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        let mut data = self.data.lock().await;
        if data.tokens.take().is_some() {
            persist_data(&self.data_path, &data).await?;
            info!("fitness account disconnected");
        }
        Ok(())
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.data.lock().await.profile.clone()
    }

    pub async fn save_profile(&self, profile: UserProfile) -> Result<UserProfile, AppError> {
        let mut data = self.data.lock().await;
        data.profile = Some(profile.clone());
        persist_data(&self.data_path, &data).await?;
        Ok(profile)
    }
}
