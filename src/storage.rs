use crate::errors::AppError;
use crate::models::AppData;
use std::path::Path;
use tokio::fs;
use tracing::{error, warn};

/// Reads the data file; a missing or unreadable file starts from empty state.
pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!(path = %path.display(), "failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no data file yet, starting empty");
            AppData::default()
        }
        Err(err) => {
            error!(path = %path.display(), "failed to read data file: {err}");
            AppData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPair;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("fit_dashboard_{name}_{}_{nanos}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_loads_empty_state() {
        let data = load_data(&temp_path("missing.json")).await;
        assert!(data.tokens.is_none());
        assert!(data.profile.is_none());
    }

    #[tokio::test]
    async fn tokens_persist_under_fixed_key() {
        let path = temp_path("nested").join("state.json");
        let data = AppData {
            tokens: Some(TokenPair {
                access_token: "abc".to_string(),
                refresh_token: Some("refresh".to_string()),
                expiry_date: Some(42),
                scope: None,
                token_type: None,
            }),
            profile: None,
        };

        persist_data(&path, &data).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["google_fit_tokens"]["access_token"], "abc");
        assert_eq!(raw["google_fit_tokens"]["expiry_date"], 42);

        let reloaded = load_data(&path).await;
        assert_eq!(reloaded.tokens, data.tokens);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_state() {
        let path = temp_path("corrupt.json");
        std::fs::write(&path, b"{not json").unwrap();
        let data = load_data(&path).await;
        assert!(data.tokens.is_none());
        let _ = std::fs::remove_file(&path);
    }
}
