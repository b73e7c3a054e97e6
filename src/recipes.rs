use crate::config::EdamamConfig;
use crate::errors::FitError;
use crate::http::ensure_success;
use crate::models::Recipe;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SERVICE: &str = "Edamam";
pub const MAX_RESULTS: u32 = 6;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    recipe: Recipe,
}

#[derive(Debug, Clone)]
pub struct RecipeClient {
    config: EdamamConfig,
    http: Client,
}

impl RecipeClient {
    pub fn new(config: EdamamConfig, http: Client) -> Self {
        Self { config, http }
    }

    /// Keyword search; a blank query returns nothing without calling out.
    pub async fn search(&self, query: &str) -> Result<Vec<Recipe>, FitError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/recipes/v2", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .header("Edamam-Account-User", &self.config.user_id)
            .query(&[
                ("type", "public"),
                ("q", query),
                ("app_id", self.config.app_id.as_str()),
                ("app_key", self.config.app_key.as_str()),
            ])
            .query(&[("to", MAX_RESULTS)])
            .send()
            .await?;

        let parsed: SearchResponse = ensure_success(SERVICE, response)?.json().await?;
        debug!(query, hits = parsed.hits.len(), "recipe search finished");
        Ok(parsed.hits.into_iter().map(|hit| hit.recipe).collect())
    }

    /// Top hit for a query, or `None` when there is none.
    pub async fn first_match(&self, query: &str) -> Result<Option<Recipe>, FitError> {
        Ok(self.search(query).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RecipeClient {
        RecipeClient::new(
            EdamamConfig {
                app_id: "app-id".to_string(),
                app_key: "app-key".to_string(),
                user_id: "dashboard-user".to_string(),
                base_url: server.uri(),
            },
            Client::new(),
        )
    }

    #[tokio::test]
    async fn search_returns_recipes_from_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recipes/v2"))
            .and(query_param("type", "public"))
            .and(query_param("q", "salmon bowl"))
            .and(query_param("to", "6"))
            .and(header("Edamam-Account-User", "dashboard-user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hits": [
                    { "recipe": {
                        "label": "Salmon Poke",
                        "image": "https://img.example/poke.jpg",
                        "url": "https://recipes.example/poke",
                        "calories": 812.4,
                        "yield": 2.0,
                        "ingredientLines": ["200g salmon", "rice"],
                        "dietLabels": ["High-Protein"]
                    }},
                    { "recipe": { "label": "Teriyaki Salmon" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let recipes = client(&server).search("salmon bowl").await.unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].label, "Salmon Poke");
        assert_eq!(recipes[0].servings, Some(2.0));
        assert_eq!(recipes[0].ingredient_lines.len(), 2);
        assert!(recipes[1].image.is_none());
    }

    #[tokio::test]
    async fn blank_query_skips_the_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(client(&server).search("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_and_not_found_are_distinct() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "bad-credentials"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "overloaded"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let recipes = client(&server);

        let unauthorized = recipes.search("bad-credentials").await.unwrap_err();
        let not_found = recipes.search("missing").await.unwrap_err();
        let overloaded = recipes.search("overloaded").await.unwrap_err();

        assert!(matches!(unauthorized, FitError::Unauthorized { service: "Edamam" }));
        assert!(matches!(not_found, FitError::NotFound { service: "Edamam" }));
        assert!(matches!(overloaded, FitError::UpstreamHttp { status: 503, .. }));
        assert_ne!(unauthorized.to_string(), not_found.to_string());
    }
}
