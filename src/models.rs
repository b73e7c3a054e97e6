use serde::{Deserialize, Serialize};

/// OAuth credentials for the fitness-data provider. Field names follow the
/// provider's token JSON so the callback can hand the pair back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenPair {
    /// A pair without an expiry never expires.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(rename = "google_fit_tokens", default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp_millis: i64,
    pub value: f64,
    pub data_type_tag: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyPoint {
    pub date: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodayMetrics {
    pub steps: Option<f64>,
    pub calories: Option<f64>,
    pub heart_rate: Option<f64>,
    pub weight: Option<f64>,
    pub sleep: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NutritionTargets {
    pub calories: u32,
    pub protein: u32,
    pub fat: u32,
    pub carbs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodSuggestion {
    pub foods: Vec<String>,
    pub targets: NutritionTargets,
}

/// Metrics and profile fields sent to the text endpoint.
#[derive(Debug, Clone, Serialize, Default)]
pub struct UserContext {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub calories: Option<f64>,
    pub steps: Option<f64>,
    pub sleep: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub label: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default, rename = "yield")]
    pub servings: Option<f64>,
    #[serde(default)]
    pub ingredient_lines: Vec<String>,
    #[serde(default)]
    pub diet_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: ArticleSource,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct MealPlanRequest {
    pub targets: NutritionTargets,
    #[serde(default)]
    pub vegetarian: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokensResponse {
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub connected: bool,
    pub expiry_date: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub points: Vec<DailyPoint>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SuggestionsResponse {
    pub foods: Vec<String>,
    pub targets: NutritionTargets,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealPlanResponse {
    pub plan: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipesResponse {
    pub recipes: Vec<Recipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewsResponse {
    pub articles: Vec<Article>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
