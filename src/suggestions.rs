use crate::config::GeminiConfig;
use crate::errors::FitError;
use crate::http::ensure_success;
use crate::models::{FoodSuggestion, NutritionTargets, UserContext};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const SERVICE: &str = "Gemini";
pub const SUGGESTED_FOOD_COUNT: usize = 6;

static BULLET_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\*[ \t]+").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(&self) -> &str {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.as_deref())
            .map_or("", str::trim)
    }
}

/// Removes markdown code fences wrapped around model output.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parses model output against the food-suggestion schema.
pub fn parse_food_suggestion(text: &str) -> Result<FoodSuggestion, FitError> {
    let cleaned = strip_code_fences(text);
    let suggestion: FoodSuggestion = serde_json::from_str(&cleaned).map_err(|err| {
        error!(response = %cleaned, "failed to parse suggestion: {err}");
        FitError::MalformedSuggestion(err.to_string())
    })?;

    if suggestion.foods.len() != SUGGESTED_FOOD_COUNT {
        return Err(FitError::MalformedSuggestion(format!(
            "expected {SUGGESTED_FOOD_COUNT} foods, got {}",
            suggestion.foods.len()
        )));
    }
    if suggestion.foods.iter().any(|food| food.trim().is_empty()) {
        return Err(FitError::MalformedSuggestion("blank food entry".to_string()));
    }
    Ok(suggestion)
}

/// Flattens markdown in a meal plan to plain text with hyphen bullets.
pub fn clean_meal_plan(text: &str) -> String {
    let text = text.replace("```", "");
    let text = BOLD.replace_all(&text, "$1");
    let text = BULLET_STAR.replace_all(&text, "- ");
    text.replace('*', "").trim().to_string()
}

fn food_prompt(context: &UserContext) -> Result<String, FitError> {
    let data = serde_json::to_string_pretty(context)?;
    Ok(format!(
        r#"
Based on this user's health data:
{data}

1) Suggest exactly {SUGGESTED_FOOD_COUNT} healthy food items they should eat today.
2) Provide daily targets as integers for:
   - calories (kcal)
   - protein (g)
   - fat (g)
   - carbs (g)

Return ONLY valid JSON, e.g.:

{{
  "foods": ["Oatmeal", "Salmon", "Avocado", "Broccoli", "Almonds", "Quinoa"],
  "targets": {{
    "calories": 2000,
    "protein": 75,
    "fat": 70,
    "carbs": 250
  }}
}}
"#
    ))
}

fn meal_plan_prompt(targets: &NutritionTargets, vegetarian: bool) -> Result<String, FitError> {
    let data = serde_json::to_string_pretty(&serde_json::json!({
        "targets": targets,
        "vegetarian": vegetarian,
    }))?;
    let veg_instruction = if vegetarian {
        "\nAll meals must be vegetarian (no meat, poultry or fish)."
    } else {
        ""
    };
    Ok(format!(
        r#"
Create a detailed daily meal plan based on this data:
{data}

Include:
- Meal names (breakfast, lunch, dinner, snacks)
- Portion sizes
- Nutritional breakdown (kcal, protein, carbs, fat)
- Brief description for each meal
{veg_instruction}

Return as plain text with line breaks.
Use hyphens (-) for lists, and do NOT use asterisks (*) or any markdown formatting.
"#
    ))
}

/// Generative-text client for food suggestions and meal plans.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    config: GeminiConfig,
    http: Client,
}

impl SuggestionClient {
    pub fn new(config: GeminiConfig, http: Client) -> Self {
        Self { config, http }
    }

    pub async fn suggest_foods(&self, context: &UserContext) -> Result<FoodSuggestion, FitError> {
        let text = self.generate_text(&food_prompt(context)?).await?;
        parse_food_suggestion(&text)
    }

    pub async fn generate_meal_plan(
        &self,
        targets: &NutritionTargets,
        vegetarian: bool,
    ) -> Result<String, FitError> {
        let text = self.generate_text(&meal_plan_prompt(targets, vegetarian)?).await?;
        Ok(clean_meal_plan(&text))
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, FitError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateResponse = ensure_success(SERVICE, response)?.json().await?;
        let text = parsed.first_text().to_string();
        debug!(chars = text.len(), "received generated text");
        Ok(text)
    }
}
