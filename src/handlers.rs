use crate::errors::{AppError, FitError};
use crate::metrics::{AggregationWindow, ValueField, CALORIE_DATA_TYPE, STEP_DATA_TYPE};
use crate::models::{
    AuthUrlResponse, CallbackQuery, MealPlanRequest, MealPlanResponse, NewsResponse, Recipe,
    RecipeQuery, RecipesResponse, SeriesResponse, SessionResponse, SuggestionsResponse,
    TodayMetrics, TokensResponse, UserContext, UserProfile,
};
use crate::state::AppState;
use crate::stats::{build_daily_series, round_values, SERIES_DAYS};
use axum::{
    extract::{Query, State},
    Json,
};
use futures_util::future::join_all;
use tracing::{error, info, warn};

pub async fn auth_url(State(state): State<AppState>) -> Result<Json<AuthUrlResponse>, AppError> {
    let auth_url = state
        .services
        .oauth
        .build_authorization_url()
        .map_err(|err| AppError::upstream("Failed to generate auth URL", &err))?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<TokensResponse>, AppError> {
    let code = query.code.unwrap_or_default();
    let tokens = match state.services.oauth.exchange_code(&code).await {
        Ok(tokens) => tokens,
        Err(FitError::AuthCodeMissing) => {
            return Err(AppError::bad_request(FitError::AuthCodeMissing.to_string()));
        }
        Err(err) => {
            error!("token exchange error: {err}");
            return Err(AppError::upstream("Failed to exchange code for tokens", &err));
        }
    };

    state.sign_in(tokens.clone()).await?;
    Ok(Json(TokensResponse { tokens }))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.session().await;
    Json(SessionResponse {
        connected: session.access_token().is_some(),
        expiry_date: session.tokens().and_then(|tokens| tokens.expiry_date),
    })
}

pub async fn end_session(State(state): State<AppState>) -> Result<Json<SessionResponse>, AppError> {
    state.sign_out().await?;
    Ok(Json(SessionResponse {
        connected: false,
        expiry_date: None,
    }))
}

pub async fn today_metrics(State(state): State<AppState>) -> Json<TodayMetrics> {
    let session = state.session().await;
    Json(state.services.fit.fetch_today(&session).await)
}

pub async fn weekly_steps(State(state): State<AppState>) -> Json<SeriesResponse> {
    Json(weekly_series(&state, STEP_DATA_TYPE, ValueField::IntVal).await)
}

pub async fn weekly_calories(State(state): State<AppState>) -> Json<SeriesResponse> {
    let mut series = weekly_series(&state, CALORIE_DATA_TYPE, ValueField::FpVal).await;
    round_values(&mut series.points);
    Json(series)
}

async fn weekly_series(state: &AppState, data_type: &str, field: ValueField) -> SeriesResponse {
    let session = state.session().await;
    let window = AggregationWindow::rolling_days(SERIES_DAYS as u32);
    let points = match state
        .services
        .fit
        .fetch_aggregate_buckets(&session, data_type, window)
        .await
    {
        Some(buckets) => build_daily_series(&buckets, field),
        None => Vec::new(),
    };
    SeriesResponse { points }
}

pub async fn get_profile(State(state): State<AppState>) -> Json<Option<UserProfile>> {
    Json(state.profile().await)
}

pub async fn put_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, AppError> {
    if profile.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::bad_request("name must not be blank"));
    }
    Ok(Json(state.save_profile(profile).await?))
}

/// Foods and targets for the current metrics, plus the top recipe per food.
pub async fn suggestions(State(state): State<AppState>) -> Json<SuggestionsResponse> {
    let Some(profile) = state.profile().await.filter(|profile| profile.age.is_some()) else {
        info!("profile has no age yet, skipping suggestions");
        return Json(SuggestionsResponse::default());
    };

    let session = state.session().await;
    let today = state.services.fit.fetch_today(&session).await;
    let context = UserContext {
        name: profile.name,
        age: profile.age,
        calories: today.calories,
        steps: today.steps,
        sleep: today.sleep,
    };

    let suggestion = match state.services.suggestions.suggest_foods(&context).await {
        Ok(suggestion) => suggestion,
        Err(err) => {
            error!("error fetching suggestions: {err}");
            return Json(SuggestionsResponse::default());
        }
    };

    let lookups = suggestion
        .foods
        .iter()
        .map(|food| state.services.recipes.first_match(food));
    let recipes: Vec<Recipe> = join_all(lookups)
        .await
        .into_iter()
        .zip(&suggestion.foods)
        .filter_map(|(result, food)| match result {
            Ok(recipe) => recipe,
            Err(err) => {
                warn!(food = %food, "recipe lookup failed: {err}");
                None
            }
        })
        .collect();

    Json(SuggestionsResponse {
        foods: suggestion.foods,
        targets: suggestion.targets,
        recipes,
    })
}

pub async fn meal_plan(
    State(state): State<AppState>,
    Json(request): Json<MealPlanRequest>,
) -> Json<MealPlanResponse> {
    let plan = match state
        .services
        .suggestions
        .generate_meal_plan(&request.targets, request.vegetarian)
        .await
    {
        Ok(plan) => Some(plan),
        Err(err) => {
            error!("error generating meal plan: {err}");
            None
        }
    };
    Json(MealPlanResponse { plan })
}

pub async fn search_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Json<RecipesResponse> {
    match state.services.recipes.search(&query.q).await {
        Ok(recipes) => Json(RecipesResponse {
            recipes,
            error: None,
        }),
        Err(err) => {
            warn!(query = %query.q, "recipe search failed: {err}");
            Json(RecipesResponse {
                recipes: Vec::new(),
                error: Some(err.to_string()),
            })
        }
    }
}

pub async fn health_news(State(state): State<AppState>) -> Json<NewsResponse> {
    match state.services.news.health_headlines().await {
        Ok(articles) => Json(NewsResponse {
            articles,
            error: None,
        }),
        Err(err) => {
            error!("error fetching health news: {err}");
            Json(NewsResponse {
                articles: Vec::new(),
                error: Some(err.to_string()),
            })
        }
    }
}
