use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/fit/url", get(handlers::auth_url))
        .route("/api/fit/callback", get(handlers::oauth_callback))
        .route("/api/session", get(handlers::get_session).delete(handlers::end_session))
        .route("/api/metrics/today", get(handlers::today_metrics))
        .route("/api/metrics/weekly/steps", get(handlers::weekly_steps))
        .route("/api/metrics/weekly/calories", get(handlers::weekly_calories))
        .route("/api/profile", get(handlers::get_profile).put(handlers::put_profile))
        .route("/api/suggestions", get(handlers::suggestions))
        .route("/api/meal-plan", post(handlers::meal_plan))
        .route("/api/recipes", get(handlers::search_recipes))
        .route("/api/news", get(handlers::health_news))
        .with_state(state)
}
