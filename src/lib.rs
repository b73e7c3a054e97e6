pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod models;
pub mod news;
pub mod recipes;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod suggestions;

pub use app::router;
pub use config::Config;
pub use errors::FitError;
pub use session::Session;
pub use state::{AppState, Services};
pub use storage::load_data;
