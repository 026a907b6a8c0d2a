use axum::Router;

pub mod camps;
pub mod system;
pub mod talks;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new().nest("/camps", camps::router())
}
