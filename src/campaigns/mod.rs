use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod export;
pub mod handlers;
pub mod import;
pub mod workflow;

pub fn router() -> Router<AppState> {
    handlers::campaign_routes()
}
