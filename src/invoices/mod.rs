use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod import;
pub mod numbers;
pub mod snapshot;

pub fn router() -> Router<AppState> {
    handlers::invoice_routes()
}
