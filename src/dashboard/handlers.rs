use axum::{extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::{AdminDashboardResponse, DashboardResponse, Summary};
use crate::{
    auth::extractors::{AdminUser, CurrentUser},
    error::AppResult,
    state::AppState,
    store::InvoiceFilter,
};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/adminDash", get(admin_dashboard))
}

#[instrument(skip(st, user), fields(user_id = %user.id))]
pub async fn dashboard(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardResponse>> {
    let campaigns = st.store.list_campaigns(Some(user.id)).await?;
    let invoices = st
        .store
        .list_invoices(&InvoiceFilter {
            owner: Some(user.id),
            ..Default::default()
        })
        .await?;
    let summary = Summary::build(&campaigns, &invoices, OffsetDateTime::now_utc());

    Ok(Json(DashboardResponse {
        user_info: user,
        campaigns,
        invoices,
        summary,
    }))
}

#[instrument(skip(st, admin), fields(admin_id = %admin.id))]
pub async fn admin_dashboard(
    State(st): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<AdminDashboardResponse>> {
    let campaign = st.store.list_campaigns(None).await?;
    Ok(Json(AdminDashboardResponse {
        user_info: admin,
        campaign,
    }))
}
