use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CampaignResponse, EditCampaignRequest, ImportQuery, StatusRequest, StatusResponse},
    export::campaigns_to_csv,
    import::{import_campaigns, CAMPAIGN_HEADERS},
    workflow,
};
use crate::{
    auth::{
        dto::MessageResponse,
        extractors::{AdminUser, CurrentUser},
    },
    error::{AppError, AppResult},
    imports::{ImportReport, SpooledUpload},
    state::AppState,
    store::{Campaign, User},
};

pub fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/upload-campaign", post(upload_campaigns))
        .route("/export-campaigns", get(export_campaigns))
        .route("/edit-campaign/:id", patch(edit_campaign))
        .route("/delete-campaign/:id", delete(delete_campaign))
        .route("/edit-campaignStatus/:id", patch(edit_campaign_status))
}

async fn owned_campaign(st: &AppState, actor: &User, id: Uuid) -> AppResult<Campaign> {
    let campaign = st
        .store
        .find_campaign(id)
        .await?
        .ok_or_else(|| AppError::not_found("Campaign not found"))?;
    if campaign.user_id != actor.id && !actor.is_admin {
        warn!(user_id = %actor.id, campaign_id = %id, "campaign owned by someone else");
        return Err(AppError::forbidden("Not allowed to modify this campaign"));
    }
    Ok(campaign)
}

#[instrument(skip(st, user, mp), fields(user_id = %user.id))]
pub async fn upload_campaigns(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<ImportQuery>,
    mp: Multipart,
) -> AppResult<Json<ImportReport>> {
    let imports = &st.config.imports;
    let policy = q.policy.unwrap_or(imports.campaign_policy);
    let upload =
        SpooledUpload::from_multipart(mp, &imports.upload_dir, imports.max_upload_bytes).await?;
    info!(size = upload.size(), %policy, "campaign csv received");

    let (_upload, table) = upload.read_table(CAMPAIGN_HEADERS).await?;
    let report = import_campaigns(&st, &table, user.id, policy).await?;
    Ok(Json(report))
}

#[instrument(skip(st, user), fields(user_id = %user.id))]
pub async fn export_campaigns(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let owner = (!user.is_admin).then_some(user.id);
    let campaigns = st.store.list_campaigns(owner).await?;
    let body = campaigns_to_csv(&campaigns)?;

    info!(rows = campaigns.len(), "campaigns exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"campaigns.csv\"",
            ),
        ],
        body,
    ))
}

#[instrument(skip(st, user, payload), fields(user_id = %user.id))]
pub async fn edit_campaign(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditCampaignRequest>,
) -> AppResult<Json<CampaignResponse>> {
    owned_campaign(&st, &user, id).await?;
    let patch = payload.into_patch()?;

    let campaign = st
        .store
        .update_campaign(id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Campaign not found"))?;

    info!(campaign_id = %id, "campaign updated");
    Ok(Json(CampaignResponse {
        message: "Campaign updated successfully",
        campaign,
    }))
}

#[instrument(skip(st, user), fields(user_id = %user.id))]
pub async fn delete_campaign(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    owned_campaign(&st, &user, id).await?;
    if !st.store.delete_campaign(id).await? {
        return Err(AppError::not_found("Campaign not found"));
    }
    info!(campaign_id = %id, "campaign deleted");
    Ok(Json(MessageResponse {
        message: "Campaign deleted successfully",
    }))
}

#[instrument(skip(st, admin, payload), fields(admin_id = %admin.id))]
pub async fn edit_campaign_status(
    State(st): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<StatusResponse>> {
    let status = payload.parse()?;
    let change = workflow::set_campaign_status(&st, &admin, id, status).await?;
    Ok(Json(StatusResponse {
        message: "Campaign status updated",
        campaign: change.campaign,
        invoice: change.invoice,
    }))
}
