use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateInvoiceRequest, InvoiceListResponse, InvoiceQuery, InvoiceResponse},
    import::{import_invoices, INVOICE_HEADERS},
};
use crate::{
    auth::extractors::{AdminUser, CurrentUser},
    campaigns::{dto::ImportQuery, workflow},
    error::AppResult,
    imports::{ImportReport, SpooledUpload},
    state::AppState,
};

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/create-invoice", post(create_invoice))
        .route("/upload-invoice", post(upload_invoices))
}

#[instrument(skip(st, user, q), fields(user_id = %user.id))]
pub async fn list_invoices(
    State(st): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<InvoiceQuery>,
) -> AppResult<Json<InvoiceListResponse>> {
    let owner = (!user.is_admin).then_some(user.id);
    let filter = q.into_filter(owner)?;
    let invoices = st.store.list_invoices(&filter).await?;
    Ok(Json(InvoiceListResponse { invoices }))
}

#[instrument(skip(st, admin, payload), fields(admin_id = %admin.id))]
pub async fn create_invoice(
    State(st): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<InvoiceResponse>)> {
    let invoice = workflow::create_invoice(&st, payload.campaign_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse {
            message: "Invoice created successfully",
            invoice,
        }),
    ))
}

#[instrument(skip(st, admin, mp), fields(admin_id = %admin.id))]
pub async fn upload_invoices(
    State(st): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(q): Query<ImportQuery>,
    mp: Multipart,
) -> AppResult<Json<ImportReport>> {
    let imports = &st.config.imports;
    let policy = q.policy.unwrap_or(imports.invoice_policy);
    let upload =
        SpooledUpload::from_multipart(mp, &imports.upload_dir, imports.max_upload_bytes).await?;
    info!(size = upload.size(), %policy, "invoice csv received");

    let (_upload, table) = upload.read_table(INVOICE_HEADERS).await?;
    let report = import_invoices(&st, &table, policy).await?;
    Ok(Json(report))
}
