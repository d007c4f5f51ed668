use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    invoices::snapshot::approval_invoice,
    state::AppState,
    store::{Campaign, CampaignStatus, Invoice, User},
};

const ALREADY_INVOICED: &str = "Invoice already created";

/// Result of a status change. `invoice` is set only when the change was an
/// approval.
#[derive(Debug)]
pub struct StatusChange {
    pub campaign: Campaign,
    pub invoice: Option<Invoice>,
}

async fn load_campaign(st: &AppState, id: Uuid) -> AppResult<Campaign> {
    st.store
        .find_campaign(id)
        .await?
        .ok_or_else(|| AppError::not_found("Campaign not found"))
}

async fn load_owner(st: &AppState, campaign: &Campaign) -> AppResult<User> {
    st.store
        .find_user(campaign.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Moves a campaign between states. Approval also issues the invoice, and
/// both writes land together or not at all.
#[instrument(skip(st, actor), fields(actor = %actor.id))]
pub async fn set_campaign_status(
    st: &AppState,
    actor: &User,
    id: Uuid,
    status: CampaignStatus,
) -> AppResult<StatusChange> {
    if !actor.is_admin {
        warn!("status change by non-admin");
        return Err(AppError::forbidden("Admin access required"));
    }
    let campaign = load_campaign(st, id).await?;

    if status != CampaignStatus::Approved {
        let campaign = st
            .store
            .set_campaign_status(id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Campaign not found"))?;
        info!(campaign_id = %id, %status, "campaign status updated");
        return Ok(StatusChange {
            campaign,
            invoice: None,
        });
    }

    if campaign.status == CampaignStatus::Approved {
        return Err(AppError::conflict(ALREADY_INVOICED));
    }
    let owner = load_owner(st, &campaign).await?;
    let now = OffsetDateTime::now_utc();
    let draft = approval_invoice(
        st.invoice_numbers.next(),
        &campaign,
        &owner,
        &st.config.invoice_contact_info,
        now,
    );

    // A concurrent approval may have won between the read and this write.
    let (campaign, invoice) = st
        .store
        .approve_with_invoice(id, now, draft)
        .await?
        .ok_or_else(|| AppError::conflict(ALREADY_INVOICED))?;

    info!(
        campaign_id = %id,
        invoice_number = %invoice.invoice_number,
        "campaign approved"
    );
    Ok(StatusChange {
        campaign,
        invoice: Some(invoice),
    })
}

/// Issues an invoice for a campaign that has not been approved yet, without
/// changing its status.
#[instrument(skip(st))]
pub async fn create_invoice(st: &AppState, id: Uuid) -> AppResult<Invoice> {
    let campaign = load_campaign(st, id).await?;
    if campaign.status == CampaignStatus::Approved {
        return Err(AppError::conflict(ALREADY_INVOICED));
    }
    let owner = load_owner(st, &campaign).await?;

    let draft = approval_invoice(
        st.invoice_numbers.next(),
        &campaign,
        &owner,
        &st.config.invoice_contact_info,
        OffsetDateTime::now_utc(),
    );
    let invoice = st.store.insert_invoice(draft).await?;

    info!(campaign_id = %id, invoice_number = %invoice.invoice_number, "invoice created");
    Ok(invoice)
}
