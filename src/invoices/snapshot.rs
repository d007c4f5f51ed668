use time::OffsetDateTime;

use crate::store::{
    Campaign, CampaignSnapshot, CampaignStatus, Footer, NewInvoice, PaymentSnapshot,
    PaymentStatus, User, UserSnapshot,
};

/// Invoice issued when `campaign` is approved. The embedded campaign status
/// is always `Approved` and the payment block copies the campaign's terms.
pub fn approval_invoice(
    number: String,
    campaign: &Campaign,
    owner: &User,
    contact_info: &str,
    approved_at: OffsetDateTime,
) -> NewInvoice {
    let pay = &campaign.payment_details;
    NewInvoice {
        invoice_number: number,
        campaign: CampaignSnapshot {
            title: campaign.campaign_name.clone(),
            detail: campaign.details.clone(),
            status: CampaignStatus::Approved,
            user_id: campaign.user_id,
            date_of_approval: campaign.date_of_approval.or(Some(approved_at)),
            date_of_upload: campaign.upload_date,
        },
        user_details: UserSnapshot {
            name: owner.full_name(),
            email: owner.email.clone(),
            pan_card_number: owner.pan.clone(),
            payment_details: PaymentSnapshot {
                amount: pay.amount.unwrap_or(0.0),
                due_date: pay.due_date,
                status: pay.status,
            },
        },
        footer: Footer {
            contact_info: contact_info.to_string(),
        },
    }
}

/// Cells of one invoice CSV row that end up on the invoice.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub email: String,
    pub pan: String,
    pub campaign_name: String,
    pub description: String,
    pub amount: Option<f64>,
    pub payment_status: PaymentStatus,
}

/// Invoice built from an imported row. Descriptive fields come from the
/// row, the status and dates from the stored campaign.
pub fn imported_invoice(
    number: String,
    line: InvoiceLine,
    campaign: &Campaign,
    owner: &User,
    contact_info: &str,
) -> NewInvoice {
    NewInvoice {
        invoice_number: number,
        campaign: CampaignSnapshot {
            title: line.campaign_name,
            detail: line.description,
            status: campaign.status,
            user_id: campaign.user_id,
            date_of_approval: campaign.date_of_approval,
            date_of_upload: campaign.upload_date,
        },
        user_details: UserSnapshot {
            name: owner.full_name(),
            email: line.email,
            pan_card_number: line.pan,
            payment_details: PaymentSnapshot {
                amount: line.amount.unwrap_or(0.0),
                due_date: campaign.payment_details.due_date,
                status: line.payment_status,
            },
        },
        footer: Footer {
            contact_info: contact_info.to_string(),
        },
    }
}
