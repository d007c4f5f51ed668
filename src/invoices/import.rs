use tracing::{info, instrument};

use super::snapshot::{imported_invoice, InvoiceLine};
use crate::{
    error::AppResult,
    imports::{CsvRow, CsvTable, ImportReport, RowPolicy, RowSink},
    state::AppState,
    store::{NewInvoice, PaymentStatus},
    validation::{is_valid_pan, non_blank, parse_amount},
};

pub const INVOICE_HEADERS: &[&str] = &[
    "UserEmail",
    "PAN",
    "CampaignName",
    "Camp_Description",
    "Amount",
    "Status",
];

fn line_from_row(row: &CsvRow<'_>) -> Result<InvoiceLine, String> {
    let (Some(pan), Some(name)) = (non_blank(row.get("PAN")), non_blank(row.get("CampaignName")))
    else {
        return Err("Missing mandatory fields".into());
    };
    if !is_valid_pan(pan) {
        return Err(format!("Invalid PAN Card Number: {pan}"));
    }
    Ok(InvoiceLine {
        email: row.get("UserEmail").trim().to_lowercase(),
        pan: pan.to_string(),
        campaign_name: name.to_string(),
        description: row.get("Camp_Description").to_string(),
        amount: parse_amount(row.get("Amount"))?,
        payment_status: row.get("Status").parse().unwrap_or(PaymentStatus::Pending),
    })
}

/// Resolves the row's user and campaign as they exist right now.
async fn resolve(
    st: &AppState,
    row: &CsvRow<'_>,
) -> AppResult<Result<NewInvoice, String>> {
    let line = match line_from_row(row) {
        Ok(l) => l,
        Err(reason) => return Ok(Err(reason)),
    };
    let Some(user) = st.store.find_user_by_email(&line.email).await? else {
        return Ok(Err(format!("User not found: {}", line.email)));
    };
    let Some(campaign) = st
        .store
        .find_campaign_by_name(user.id, &line.campaign_name)
        .await?
    else {
        return Ok(Err(format!("Campaign not found: {}", line.campaign_name)));
    };

    Ok(Ok(imported_invoice(
        st.invoice_numbers.next(),
        line,
        &campaign,
        &user,
        &st.config.invoice_contact_info,
    )))
}

/// Rows are resolved one after another in file order; the accepted invoices
/// are written as one batch at the end.
#[instrument(skip(st, table), fields(rows = table.len()))]
pub async fn import_invoices(
    st: &AppState,
    table: &CsvTable,
    policy: RowPolicy,
) -> AppResult<ImportReport> {
    let mut sink = RowSink::new(policy);
    for row in table.rows() {
        match resolve(st, &row).await? {
            Ok(inv) => sink.accept(inv),
            Err(reason) => sink.reject(row.line(), reason)?,
        }
    }
    let (batch, skipped) = sink.finish();

    let inserted = if batch.is_empty() {
        0
    } else {
        st.store.insert_invoices(batch).await?.len()
    };

    info!(inserted, skipped = skipped.len(), "invoice csv imported");
    Ok(ImportReport {
        message: "Invoice data uploaded successfully.".into(),
        inserted,
        skipped,
    })
}
