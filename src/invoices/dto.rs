use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::{Invoice, InvoiceFilter},
    validation::{is_valid_pan, non_blank, parse_date},
};

/// `GET /invoices` query. `from` and `to` are whole days, both inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub pan: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl InvoiceQuery {
    /// Builds the store filter. `owner` is `None` for admins.
    pub fn into_filter(self, owner: Option<Uuid>) -> AppResult<InvoiceFilter> {
        let pan = match self.pan.as_deref().and_then(non_blank) {
            Some(p) if !is_valid_pan(p) => {
                return Err(AppError::validation(format!("Invalid PAN Card Number: {p}")))
            }
            other => other.map(str::to_string),
        };

        let day = |v: Option<&str>| parse_date(v.unwrap_or_default()).map_err(AppError::validation);
        let from = day(self.from.as_deref())?;
        let to = day(self.to.as_deref())?;
        let (created_from, created_before) = match (from, to) {
            (None, None) => (None, None),
            (Some(f), Some(t)) => {
                let (f, t) = (f.date(), t.date());
                if t < f {
                    return Err(AppError::validation("'to' date must not be before 'from' date"));
                }
                let start = f.midnight().assume_utc();
                let end = t.midnight().assume_utc() + Duration::days(1);
                (Some(start), Some(end))
            }
            _ => {
                return Err(AppError::validation(
                    "Both 'from' and 'to' dates are required for a date range",
                ))
            }
        };

        Ok(InvoiceFilter {
            owner,
            pan,
            created_from,
            created_before,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub campaign_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub message: &'static str,
    pub invoice: Invoice,
}
