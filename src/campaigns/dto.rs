use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    imports::RowPolicy,
    store::{Campaign, CampaignPatch, CampaignStatus, Invoice, PaymentStatus},
    validation::{is_valid_pan, parse_amount, parse_date},
};

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub policy: Option<RowPolicy>,
}

/// Partial campaign edit. Dates are accepted in any format the importer
/// accepts; amounts may be numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCampaignRequest {
    pub campaign_name: Option<String>,
    pub pan: Option<String>,
    pub details: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub due_date: Option<String>,
    pub payment_status: Option<String>,
    pub upload_date: Option<String>,
    /// Only read to refuse it; status moves go through the workflow.
    pub status: Option<serde_json::Value>,
}

fn amount_text(v: &serde_json::Value) -> AppResult<String> {
    match v {
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::String(s) => Ok(s.clone()),
        other => Err(AppError::validation(format!("Invalid amount: {other}"))),
    }
}

fn date(raw: Option<&str>) -> AppResult<Option<time::OffsetDateTime>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_date(s).map_err(AppError::validation),
    }
}

impl EditCampaignRequest {
    pub fn into_patch(self) -> AppResult<CampaignPatch> {
        if self.status.is_some() {
            return Err(AppError::validation(
                "Status cannot be changed here, use /edit-campaignStatus",
            ));
        }

        let campaign_name = match self.campaign_name {
            Some(n) if n.trim().is_empty() => {
                return Err(AppError::validation("Campaign name cannot be empty"))
            }
            other => other.map(|n| n.trim().to_string()),
        };
        let pan = match self.pan.map(|p| p.trim().to_string()) {
            Some(p) if !is_valid_pan(&p) => {
                return Err(AppError::validation(format!("Invalid PAN Card Number: {p}")))
            }
            other => other,
        };
        let amount = match &self.amount {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => parse_amount(&amount_text(v)?).map_err(AppError::validation)?,
        };
        let payment_status = match self.payment_status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<PaymentStatus>()
                    .map_err(|_| AppError::validation(format!("Invalid payment status: {s}")))?,
            ),
        };

        let patch = CampaignPatch {
            campaign_name,
            pan,
            details: self.details.map(|d| d.trim().to_string()),
            amount,
            due_date: date(self.due_date.as_deref())?,
            payment_status,
            upload_date: date(self.upload_date.as_deref())?,
        };
        if patch.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }
        Ok(patch)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn parse(&self) -> AppResult<CampaignStatus> {
        self.status
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid status: {}", self.status)))
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub message: &'static str,
    pub campaign: Campaign,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub campaign: Campaign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Invoice>,
}
