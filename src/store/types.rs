use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Campaign lifecycle. Any state can move to any other; "clear" is a move
/// back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Pending,
    Approved,
    Rejected,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Pending => "Pending",
            CampaignStatus::Approved => "Approved",
            CampaignStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(CampaignStatus::Pending),
            "approved" => Ok(CampaignStatus::Approved),
            "rejected" => Ok(CampaignStatus::Rejected),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub pan: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2, never sent to clients
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub pan: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub amount: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub campaign_name: String,
    pub details: String,
    pub pan: String,
    pub status: CampaignStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_of_approval: Option<OffsetDateTime>,
    pub payment_details: PaymentDetails,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub user_id: Uuid,
    pub campaign_name: String,
    pub details: String,
    pub pan: String,
    pub status: CampaignStatus,
    pub date_of_approval: Option<OffsetDateTime>,
    pub payment_details: PaymentDetails,
    /// Insert time when absent.
    pub upload_date: Option<OffsetDateTime>,
}

/// Partial edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct CampaignPatch {
    pub campaign_name: Option<String>,
    pub pan: Option<String>,
    pub details: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<OffsetDateTime>,
    pub payment_status: Option<PaymentStatus>,
    pub upload_date: Option<OffsetDateTime>,
}

impl CampaignPatch {
    pub fn is_empty(&self) -> bool {
        self.campaign_name.is_none()
            && self.pan.is_none()
            && self.details.is_none()
            && self.amount.is_none()
            && self.due_date.is_none()
            && self.payment_status.is_none()
            && self.upload_date.is_none()
    }
}

/// Campaign as it looked when the invoice was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSnapshot {
    pub title: String,
    pub detail: String,
    pub status: CampaignStatus,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_of_approval: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub date_of_upload: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSnapshot {
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub name: String,
    pub email: String,
    pub pan_card_number: String,
    pub payment_details: PaymentSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footer {
    pub contact_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub campaign: CampaignSnapshot,
    pub user_details: UserSnapshot,
    pub footer: Footer,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub campaign: CampaignSnapshot,
    pub user_details: UserSnapshot,
    pub footer: Footer,
}

/// Invoice search. `created_before` is exclusive.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub owner: Option<Uuid>,
    pub pan: Option<String>,
    pub created_from: Option<OffsetDateTime>,
    pub created_before: Option<OffsetDateTime>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.owner.map_or(true, |o| invoice.campaign.user_id == o)
            && self
                .pan
                .as_deref()
                .map_or(true, |p| invoice.user_details.pan_card_number == p)
            && self.created_from.map_or(true, |f| invoice.created_at >= f)
            && self.created_before.map_or(true, |b| invoice.created_at < b)
    }
}
