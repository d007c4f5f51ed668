use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod types;

pub use types::{
    Campaign, CampaignPatch, CampaignSnapshot, CampaignStatus, Footer, Invoice, InvoiceFilter,
    NewCampaign, NewInvoice, NewUser, PaymentDetails, PaymentSnapshot, PaymentStatus, User,
    UserSnapshot,
};

/// Persistence for users, campaigns and invoices.
///
/// Writes touching more than one record (`insert_campaigns`,
/// `insert_invoices`, `approve_with_invoice`) are all-or-nothing.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User>;
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Any user holding either the email or the PAN.
    async fn find_user_by_email_or_pan(
        &self,
        email: &str,
        pan: &str,
    ) -> anyhow::Result<Option<User>>;
    /// Returns false when no user has that id.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool>;

    async fn insert_campaigns(&self, batch: Vec<NewCampaign>) -> anyhow::Result<Vec<Campaign>>;
    async fn find_campaign(&self, id: Uuid) -> anyhow::Result<Option<Campaign>>;
    async fn find_campaign_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Campaign>>;
    /// All campaigns, or only those of `owner`, oldest upload first.
    async fn list_campaigns(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Campaign>>;
    async fn update_campaign(
        &self,
        id: Uuid,
        patch: CampaignPatch,
    ) -> anyhow::Result<Option<Campaign>>;
    /// Leaving `Approved` clears the approval date.
    async fn set_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
    ) -> anyhow::Result<Option<Campaign>>;
    /// Marks the campaign approved and stores the invoice in one unit.
    /// `None` when the campaign is missing or already approved; nothing is
    /// written in that case.
    async fn approve_with_invoice(
        &self,
        id: Uuid,
        approved_at: OffsetDateTime,
        invoice: NewInvoice,
    ) -> anyhow::Result<Option<(Campaign, Invoice)>>;
    async fn delete_campaign(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn insert_invoice(&self, invoice: NewInvoice) -> anyhow::Result<Invoice>;
    async fn insert_invoices(&self, batch: Vec<NewInvoice>) -> anyhow::Result<Vec<Invoice>>;
    /// Newest first.
    async fn list_invoices(&self, filter: &InvoiceFilter) -> anyhow::Result<Vec<Invoice>>;
}
