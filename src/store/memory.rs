use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    Campaign, CampaignPatch, CampaignStatus, Invoice, InvoiceFilter, NewCampaign, NewInvoice,
    NewUser, Store, User,
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    campaigns: Vec<Campaign>,
    invoices: Vec<Invoice>,
}

/// In-process store for tests. Mirrors the unique indexes of the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later write fails as if the database were down.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        Ok(())
    }

    pub fn campaign_count(&self) -> usize {
        self.inner.lock().unwrap().campaigns.len()
    }

    pub fn invoice_count(&self) -> usize {
        self.inner.lock().unwrap().invoices.len()
    }
}

fn build_campaign(c: NewCampaign, now: OffsetDateTime) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        user_id: c.user_id,
        campaign_name: c.campaign_name,
        details: c.details,
        pan: c.pan,
        status: c.status,
        date_of_approval: c.date_of_approval,
        payment_details: c.payment_details,
        upload_date: c.upload_date.unwrap_or(now),
        created_at: now,
        updated_at: now,
    }
}

fn build_invoices(
    existing: &[Invoice],
    batch: Vec<NewInvoice>,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<Invoice>> {
    let mut out: Vec<Invoice> = Vec::with_capacity(batch.len());
    for inv in batch {
        let taken = existing
            .iter()
            .chain(out.iter())
            .any(|i| i.invoice_number == inv.invoice_number);
        if taken {
            anyhow::bail!("duplicate invoice number {}", inv.invoice_number);
        }
        out.push(Invoice {
            id: Uuid::new_v4(),
            invoice_number: inv.invoice_number,
            campaign: inv.campaign,
            user_details: inv.user_details,
            footer: inv.footer,
            created_at: now,
        });
    }
    Ok(out)
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, u: NewUser) -> anyhow::Result<User> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|x| x.email == u.email || x.pan == u.pan) {
            anyhow::bail!("duplicate email or pan");
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone: u.phone,
            pan: u.pan,
            password_hash: u.password_hash,
            is_admin: u.is_admin,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_email_or_pan(
        &self,
        email: &str,
        pan: &str,
    ) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.email == email || u.pan == pan)
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        match inner.users.iter_mut().find(|u| u.id == id) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                u.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_campaigns(&self, batch: Vec<NewCampaign>) -> anyhow::Result<Vec<Campaign>> {
        self.check_writable()?;
        let now = OffsetDateTime::now_utc();
        let created: Vec<Campaign> = batch.into_iter().map(|c| build_campaign(c, now)).collect();
        self.inner
            .lock()
            .unwrap()
            .campaigns
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_campaign(&self, id: Uuid) -> anyhow::Result<Option<Campaign>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn find_campaign_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Campaign>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .campaigns
            .iter()
            .find(|c| c.user_id == user_id && c.campaign_name == name)
            .cloned())
    }

    async fn list_campaigns(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Campaign>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Campaign> = inner
            .campaigns
            .iter()
            .filter(|c| owner.map_or(true, |o| c.user_id == o))
            .cloned()
            .collect();
        out.sort_by_key(|c| c.upload_date);
        Ok(out)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        p: CampaignPatch,
    ) -> anyhow::Result<Option<Campaign>> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let Some(c) = inner.campaigns.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(v) = p.campaign_name {
            c.campaign_name = v;
        }
        if let Some(v) = p.pan {
            c.pan = v;
        }
        if let Some(v) = p.details {
            c.details = v;
        }
        if let Some(v) = p.amount {
            c.payment_details.amount = Some(v);
        }
        if let Some(v) = p.due_date {
            c.payment_details.due_date = Some(v);
        }
        if let Some(v) = p.payment_status {
            c.payment_details.status = v;
        }
        if let Some(v) = p.upload_date {
            c.upload_date = v;
        }
        c.updated_at = OffsetDateTime::now_utc();
        Ok(Some(c.clone()))
    }

    async fn set_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
    ) -> anyhow::Result<Option<Campaign>> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.campaigns.iter_mut().find(|c| c.id == id).map(|c| {
            c.status = status;
            if status != CampaignStatus::Approved {
                c.date_of_approval = None;
            }
            c.updated_at = OffsetDateTime::now_utc();
            c.clone()
        }))
    }

    async fn approve_with_invoice(
        &self,
        id: Uuid,
        approved_at: OffsetDateTime,
        invoice: NewInvoice,
    ) -> anyhow::Result<Option<(Campaign, Invoice)>> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        let Some(idx) = inner
            .campaigns
            .iter()
            .position(|c| c.id == id && c.status != CampaignStatus::Approved)
        else {
            return Ok(None);
        };
        let mut created = build_invoices(&inner.invoices, vec![invoice], now)?;
        let invoice = created.remove(0);

        let c = &mut inner.campaigns[idx];
        c.status = CampaignStatus::Approved;
        c.date_of_approval.get_or_insert(approved_at);
        c.updated_at = now;
        let campaign = c.clone();

        inner.invoices.push(invoice.clone());
        Ok(Some((campaign, invoice)))
    }

    async fn delete_campaign(&self, id: Uuid) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.campaigns.len();
        inner.campaigns.retain(|c| c.id != id);
        Ok(inner.campaigns.len() < before)
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> anyhow::Result<Invoice> {
        let mut out = self.insert_invoices(vec![invoice]).await?;
        Ok(out.remove(0))
    }

    async fn insert_invoices(&self, batch: Vec<NewInvoice>) -> anyhow::Result<Vec<Invoice>> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let created = build_invoices(&inner.invoices, batch, OffsetDateTime::now_utc())?;
        inner.invoices.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_invoices(&self, filter: &InvoiceFilter) -> anyhow::Result<Vec<Invoice>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Invoice> = inner
            .invoices
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        out.reverse();
        Ok(out)
    }
}
