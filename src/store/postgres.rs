use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    Campaign, CampaignPatch, CampaignSnapshot, CampaignStatus, Footer, Invoice, InvoiceFilter,
    NewCampaign, NewInvoice, NewUser, PaymentDetails, Store, User, UserSnapshot,
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, pan, password_hash, \
                            is_admin, created_at, updated_at";

const CAMPAIGN_COLUMNS: &str = "id, user_id, campaign_name, details, pan, status, \
                                date_of_approval, upload_date, payment_amount, \
                                payment_due_date, payment_status, created_at, updated_at";

const INVOICE_COLUMNS: &str =
    "id, invoice_number, campaign, user_details, footer_contact, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    pan: String,
    password_hash: String,
    is_admin: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            pan: r.pan,
            password_hash: r.password_hash,
            is_admin: r.is_admin,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CampaignRow {
    id: Uuid,
    user_id: Uuid,
    campaign_name: String,
    details: String,
    pan: String,
    status: String,
    date_of_approval: Option<OffsetDateTime>,
    upload_date: OffsetDateTime,
    payment_amount: Option<f64>,
    payment_due_date: Option<OffsetDateTime>,
    payment_status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = anyhow::Error;

    fn try_from(r: CampaignRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            campaign_name: r.campaign_name,
            details: r.details,
            pan: r.pan,
            status: r.status.parse().map_err(anyhow::Error::msg)?,
            date_of_approval: r.date_of_approval,
            payment_details: PaymentDetails {
                amount: r.payment_amount,
                due_date: r.payment_due_date,
                status: r.payment_status.parse().map_err(anyhow::Error::msg)?,
            },
            upload_date: r.upload_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    campaign: Json<CampaignSnapshot>,
    user_details: Json<UserSnapshot>,
    footer_contact: String,
    created_at: OffsetDateTime,
}

impl From<InvoiceRow> for Invoice {
    fn from(r: InvoiceRow) -> Self {
        Self {
            id: r.id,
            invoice_number: r.invoice_number,
            campaign: r.campaign.0,
            user_details: r.user_details.0,
            footer: Footer {
                contact_info: r.footer_contact,
            },
            created_at: r.created_at,
        }
    }
}

fn campaigns_from_rows(rows: Vec<CampaignRow>) -> anyhow::Result<Vec<Campaign>> {
    rows.into_iter().map(Campaign::try_from).collect()
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn insert_campaign_tx(
    tx: &mut Transaction<'_, Postgres>,
    c: NewCampaign,
) -> anyhow::Result<Campaign> {
    let sql = format!(
        r#"
        INSERT INTO campaigns (id, user_id, campaign_name, details, pan, status,
                               date_of_approval, upload_date, payment_amount,
                               payment_due_date, payment_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, now()), $9, $10, $11)
        RETURNING {CAMPAIGN_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(c.user_id)
        .bind(&c.campaign_name)
        .bind(&c.details)
        .bind(&c.pan)
        .bind(c.status.as_str())
        .bind(c.date_of_approval)
        .bind(c.upload_date)
        .bind(c.payment_details.amount)
        .bind(c.payment_details.due_date)
        .bind(c.payment_details.status.as_str())
        .fetch_one(&mut **tx)
        .await
        .context("insert campaign")?;
    row.try_into()
}

async fn insert_invoice_tx(
    tx: &mut Transaction<'_, Postgres>,
    inv: NewInvoice,
) -> anyhow::Result<Invoice> {
    let sql = format!(
        r#"
        INSERT INTO invoices (id, invoice_number, campaign_user_id, pan,
                              campaign, user_details, footer_contact)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {INVOICE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, InvoiceRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(&inv.invoice_number)
        .bind(inv.campaign.user_id)
        .bind(&inv.user_details.pan_card_number)
        .bind(Json(&inv.campaign))
        .bind(Json(&inv.user_details))
        .bind(&inv.footer.contact_info)
        .fetch_one(&mut **tx)
        .await
        .with_context(|| format!("insert invoice {}", inv.invoice_number))?;
    Ok(row.into())
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, u: NewUser) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone, pan, password_hash, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&u.first_name)
            .bind(&u.last_name)
            .bind(&u.email)
            .bind(&u.phone)
            .bind(&u.pan)
            .bind(&u.password_hash)
            .bind(u.is_admin)
            .fetch_one(&self.db)
            .await
            .context("insert user")?;
        Ok(row.into())
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email_or_pan(
        &self,
        email: &str,
        pan: &str,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR pan = $2 LIMIT 1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .bind(pan)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .context("update password")?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_campaigns(&self, batch: Vec<NewCampaign>) -> anyhow::Result<Vec<Campaign>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut out = Vec::with_capacity(batch.len());
        for c in batch {
            out.push(insert_campaign_tx(&mut tx, c).await?);
        }
        tx.commit().await.context("commit tx")?;
        Ok(out)
    }

    async fn find_campaign(&self, id: Uuid) -> anyhow::Result<Option<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Campaign::try_from)
            .transpose()
    }

    async fn find_campaign_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Campaign>> {
        let sql = format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS}
              FROM campaigns
             WHERE user_id = $1 AND campaign_name = $2
             ORDER BY created_at ASC
             LIMIT 1
            "#
        );
        sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.db)
            .await?
            .map(Campaign::try_from)
            .transpose()
    }

    async fn list_campaigns(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Campaign>> {
        let sql = format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS}
              FROM campaigns
             WHERE ($1::uuid IS NULL OR user_id = $1)
             ORDER BY upload_date ASC, created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(owner)
            .fetch_all(&self.db)
            .await
            .context("list campaigns")?;
        campaigns_from_rows(rows)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        p: CampaignPatch,
    ) -> anyhow::Result<Option<Campaign>> {
        let sql = format!(
            r#"
            UPDATE campaigns
               SET campaign_name    = COALESCE($2, campaign_name),
                   pan              = COALESCE($3, pan),
                   details          = COALESCE($4, details),
                   payment_amount   = COALESCE($5, payment_amount),
                   payment_due_date = COALESCE($6, payment_due_date),
                   payment_status   = COALESCE($7, payment_status),
                   upload_date      = COALESCE($8, upload_date),
                   updated_at       = now()
             WHERE id = $1
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(id)
            .bind(p.campaign_name)
            .bind(p.pan)
            .bind(p.details)
            .bind(p.amount)
            .bind(p.due_date)
            .bind(p.payment_status.map(|s| s.as_str()))
            .bind(p.upload_date)
            .fetch_optional(&self.db)
            .await
            .context("update campaign")?
            .map(Campaign::try_from)
            .transpose()
    }

    async fn set_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
    ) -> anyhow::Result<Option<Campaign>> {
        let sql = format!(
            r#"
            UPDATE campaigns
               SET status = $2,
                   date_of_approval = CASE WHEN $2 = 'Approved' THEN date_of_approval END,
                   updated_at = now()
             WHERE id = $1
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.db)
            .await
            .context("set campaign status")?
            .map(Campaign::try_from)
            .transpose()
    }

    async fn approve_with_invoice(
        &self,
        id: Uuid,
        approved_at: OffsetDateTime,
        invoice: NewInvoice,
    ) -> anyhow::Result<Option<(Campaign, Invoice)>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let sql = format!(
            r#"
            UPDATE campaigns
               SET status = 'Approved',
                   date_of_approval = COALESCE(date_of_approval, $2),
                   updated_at = now()
             WHERE id = $1 AND status <> 'Approved'
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        );
        let Some(row) = sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(id)
            .bind(approved_at)
            .fetch_optional(&mut *tx)
            .await
            .context("approve campaign")?
        else {
            // dropping the transaction rolls it back
            return Ok(None);
        };
        let campaign = Campaign::try_from(row)?;
        let invoice = insert_invoice_tx(&mut tx, invoice).await?;

        tx.commit().await.context("commit tx")?;
        Ok(Some((campaign, invoice)))
    }

    async fn delete_campaign(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM campaigns WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete campaign")?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> anyhow::Result<Invoice> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let out = insert_invoice_tx(&mut tx, invoice).await?;
        tx.commit().await.context("commit tx")?;
        Ok(out)
    }

    async fn insert_invoices(&self, batch: Vec<NewInvoice>) -> anyhow::Result<Vec<Invoice>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut out = Vec::with_capacity(batch.len());
        for inv in batch {
            out.push(insert_invoice_tx(&mut tx, inv).await?);
        }
        tx.commit().await.context("commit tx")?;
        Ok(out)
    }

    async fn list_invoices(&self, f: &InvoiceFilter) -> anyhow::Result<Vec<Invoice>> {
        let sql = format!(
            r#"
            SELECT {INVOICE_COLUMNS}
              FROM invoices
             WHERE ($1::uuid IS NULL OR campaign_user_id = $1)
               AND ($2::text IS NULL OR pan = $2)
               AND ($3::timestamptz IS NULL OR created_at >= $3)
               AND ($4::timestamptz IS NULL OR created_at < $4)
             ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(f.owner)
            .bind(f.pan.as_deref())
            .bind(f.created_from)
            .bind(f.created_before)
            .fetch_all(&self.db)
            .await
            .context("list invoices")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
