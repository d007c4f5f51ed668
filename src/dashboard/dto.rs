use serde::Serialize;
use time::OffsetDateTime;

use crate::store::{Campaign, CampaignStatus, Invoice, User};

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    pub total_invoices: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub nearest_due_date: Option<OffsetDateTime>,
}

impl Summary {
    /// Status counts over `campaigns` and the earliest invoice due date that
    /// is still ahead of `now`.
    pub fn build(campaigns: &[Campaign], invoices: &[Invoice], now: OffsetDateTime) -> Self {
        let mut s = Summary {
            total: campaigns.len(),
            total_invoices: invoices.len(),
            ..Default::default()
        };
        for c in campaigns {
            match c.status {
                CampaignStatus::Approved => s.approved += 1,
                CampaignStatus::Rejected => s.rejected += 1,
                CampaignStatus::Pending => s.pending += 1,
            }
        }
        s.nearest_due_date = invoices
            .iter()
            .filter_map(|i| i.user_details.payment_details.due_date)
            .filter(|d| *d > now)
            .min();
        s
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user_info: User,
    pub campaigns: Vec<Campaign>,
    pub invoices: Vec<Invoice>,
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardResponse {
    pub user_info: User,
    pub campaign: Vec<Campaign>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoices::snapshot::{
        approval_invoice,
        fixtures::{campaign, user},
    };
    use crate::store::Footer;
    use time::macros::datetime;
    use uuid::Uuid;

    fn invoice_due(owner: &User, due: Option<OffsetDateTime>) -> Invoice {
        let mut c = campaign(owner, "x");
        c.payment_details.due_date = due;
        let draft = approval_invoice("INV-1".into(), &c, owner, "c", datetime!(2024-01-01 0:00 UTC));
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: draft.invoice_number,
            campaign: draft.campaign,
            user_details: draft.user_details,
            footer: Footer {
                contact_info: "c".into(),
            },
            created_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    #[test]
    fn counts_statuses_and_picks_nearest_future_due_date() {
        let owner = user("Dev", "Anand", "dev@example.com", "DEVAN1234D");
        let mut a = campaign(&owner, "a");
        a.status = CampaignStatus::Approved;
        let mut r = campaign(&owner, "r");
        r.status = CampaignStatus::Rejected;
        let p = campaign(&owner, "p");
        let p2 = campaign(&owner, "p2");

        let now = datetime!(2024-06-01 0:00 UTC);
        let invoices = vec![
            invoice_due(&owner, Some(datetime!(2024-05-01 0:00 UTC))),
            invoice_due(&owner, Some(datetime!(2024-09-01 0:00 UTC))),
            invoice_due(&owner, Some(datetime!(2024-07-15 0:00 UTC))),
            invoice_due(&owner, None),
        ];

        let s = Summary::build(&[a, r, p, p2], &invoices, now);
        assert_eq!(s.total, 4);
        assert_eq!((s.approved, s.rejected, s.pending), (1, 1, 2));
        assert_eq!(s.total_invoices, 4);
        assert_eq!(s.nearest_due_date, Some(datetime!(2024-07-15 0:00 UTC)));
    }

    #[test]
    fn no_future_due_date_is_none() {
        let owner = user("Dev", "Anand", "dev@example.com", "DEVAN1234D");
        let invoices = vec![invoice_due(&owner, Some(datetime!(2020-01-01 0:00 UTC)))];
        let s = Summary::build(&[], &invoices, datetime!(2024-06-01 0:00 UTC));
        assert_eq!(s.nearest_due_date, None);
        assert_eq!(s.total, 0);
    }
}
