use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    error::AppResult,
    imports::{CsvRow, CsvTable, ImportReport, RowPolicy, RowSink},
    state::AppState,
    store::{CampaignStatus, NewCampaign, PaymentDetails, PaymentStatus},
    validation::{is_valid_pan, non_blank, parse_amount, parse_date},
};

pub const CAMPAIGN_HEADERS: &[&str] = &[
    "CampaignName",
    "PAN",
    "Details",
    "Status",
    "DateOfApproval",
    "UploadDate",
    "Amount",
    "DueDate",
    "PaymentStatus",
];

/// Blank, `Applied` and anything else unrecognised become `Pending`.
fn campaign_status(raw: &str) -> CampaignStatus {
    match raw.parse::<CampaignStatus>() {
        Ok(s) => s,
        Err(_) => {
            if !raw.is_empty() {
                debug!(status = raw, "unrecognised campaign status, using Pending");
            }
            CampaignStatus::Pending
        }
    }
}

fn payment_status(raw: &str) -> Result<PaymentStatus, String> {
    match non_blank(raw) {
        None => Ok(PaymentStatus::Pending),
        Some(v) => v
            .parse()
            .map_err(|_| format!("Invalid payment status: {v}")),
    }
}

/// Converts one row into a campaign owned by `owner`, or the reason it was
/// rejected.
pub fn campaign_from_row(row: &CsvRow<'_>, owner: Uuid) -> Result<NewCampaign, String> {
    let (Some(name), Some(pan)) = (non_blank(row.get("CampaignName")), non_blank(row.get("PAN")))
    else {
        return Err("Missing mandatory fields".into());
    };
    if !is_valid_pan(pan) {
        return Err(format!("Invalid PAN Card Number: {pan}"));
    }

    Ok(NewCampaign {
        user_id: owner,
        campaign_name: name.to_string(),
        details: row.get("Details").to_string(),
        pan: pan.to_string(),
        status: campaign_status(row.get("Status")),
        date_of_approval: parse_date(row.get("DateOfApproval"))?,
        payment_details: PaymentDetails {
            amount: parse_amount(row.get("Amount"))?,
            due_date: parse_date(row.get("DueDate"))?,
            status: payment_status(row.get("PaymentStatus"))?,
        },
        upload_date: parse_date(row.get("UploadDate"))?,
    })
}

/// Validates every row in file order, then inserts the accepted campaigns
/// as one batch. Under [`RowPolicy::Abort`] a single bad row means nothing
/// is inserted.
#[instrument(skip(st, table), fields(rows = table.len()))]
pub async fn import_campaigns(
    st: &AppState,
    table: &CsvTable,
    owner: Uuid,
    policy: RowPolicy,
) -> AppResult<ImportReport> {
    let mut sink = RowSink::new(policy);
    for row in table.rows() {
        match campaign_from_row(&row, owner) {
            Ok(c) => sink.accept(c),
            Err(reason) => sink.reject(row.line(), reason)?,
        }
    }
    let (batch, skipped) = sink.finish();

    let inserted = if batch.is_empty() {
        0
    } else {
        st.store.insert_campaigns(batch).await?.len()
    };

    info!(%owner, inserted, skipped = skipped.len(), "campaign csv imported");
    Ok(ImportReport {
        message: "Campaign data uploaded successfully.".into(),
        inserted,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{error::AppError, store::memory::MemoryStore};
    use time::macros::datetime;

    const HEADER: &str =
        "CampaignName,PAN,Details,Status,DateOfApproval,UploadDate,Amount,DueDate,PaymentStatus";

    fn table(body: &str) -> CsvTable {
        CsvTable::read(format!("{HEADER}\n{body}").as_bytes(), CAMPAIGN_HEADERS).unwrap()
    }

    fn setup() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AppState::with_store(store.clone()), store)
    }

    const MIXED: &str = "\
Spring,ABCDE1234F,flyers,,,,100,,\n\
Broken,abcde1234f,bad pan,,,,,,\n\
Summer,ABCDE1234F,radio,Approved,,,,,Paid\n\
,ABCDE1234F,no name,,,,,,\n\
Autumn,ABCDE1234F,print,Applied,,,,,\n";

    #[test]
    fn row_conversion_fills_defaults() {
        let t = table("Spring,ABCDE1234F,,Applied,,2024-02-01,99.5,15/03/2024,\n");
        let owner = Uuid::new_v4();
        let row = t.rows().next().unwrap();
        let c = campaign_from_row(&row, owner).unwrap();
        assert_eq!(c.user_id, owner);
        assert_eq!(c.details, "");
        assert_eq!(c.status, CampaignStatus::Pending);
        assert_eq!(c.upload_date, Some(datetime!(2024-02-01 0:00 UTC)));
        assert_eq!(c.payment_details.amount, Some(99.5));
        assert_eq!(c.payment_details.due_date, Some(datetime!(2024-03-15 0:00 UTC)));
        assert_eq!(c.payment_details.status, PaymentStatus::Pending);
        assert_eq!(c.date_of_approval, None);
    }

    #[test]
    fn row_conversion_rejects_bad_cells() {
        let t = table(
            "A,ABCDE1234F,,,,,lots,,\n\
             B,ABCDE1234F,,,,,,someday,\n\
             C,ABCDE1234F,,,,,,,Overdue\n\
             D,,,,,,,,\n",
        );
        let reasons: Vec<String> = t
            .rows()
            .map(|r| campaign_from_row(&r, Uuid::new_v4()).unwrap_err())
            .collect();
        assert_eq!(reasons[0], "Invalid amount: lots");
        assert_eq!(reasons[1], "Invalid date: someday");
        assert_eq!(reasons[2], "Invalid payment status: Overdue");
        assert_eq!(reasons[3], "Missing mandatory fields");
    }

    #[tokio::test]
    async fn abort_policy_inserts_nothing_when_any_row_is_bad() {
        let (st, store) = setup();
        let err = import_campaigns(&st, &table(MIXED), Uuid::new_v4(), RowPolicy::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Row 3: Invalid PAN Card Number: abcde1234f");
        assert_eq!(store.campaign_count(), 0);
    }

    #[tokio::test]
    async fn skip_policy_inserts_exactly_the_valid_rows() {
        let (st, store) = setup();
        let owner = Uuid::new_v4();
        let report = import_campaigns(&st, &table(MIXED), owner, RowPolicy::Skip)
            .await
            .unwrap();
        assert_eq!(report.inserted, 3);
        let lines: Vec<u64> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 5]);
        assert_eq!(store.campaign_count(), 3);

        let stored = st.store.list_campaigns(Some(owner)).await.unwrap();
        let mut names: Vec<_> = stored.iter().map(|c| c.campaign_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Autumn", "Spring", "Summer"]);
        let summer = stored.iter().find(|c| c.campaign_name == "Summer").unwrap();
        assert_eq!(summer.status, CampaignStatus::Approved);
        assert_eq!(summer.payment_details.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn skip_policy_is_deterministic() {
        let (st, _) = setup();
        let a = import_campaigns(&st, &table(MIXED), Uuid::new_v4(), RowPolicy::Skip)
            .await
            .unwrap();
        let b = import_campaigns(&st, &table(MIXED), Uuid::new_v4(), RowPolicy::Skip)
            .await
            .unwrap();
        assert_eq!(a.inserted, b.inserted);
        assert_eq!(a.skipped, b.skipped);
    }

    #[tokio::test]
    async fn store_failure_is_internal_and_commits_nothing() {
        let (st, store) = setup();
        store.fail_writes();
        let err = import_campaigns(
            &st,
            &table("Spring,ABCDE1234F,,,,,,,\n"),
            Uuid::new_v4(),
            RowPolicy::Abort,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.campaign_count(), 0);
    }
}
