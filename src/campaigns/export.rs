use anyhow::Context;
use time::{macros::format_description, OffsetDateTime};

use super::import::CAMPAIGN_HEADERS;
use crate::store::Campaign;

fn day(d: Option<OffsetDateTime>) -> String {
    d.and_then(|d| d.date().format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_default()
}

/// Renders campaigns with the same header set the importer expects.
pub fn campaigns_to_csv(campaigns: &[Campaign]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CAMPAIGN_HEADERS)?;
    for c in campaigns {
        let pay = &c.payment_details;
        wtr.write_record([
            c.campaign_name.clone(),
            c.pan.clone(),
            c.details.clone(),
            c.status.to_string(),
            day(c.date_of_approval),
            day(Some(c.upload_date)),
            pay.amount.map(|a| a.to_string()).unwrap_or_default(),
            day(pay.due_date),
            pay.status.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().context("flush csv writer")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}
