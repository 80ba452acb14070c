use serde::Serialize;

use crate::commands::{
    open_database, quote_service, run_async, service_failure, CommandResult, Failure,
};
use quotedesk_core::domain::quote::{Quote, QuoteStatus};
use rust_decimal::Decimal;

#[derive(Debug, Serialize)]
struct QuoteRow {
    id: String,
    sequence_number: u64,
    status: QuoteStatus,
    client: String,
    service_id: String,
    issue_date: String,
    expiry_date: String,
    total: Decimal,
    version: u32,
}

impl From<&Quote> for QuoteRow {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id.0.clone(),
            sequence_number: quote.sequence_number,
            status: quote.status,
            client: quote.client.name.clone(),
            service_id: quote.service_id.clone(),
            issue_date: quote.issue_date.date_naive().to_string(),
            expiry_date: quote.expiry_date.date_naive().to_string(),
            total: quote.totals.total,
            version: quote.version,
        }
    }
}

pub fn run(status: Option<QuoteStatus>) -> CommandResult {
    run_async("quotes", |config| async move {
        let pool = open_database(&config).await?;
        let service = quote_service(&pool, &config);

        let quotes = match status {
            Some(status) => service.find_by_status(status).await,
            None => service.list().await,
        }
        .map_err(service_failure)?;
        pool.close().await;

        let rows: Vec<QuoteRow> = quotes.iter().map(QuoteRow::from).collect();
        let message = match status {
            Some(status) => format!("{} {status} quotes", rows.len()),
            None => format!("{} quotes", rows.len()),
        };
        Ok::<_, Failure>(CommandResult::success_with_data("quotes", message, &rows))
    })
}
