use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use quotedesk_core::dashboard::{self, QuoteStatistics};
use quotedesk_core::diff::QuoteChanges;
use quotedesk_core::domain::client::{Client, ClientId};
use quotedesk_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use quotedesk_core::domain::settings::GeneralSettings;
use quotedesk_core::errors::{ApplicationError, DomainError};
use quotedesk_core::ports::{ClientDirectory, QuoteStore, SettingsProvider};

#[derive(Default)]
struct QuoteTable {
    quotes: HashMap<String, Quote>,
    last_sequence: u64,
}

#[derive(Default)]
pub struct InMemoryQuoteStore {
    table: RwLock<QuoteTable>,
}

impl InMemoryQuoteStore {
    async fn select(&self, keep: impl Fn(&Quote) -> bool) -> Vec<Quote> {
        let table = self.table.read().await;
        let mut quotes: Vec<Quote> =
            table.quotes.values().filter(|quote| keep(quote)).cloned().collect();
        quotes.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
        quotes
    }
}

fn missing(id: &QuoteId) -> ApplicationError {
    DomainError::not_found("quote", id.0.clone()).into()
}

#[async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn find_all(&self) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.select(|_| true).await)
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, ApplicationError> {
        let table = self.table.read().await;
        Ok(table.quotes.get(&id.0).cloned())
    }

    async fn find_by_client(&self, client_id: &ClientId) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.select(|quote| &quote.client_id == client_id).await)
    }

    async fn find_by_status(&self, status: QuoteStatus) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.select(|quote| quote.status == status).await)
    }

    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, ApplicationError> {
        Ok(self.select(|quote| quote.issue_date >= start && quote.issue_date <= end).await)
    }

    async fn create(&self, quote: Quote) -> Result<Quote, ApplicationError> {
        let mut table = self.table.write().await;
        if table.quotes.contains_key(&quote.id.0) {
            return Err(ApplicationError::Persistence(format!("quote `{}` already exists", quote.id)));
        }
        table.last_sequence = table.last_sequence.max(quote.sequence_number);
        table.quotes.insert(quote.id.0.clone(), quote.clone());
        Ok(quote)
    }

    async fn update(
        &self,
        id: &QuoteId,
        changes: &QuoteChanges,
    ) -> Result<Quote, ApplicationError> {
        let mut table = self.table.write().await;
        let quote = table.quotes.get_mut(&id.0).ok_or_else(|| missing(id))?;
        changes.clone().apply_to(quote);
        quote.updated_at = Utc::now();
        Ok(quote.clone())
    }

    async fn update_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
        accepted_date: Option<DateTime<Utc>>,
    ) -> Result<Quote, ApplicationError> {
        let mut table = self.table.write().await;
        let quote = table.quotes.get_mut(&id.0).ok_or_else(|| missing(id))?;
        quote.status = status;
        if accepted_date.is_some() {
            quote.accepted_date = accepted_date;
        }
        quote.updated_at = Utc::now();
        Ok(quote.clone())
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), ApplicationError> {
        let mut table = self.table.write().await;
        table.quotes.remove(&id.0).map(|_| ()).ok_or_else(|| missing(id))
    }

    async fn next_sequence_number(&self) -> Result<u64, ApplicationError> {
        let mut table = self.table.write().await;
        table.last_sequence += 1;
        Ok(table.last_sequence)
    }

    async fn aggregate_stats(&self) -> Result<QuoteStatistics, ApplicationError> {
        let table = self.table.read().await;
        let quotes: Vec<Quote> = table.quotes.values().cloned().collect();
        Ok(dashboard::tally(&quotes))
    }
}

#[derive(Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientDirectory {
    pub async fn insert(&self, client: Client) {
        let mut clients = self.clients.write().await;
        clients.insert(client.id.0.clone(), client);
    }

    pub async fn remove(&self, id: &ClientId) -> Option<Client> {
        let mut clients = self.clients.write().await;
        clients.remove(&id.0)
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, ApplicationError> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id.0).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Client>, ApplicationError> {
        let clients = self.clients.read().await;
        let mut all: Vec<Client> = clients.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemorySettingsProvider {
    settings: RwLock<GeneralSettings>,
}

impl InMemorySettingsProvider {
    pub fn new(settings: GeneralSettings) -> Self {
        Self { settings: RwLock::new(settings) }
    }

    pub async fn replace(&self, settings: GeneralSettings) {
        *self.settings.write().await = settings;
    }
}

#[async_trait]
impl SettingsProvider for InMemorySettingsProvider {
    async fn get(&self) -> Result<GeneralSettings, ApplicationError> {
        Ok(self.settings.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use quotedesk_core::diff::{FieldUpdate, QuoteChanges};
    use quotedesk_core::domain::client::{ClientId, ClientSnapshot};
    use quotedesk_core::domain::quote::{
        ContactOverrides, PaymentCondition, Quote, QuoteId, QuoteStatus, QuoteTotals,
    };
    use quotedesk_core::ports::QuoteStore;

    use super::InMemoryQuoteStore;

    fn quote(id: &str, sequence_number: u64, status: QuoteStatus) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId(id.to_string()),
            sequence_number,
            version: 0,
            status,
            client_id: ClientId("C-1".to_string()),
            client: ClientSnapshot::default(),
            issue_date: now,
            expiry_date: now + Duration::days(15),
            accepted_date: None,
            service_id: "svc-paint".to_string(),
            service_description: String::new(),
            items: vec![],
            limitation_ids: vec![],
            execution_deadline_days: None,
            inspection_deadline_days: None,
            payment_condition: PaymentCondition::Cash,
            installment_text: None,
            installment_plan: None,
            discount: None,
            show_detailed_values: false,
            totals: QuoteTotals { total: Decimal::from(100), ..QuoteTotals::default() },
            notes: Some("call first".to_string()),
            contacts: ContactOverrides::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn lists_newest_sequence_first() {
        let store = InMemoryQuoteStore::default();
        store.create(quote("Q-1", 1, QuoteStatus::Open)).await.expect("create");
        store.create(quote("Q-2", 2, QuoteStatus::Accepted)).await.expect("create");

        let all = store.find_all().await.expect("list");
        let sequence: Vec<u64> = all.iter().map(|q| q.sequence_number).collect();
        assert_eq!(sequence, vec![2, 1]);

        let accepted = store.find_by_status(QuoteStatus::Accepted).await.expect("filter");
        assert_eq!(accepted.len(), 1);
        assert_eq!(store.next_sequence_number().await.expect("sequence"), 3);
    }

    #[tokio::test]
    async fn update_applies_change_set() {
        let store = InMemoryQuoteStore::default();
        store.create(quote("Q-1", 1, QuoteStatus::Open)).await.expect("create");

        let changes = QuoteChanges {
            notes: FieldUpdate::Clear,
            version: Some(1),
            ..QuoteChanges::default()
        };
        let updated = store.update(&QuoteId("Q-1".to_string()), &changes).await.expect("update");

        assert_eq!(updated.notes, None);
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn missing_quote_is_not_found() {
        let store = InMemoryQuoteStore::default();
        let error = store.delete(&QuoteId("Q-404".to_string())).await.expect_err("missing");
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn aggregate_stats_tallies_by_status() {
        let store = InMemoryQuoteStore::default();
        store.create(quote("Q-1", 1, QuoteStatus::Open)).await.expect("create");
        store.create(quote("Q-2", 2, QuoteStatus::Accepted)).await.expect("create");

        let stats = store.aggregate_stats().await.expect("stats");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.accepted_value, Decimal::from(100));
        assert_eq!(stats.total_value, Decimal::from(200));
    }
}
