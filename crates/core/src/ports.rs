use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dashboard::QuoteStatistics;
use crate::diff::QuoteChanges;
use crate::domain::client::{Client, ClientId};
use crate::domain::quote::{Quote, QuoteId, QuoteStatus};
use crate::domain::settings::GeneralSettings;
use crate::errors::ApplicationError;

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Quote>, ApplicationError>;
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, ApplicationError>;
    async fn find_by_client(&self, client_id: &ClientId) -> Result<Vec<Quote>, ApplicationError>;
    async fn find_by_status(&self, status: QuoteStatus) -> Result<Vec<Quote>, ApplicationError>;
    /// Quotes whose issue date lies in `start..=end`.
    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, ApplicationError>;
    async fn create(&self, quote: Quote) -> Result<Quote, ApplicationError>;
    /// Writes exactly the fields carried by `changes` and stamps `updated_at`.
    async fn update(&self, id: &QuoteId, changes: &QuoteChanges)
        -> Result<Quote, ApplicationError>;
    async fn update_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
        accepted_date: Option<DateTime<Utc>>,
    ) -> Result<Quote, ApplicationError>;
    async fn delete(&self, id: &QuoteId) -> Result<(), ApplicationError>;
    async fn next_sequence_number(&self) -> Result<u64, ApplicationError>;
    async fn aggregate_stats(&self) -> Result<QuoteStatistics, ApplicationError>;
}

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, ApplicationError>;
    async fn find_all(&self) -> Result<Vec<Client>, ApplicationError>;
}

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get(&self) -> Result<GeneralSettings, ApplicationError>;
}
