//! Quote orchestration: the only place that reads and writes quotes.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dashboard::{self, DashboardStats, QuoteStatistics};
use crate::diff::{diff_quote, reprice_installment_plan, QuotePatch};
use crate::domain::client::ClientId;
use crate::domain::quote::{
    ContactOverrides, DiscountInfo, InstallmentPlan, PaymentCondition, Quote, QuoteId,
    QuoteItemDraft, QuoteStatus,
};
use crate::errors::{ApplicationError, DomainError};
use crate::lifecycle::{expiry_for, QuoteLifecycle};
use crate::notifications::NotificationBus;
use crate::ports::{ClientDirectory, QuoteStore, SettingsProvider};
use crate::pricing::discount::apply_discount;
use crate::pricing::installments::{plan_installments, InstallmentConfig};
use crate::pricing::totals::price_quote;
use crate::validation::{validate_items, validate_new_quote};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateQuote {
    pub client_id: ClientId,
    pub issue_date: Option<DateTime<Utc>>,
    /// Overrides the expiry computed from the configured validity days.
    pub expiry_date: Option<DateTime<Utc>>,
    pub service_id: String,
    pub service_description: String,
    pub items: Vec<QuoteItemDraft>,
    pub limitation_ids: Vec<String>,
    pub execution_deadline_days: Option<u32>,
    pub inspection_deadline_days: Option<u32>,
    pub payment_condition: PaymentCondition,
    pub installment_text: Option<String>,
    pub installment_plan: Option<InstallmentPlan>,
    pub discount: Option<DiscountInfo>,
    pub show_detailed_values: bool,
    pub notes: Option<String>,
    pub contacts: ContactOverrides,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryFailure {
    pub quote_id: QuoteId,
    pub error: String,
}

/// Outcome of [`QuoteService::verify_expired`]. Failures on individual quotes do
/// not stop the sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySweep {
    pub expired: Vec<QuoteId>,
    pub failures: Vec<ExpiryFailure>,
}

impl ExpirySweep {
    pub fn transitioned(&self) -> usize {
        self.expired.len()
    }
}

pub struct QuoteService {
    quotes: Arc<dyn QuoteStore>,
    clients: Arc<dyn ClientDirectory>,
    settings: Arc<dyn SettingsProvider>,
    lifecycle: QuoteLifecycle,
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteStore>,
        clients: Arc<dyn ClientDirectory>,
        settings: Arc<dyn SettingsProvider>,
        notifications: Arc<dyn NotificationBus>,
    ) -> Self {
        Self { quotes, clients, settings, lifecycle: QuoteLifecycle::new(notifications) }
    }

    pub async fn list(&self) -> Result<Vec<Quote>, ApplicationError> {
        self.quotes.find_all().await
    }

    pub async fn find_by_id(&self, id: &QuoteId) -> Result<Quote, ApplicationError> {
        self.quotes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("quote", id.0.clone()).into())
    }

    pub async fn find_by_client(&self, client_id: &ClientId) -> Result<Vec<Quote>, ApplicationError> {
        self.quotes.find_by_client(client_id).await
    }

    pub async fn find_by_status(&self, status: QuoteStatus) -> Result<Vec<Quote>, ApplicationError> {
        self.quotes.find_by_status(status).await
    }

    /// Inclusive of the whole day `end` falls on.
    pub async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, ApplicationError> {
        let end = end_of_day(end);
        if start > end {
            return Err(DomainError::Validation(
                "date range start must not be after its end".to_string(),
            )
            .into());
        }
        self.quotes.find_by_date_range(start, end).await
    }

    pub async fn create(&self, request: CreateQuote) -> Result<Quote, ApplicationError> {
        let client = self
            .clients
            .find_by_id(&request.client_id)
            .await?
            .ok_or_else(|| DomainError::not_found("client", request.client_id.0.clone()))?;
        validate_new_quote(&request.service_id, &request.items)?;

        let settings = self.settings.get().await?;
        let (items, totals) = price_quote(&request.items);
        let now = Utc::now();
        let issue_date = request.issue_date.unwrap_or(now);
        let expiry_date = request.expiry_date.unwrap_or_else(|| expiry_for(issue_date, &settings));
        let condition = request.payment_condition;
        let installment = condition == PaymentCondition::Installment;
        let installment_plan = match request.installment_plan.filter(|_| installment) {
            Some(plan) => {
                let selected: Vec<u32> = plan.selected.iter().copied().collect();
                Some(plan_installments(
                    totals.total,
                    plan.entry_percent,
                    &InstallmentConfig::from(&settings),
                    &selected,
                )?)
            }
            None => None,
        };
        let discount = match request.discount {
            Some(info) if condition == PaymentCondition::Cash => {
                apply_discount(totals.total, info.percent)
            }
            _ => None,
        };

        let sequence_number = self.quotes.next_sequence_number().await?;
        let quote = Quote {
            id: QuoteId::generate(),
            sequence_number,
            version: 0,
            status: QuoteStatus::Open,
            client_id: client.id.clone(),
            client: client.snapshot(),
            issue_date,
            expiry_date,
            accepted_date: None,
            service_id: request.service_id.trim().to_string(),
            service_description: request.service_description,
            items,
            limitation_ids: request.limitation_ids,
            execution_deadline_days: request.execution_deadline_days,
            inspection_deadline_days: request.inspection_deadline_days,
            payment_condition: condition,
            installment_text: if installment { clean_text(request.installment_text) } else { None },
            installment_plan,
            discount,
            show_detailed_values: request.show_detailed_values,
            totals,
            notes: clean_text(request.notes),
            contacts: clean_contacts(request.contacts),
            created_at: now,
            updated_at: now,
        };

        let created = self.quotes.create(quote).await?;
        info!(
            event_name = "quote.created",
            quote_id = %created.id,
            sequence_number = created.sequence_number,
            client_id = %created.client_id,
            total = %created.totals.total,
            "quote created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &QuoteId,
        mut patch: QuotePatch,
    ) -> Result<Quote, ApplicationError> {
        let current = self.find_by_id(id).await?;
        self.lifecycle.ensure_editable(&current)?;
        if let Some(items) = &patch.items {
            validate_items(items)?;
        }
        if patch.service_id.as_deref().is_some_and(|service_id| service_id.trim().is_empty()) {
            return Err(DomainError::Validation("service is required".to_string()).into());
        }

        let settings = self.settings.get().await?;
        reprice_installment_plan(&current, &mut patch, &InstallmentConfig::from(&settings))?;

        let changes = diff_quote(&current, patch);
        if changes.is_empty() {
            info!(
                event_name = "quote.update_skipped",
                quote_id = %current.id,
                version = current.version,
                "update carried no changes"
            );
            return Ok(current);
        }

        let fields = changes.changed_fields().join(",");
        let updated = self.quotes.update(id, &changes).await?;
        info!(
            event_name = "quote.updated",
            quote_id = %updated.id,
            version = updated.version,
            fields = %fields,
            "quote updated"
        );
        Ok(updated)
    }

    pub async fn transition_status(
        &self,
        id: &QuoteId,
        target: QuoteStatus,
    ) -> Result<Quote, ApplicationError> {
        let current = self.find_by_id(id).await?;
        let change = self.lifecycle.plan_transition(&current, target, Utc::now())?;

        let updated =
            self.quotes.update_status(&change.quote_id, change.next, change.accepted_date).await?;
        self.lifecycle.announce(&change);
        info!(
            event_name = "quote.status_changed",
            quote_id = %updated.id,
            previous_status = %change.previous,
            new_status = %change.next,
            "quote status changed"
        );
        Ok(updated)
    }

    pub async fn delete(&self, id: &QuoteId) -> Result<(), ApplicationError> {
        let current = self.find_by_id(id).await?;
        self.lifecycle.ensure_deletable(&current)?;

        self.quotes.delete(id).await?;
        info!(event_name = "quote.deleted", quote_id = %id, "quote deleted");
        Ok(())
    }

    pub async fn duplicate(&self, id: &QuoteId) -> Result<Quote, ApplicationError> {
        let source = self.find_by_id(id).await?;
        // A vanished client means the source is stale, not that the request is wrong.
        let client = self.clients.find_by_id(&source.client_id).await?.ok_or_else(|| {
            DomainError::Validation(format!(
                "client {} of quote {} no longer exists",
                source.client_id, source.sequence_number
            ))
        })?;

        let settings = self.settings.get().await?;
        let sequence_number = self.quotes.next_sequence_number().await?;
        let copy =
            self.lifecycle.duplicate(&source, &client, sequence_number, &settings, Utc::now());

        let created = self.quotes.create(copy).await?;
        info!(
            event_name = "quote.duplicated",
            quote_id = %created.id,
            source_quote_id = %source.id,
            sequence_number = created.sequence_number,
            "quote duplicated"
        );
        Ok(created)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApplicationError> {
        let quotes = self.quotes.find_all().await?;
        let client_count = self.clients.find_all().await?.len() as u64;
        Ok(dashboard::aggregate(&quotes, client_count, Utc::now()))
    }

    pub async fn statistics(&self) -> Result<QuoteStatistics, ApplicationError> {
        self.quotes.aggregate_stats().await
    }

    /// Moves every open quote past its expiry date to `expired`, one write per
    /// quote. A failing quote is recorded and the sweep carries on.
    pub async fn verify_expired(&self) -> Result<ExpirySweep, ApplicationError> {
        let now = Utc::now();
        let candidates = self.quotes.find_by_status(QuoteStatus::Open).await?;
        let mut sweep = ExpirySweep::default();

        for quote in candidates.into_iter().filter(|quote| quote.is_expired_at(now)) {
            match self.transition_status(&quote.id, QuoteStatus::Expired).await {
                Ok(expired) => sweep.expired.push(expired.id),
                Err(error) => {
                    warn!(
                        event_name = "quote.expiry_sweep.failed",
                        quote_id = %quote.id,
                        error = %error,
                        "could not expire quote"
                    );
                    sweep.failures.push(ExpiryFailure { quote_id: quote.id, error: error.to_string() });
                }
            }
        }

        info!(
            event_name = "quote.expiry_sweep.completed",
            expired = sweep.transitioned() as u64,
            failed = sweep.failures.len() as u64,
            "expiry sweep finished"
        );
        Ok(sweep)
    }
}

pub fn end_of_day(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .date_naive()
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(value)
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

fn clean_contacts(contacts: ContactOverrides) -> ContactOverrides {
    ContactOverrides {
        consultant: clean_text(contacts.consultant),
        contact: clean_text(contacts.contact),
        email: clean_text(contacts.email),
        phone: clean_text(contacts.phone),
        service_address: clean_text(contacts.service_address),
    }
}
