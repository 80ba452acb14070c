use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::client::Client;
use crate::domain::quote::{Quote, QuoteId, QuoteStatus};
use crate::domain::settings::GeneralSettings;
use crate::errors::DomainError;
use crate::notifications::{NotificationBus, StatusChangedEvent};

pub fn can_transition(from: QuoteStatus, to: QuoteStatus) -> bool {
    use QuoteStatus::{Accepted, Declined, Expired, Open};

    matches!(
        (from, to),
        (Open, Accepted)
            | (Open, Declined)
            | (Open, Expired)
            | (Accepted, Open)
            | (Declined, Open)
            | (Expired, Open)
    )
}

/// A validated status transition, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub quote_id: QuoteId,
    pub previous: QuoteStatus,
    pub next: QuoteStatus,
    /// Set only when entering `accepted`; `None` leaves the stored date untouched.
    pub accepted_date: Option<DateTime<Utc>>,
}

pub fn expiry_for(issue_date: DateTime<Utc>, settings: &GeneralSettings) -> DateTime<Utc> {
    issue_date + Duration::days(i64::from(settings.validity_days))
}

pub struct QuoteLifecycle {
    notifications: Arc<dyn NotificationBus>,
}

impl QuoteLifecycle {
    pub fn new(notifications: Arc<dyn NotificationBus>) -> Self {
        Self { notifications }
    }

    pub fn plan_transition(
        &self,
        quote: &Quote,
        target: QuoteStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, DomainError> {
        if !can_transition(quote.status, target) {
            return Err(DomainError::InvalidQuoteTransition { from: quote.status, to: target });
        }

        Ok(StatusChange {
            quote_id: quote.id.clone(),
            previous: quote.status,
            next: target,
            accepted_date: (target == QuoteStatus::Accepted).then_some(now),
        })
    }

    /// Publishes the status-changed event for an already persisted transition.
    pub fn announce(&self, change: &StatusChange) {
        self.notifications.publish(StatusChangedEvent::new(
            change.quote_id.clone(),
            change.previous,
            change.next,
        ));
    }

    pub fn ensure_editable(&self, quote: &Quote) -> Result<(), DomainError> {
        if quote.status != QuoteStatus::Open {
            return Err(DomainError::Validation(format!(
                "quote {} cannot be edited while {}; reopen it first",
                quote.sequence_number, quote.status
            )));
        }
        Ok(())
    }

    pub fn ensure_deletable(&self, quote: &Quote) -> Result<(), DomainError> {
        if quote.status == QuoteStatus::Accepted {
            return Err(DomainError::Validation(format!(
                "quote {} is accepted and cannot be deleted",
                quote.sequence_number
            )));
        }
        Ok(())
    }

    /// Clones `source` into a fresh open quote. Items, pricing and contact
    /// overrides are copied; identity, status, version and dates are reset and the
    /// client snapshot is refreshed from `client`.
    pub fn duplicate(
        &self,
        source: &Quote,
        client: &Client,
        sequence_number: u64,
        settings: &GeneralSettings,
        now: DateTime<Utc>,
    ) -> Quote {
        Quote {
            id: QuoteId::generate(),
            sequence_number,
            version: 0,
            status: QuoteStatus::Open,
            client_id: client.id.clone(),
            client: client.snapshot(),
            issue_date: now,
            expiry_date: expiry_for(now, settings),
            accepted_date: None,
            service_id: source.service_id.clone(),
            service_description: source.service_description.clone(),
            items: source.items.clone(),
            limitation_ids: source.limitation_ids.clone(),
            execution_deadline_days: source.execution_deadline_days,
            inspection_deadline_days: source.inspection_deadline_days,
            payment_condition: source.payment_condition,
            installment_text: source.installment_text.clone(),
            installment_plan: source.installment_plan.clone(),
            discount: source.discount,
            show_detailed_values: source.show_detailed_values,
            totals: source.totals,
            notes: source.notes.clone(),
            contacts: source.contacts.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
