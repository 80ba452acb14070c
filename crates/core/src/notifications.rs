use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::quote::{QuoteId, QuoteStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub event_id: String,
    pub quote_id: QuoteId,
    pub previous_status: QuoteStatus,
    pub new_status: QuoteStatus,
    pub occurred_at: DateTime<Utc>,
}

impl StatusChangedEvent {
    pub fn new(quote_id: QuoteId, previous_status: QuoteStatus, new_status: QuoteStatus) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            quote_id,
            previous_status,
            new_status,
            occurred_at: Utc::now(),
        }
    }
}

/// Outbound port for status-change notifications. Publishing never blocks and
/// never reports failure back to the quote engine.
pub trait NotificationBus: Send + Sync {
    fn publish(&self, event: StatusChangedEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationBus {
    events: Arc<Mutex<Vec<StatusChangedEvent>>>,
}

impl InMemoryNotificationBus {
    pub fn events(&self) -> Vec<StatusChangedEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationBus for InMemoryNotificationBus {
    fn publish(&self, event: StatusChangedEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards events to a subscriber task over an unbounded channel.
#[derive(Clone)]
pub struct ChannelNotificationBus {
    sender: mpsc::UnboundedSender<StatusChangedEvent>,
}

impl ChannelNotificationBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusChangedEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationBus for ChannelNotificationBus {
    fn publish(&self, event: StatusChangedEvent) {
        if let Err(error) = self.sender.send(event) {
            tracing::warn!(
                event_name = "quote.notification.dropped",
                quote_id = %error.0.quote_id,
                "no subscriber for status change notification"
            );
        }
    }
}

/// Logs each event; used when no real delivery channel is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationBus;

impl NotificationBus for TracingNotificationBus {
    fn publish(&self, event: StatusChangedEvent) {
        tracing::info!(
            event_name = "quote.notification.published",
            quote_id = %event.quote_id,
            previous_status = %event.previous_status,
            new_status = %event.new_status,
            "quote status change notification"
        );
    }
}
