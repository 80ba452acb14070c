pub mod config;
pub mod dashboard;
pub mod diff;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod notifications;
pub mod ports;
pub mod pricing;
pub mod service;
pub mod validation;

pub use dashboard::{DashboardStats, MonthStats, QuoteStatistics, StatusBreakdown, StatusTally};
pub use diff::{diff_quote, FieldUpdate, QuoteChanges, QuotePatch};
pub use domain::client::{Client, ClientId, ClientSnapshot, PersonType};
pub use domain::quote::{
    ContactOverrides, DiscountInfo, InstallmentOption, InstallmentPlan, PaymentCondition, Quote,
    QuoteId, QuoteItem, QuoteItemDraft, QuoteStatus, QuoteTotals,
};
pub use domain::settings::GeneralSettings;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lifecycle::{can_transition, QuoteLifecycle, StatusChange};
pub use notifications::{NotificationBus, StatusChangedEvent};
pub use ports::{ClientDirectory, QuoteStore, SettingsProvider};
pub use service::{CreateQuote, ExpiryFailure, ExpirySweep, QuoteService};
