use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::{ClientId, ClientSnapshot};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Open,
    Accepted,
    Declined,
    Expired,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] =
        [QuoteStatus::Open, QuoteStatus::Accepted, QuoteStatus::Declined, QuoteStatus::Expired];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "expired" => Ok(Self::Expired),
            other => Err(DomainError::Validation(format!(
                "unknown quote status `{other}` (expected open|accepted|declined|expired)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCondition {
    #[default]
    Cash,
    Negotiate,
    Installment,
}

impl PaymentCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Negotiate => "negotiate",
            Self::Installment => "installment",
        }
    }
}

impl std::str::FromStr for PaymentCondition {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "negotiate" => Ok(Self::Negotiate),
            "installment" => Ok(Self::Installment),
            other => Err(DomainError::Validation(format!(
                "unknown payment condition `{other}` (expected cash|negotiate|installment)"
            ))),
        }
    }
}

/// A line item as submitted by a caller. Totals are never accepted from input;
/// [`crate::pricing::totals::price_item`] turns a draft into a [`QuoteItem`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteItemDraft {
    pub category_id: String,
    pub category_name: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_labor_price: Decimal,
    pub unit_material_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub category_id: String,
    pub category_name: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_labor_price: Decimal,
    pub unit_material_price: Decimal,
    pub labor_total: Decimal,
    pub material_total: Decimal,
    pub total: Decimal,
}

impl QuoteItem {
    pub fn to_draft(&self) -> QuoteItemDraft {
        QuoteItemDraft {
            category_id: self.category_id.clone(),
            category_name: self.category_name.clone(),
            description: self.description.clone(),
            unit: self.unit.clone(),
            quantity: self.quantity,
            unit_labor_price: self.unit_labor_price,
            unit_material_price: self.unit_material_price,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub labor: Decimal,
    pub material: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentOption {
    pub installment_number: u32,
    pub value: Decimal,
    pub has_interest: bool,
    pub rate: Decimal,
    pub plan_total: Decimal,
    pub below_minimum: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub entry_percent: Decimal,
    pub entry_value: Decimal,
    pub remaining_value: Decimal,
    pub options: Vec<InstallmentOption>,
    pub selected: BTreeSet<u32>,
}

impl InstallmentPlan {
    pub fn selected_options(&self) -> impl Iterator<Item = &InstallmentOption> {
        self.options.iter().filter(|option| self.selected.contains(&option.installment_number))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountInfo {
    pub percent: Decimal,
    pub discount_value: Decimal,
    pub final_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub sequence_number: u64,
    pub version: u32,
    pub status: QuoteStatus,
    pub client_id: ClientId,
    pub client: ClientSnapshot,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub accepted_date: Option<DateTime<Utc>>,
    pub service_id: String,
    pub service_description: String,
    pub items: Vec<QuoteItem>,
    pub limitation_ids: Vec<String>,
    pub execution_deadline_days: Option<u32>,
    pub inspection_deadline_days: Option<u32>,
    pub payment_condition: PaymentCondition,
    pub installment_text: Option<String>,
    pub installment_plan: Option<InstallmentPlan>,
    pub discount: Option<DiscountInfo>,
    pub show_detailed_values: bool,
    pub totals: QuoteTotals,
    pub notes: Option<String>,
    pub contacts: ContactOverrides,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == QuoteStatus::Open && self.expiry_date < now
    }
}

/// Per-quote overrides of the consultant and contact details printed on the proposal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactOverrides {
    pub consultant: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_address: Option<String>,
}
