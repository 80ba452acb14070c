//! Diff-gated quote updates.
//!
//! An incoming [`QuotePatch`] is compared field by field against the stored
//! [`Quote`]. Only fields whose value actually differs end up in the outgoing
//! [`QuoteChanges`], and the version is bumped only when that set is non-empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::quote::{
    ContactOverrides, DiscountInfo, InstallmentOption, InstallmentPlan, PaymentCondition, Quote,
    QuoteItem, QuoteItemDraft, QuoteTotals,
};
use crate::errors::DomainError;
use crate::pricing::discount::apply_discount;
use crate::pricing::installments::{plan_installments, InstallmentConfig};
use crate::pricing::totals::price_quote;

/// Explicit intent for an optional field inside a partial update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum FieldUpdate<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    pub fn apply(self, target: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *target = Some(value),
            Self::Clear => *target = None,
        }
    }
}

impl FieldUpdate<String> {
    /// Maps form-style text input: absent is a no-op, blank clears, anything
    /// else is set trimmed.
    pub fn from_text(value: Option<&str>) -> Self {
        match value {
            None => Self::Keep,
            Some(text) => Self::Set(text.to_string()).trimmed(),
        }
    }

    fn trimmed(self) -> Self {
        match self {
            Self::Set(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Self::Clear
                } else {
                    Self::Set(text.to_string())
                }
            }
            other => other,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotePatch {
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub service_id: Option<String>,
    pub service_description: Option<String>,
    pub items: Option<Vec<QuoteItemDraft>>,
    pub limitation_ids: Option<Vec<String>>,
    pub execution_deadline_days: FieldUpdate<u32>,
    pub inspection_deadline_days: FieldUpdate<u32>,
    pub payment_condition: Option<PaymentCondition>,
    pub installment_text: FieldUpdate<String>,
    pub installment_plan: FieldUpdate<InstallmentPlan>,
    pub discount: FieldUpdate<DiscountInfo>,
    pub show_detailed_values: Option<bool>,
    pub notes: FieldUpdate<String>,
    pub consultant: FieldUpdate<String>,
    pub contact: FieldUpdate<String>,
    pub email: FieldUpdate<String>,
    pub phone: FieldUpdate<String>,
    pub service_address: FieldUpdate<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemsChange {
    pub items: Vec<QuoteItem>,
    pub totals: QuoteTotals,
}

/// The minimal set of writes produced by [`diff_quote`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteChanges {
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub service_id: Option<String>,
    pub service_description: Option<String>,
    pub items: Option<ItemsChange>,
    pub limitation_ids: Option<Vec<String>>,
    pub execution_deadline_days: FieldUpdate<u32>,
    pub inspection_deadline_days: FieldUpdate<u32>,
    pub payment_condition: Option<PaymentCondition>,
    pub installment_text: FieldUpdate<String>,
    pub installment_plan: FieldUpdate<InstallmentPlan>,
    pub discount: FieldUpdate<DiscountInfo>,
    pub show_detailed_values: Option<bool>,
    pub notes: FieldUpdate<String>,
    pub consultant: FieldUpdate<String>,
    pub contact: FieldUpdate<String>,
    pub email: FieldUpdate<String>,
    pub phone: FieldUpdate<String>,
    pub service_address: FieldUpdate<String>,
    pub version: Option<u32>,
}

impl QuoteChanges {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this change set writes, excluding `version`.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |changed: bool, name: &'static str| {
            if changed {
                fields.push(name);
            }
        };

        mark(self.issue_date.is_some(), "issue_date");
        mark(self.expiry_date.is_some(), "expiry_date");
        mark(self.service_id.is_some(), "service_id");
        mark(self.service_description.is_some(), "service_description");
        mark(self.items.is_some(), "items");
        mark(self.limitation_ids.is_some(), "limitation_ids");
        mark(!self.execution_deadline_days.is_keep(), "execution_deadline_days");
        mark(!self.inspection_deadline_days.is_keep(), "inspection_deadline_days");
        mark(self.payment_condition.is_some(), "payment_condition");
        mark(!self.installment_text.is_keep(), "installment_text");
        mark(!self.installment_plan.is_keep(), "installment_plan");
        mark(!self.discount.is_keep(), "discount");
        mark(self.show_detailed_values.is_some(), "show_detailed_values");
        mark(!self.notes.is_keep(), "notes");
        mark(!self.consultant.is_keep(), "consultant");
        mark(!self.contact.is_keep(), "contact");
        mark(!self.email.is_keep(), "email");
        mark(!self.phone.is_keep(), "phone");
        mark(!self.service_address.is_keep(), "service_address");
        fields
    }

    /// Applies the change set in place. `updated_at` is left to the caller.
    pub fn apply_to(self, quote: &mut Quote) {
        if let Some(issue_date) = self.issue_date {
            quote.issue_date = issue_date;
        }
        if let Some(expiry_date) = self.expiry_date {
            quote.expiry_date = expiry_date;
        }
        if let Some(service_id) = self.service_id {
            quote.service_id = service_id;
        }
        if let Some(service_description) = self.service_description {
            quote.service_description = service_description;
        }
        if let Some(change) = self.items {
            quote.items = change.items;
            quote.totals = change.totals;
        }
        if let Some(limitation_ids) = self.limitation_ids {
            quote.limitation_ids = limitation_ids;
        }
        self.execution_deadline_days.apply(&mut quote.execution_deadline_days);
        self.inspection_deadline_days.apply(&mut quote.inspection_deadline_days);
        if let Some(payment_condition) = self.payment_condition {
            quote.payment_condition = payment_condition;
        }
        self.installment_text.apply(&mut quote.installment_text);
        self.installment_plan.apply(&mut quote.installment_plan);
        self.discount.apply(&mut quote.discount);
        if let Some(show_detailed_values) = self.show_detailed_values {
            quote.show_detailed_values = show_detailed_values;
        }
        self.notes.apply(&mut quote.notes);
        self.consultant.apply(&mut quote.contacts.consultant);
        self.contact.apply(&mut quote.contacts.contact);
        self.email.apply(&mut quote.contacts.email);
        self.phone.apply(&mut quote.contacts.phone);
        self.service_address.apply(&mut quote.contacts.service_address);
        if let Some(version) = self.version {
            quote.version = version;
        }
    }
}

/// Computes the writes needed to move `current` towards `patch`.
///
/// The returned change set carries `version = current.version + 1` exactly when
/// at least one field differs; otherwise it is empty and must not be persisted.
pub fn diff_quote(current: &Quote, patch: QuotePatch) -> QuoteChanges {
    let mut changes = QuoteChanges {
        issue_date: changed_value(&current.issue_date, patch.issue_date, dates_equal),
        expiry_date: changed_value(&current.expiry_date, patch.expiry_date, dates_equal),
        service_id: changed_value(&current.service_id, patch.service_id, |a, b| a == b),
        service_description: changed_value(
            &current.service_description,
            patch.service_description,
            |a, b| a == b,
        ),
        limitation_ids: changed_value(&current.limitation_ids, patch.limitation_ids, |a, b| {
            strings_equal(a, b)
        }),
        show_detailed_values: changed_value(
            &current.show_detailed_values,
            patch.show_detailed_values,
            |a, b| a == b,
        ),
        execution_deadline_days: changed_optional(
            current.execution_deadline_days.as_ref(),
            patch.execution_deadline_days,
            |a, b| a == b,
        ),
        inspection_deadline_days: changed_optional(
            current.inspection_deadline_days.as_ref(),
            patch.inspection_deadline_days,
            |a, b| a == b,
        ),
        ..QuoteChanges::default()
    };

    if let Some(drafts) = patch.items {
        let (items, totals) = price_quote(&drafts);
        if !items_equal(&items, &current.items) {
            changes.items = Some(ItemsChange { items, totals });
        }
    }

    let condition = patch.payment_condition.unwrap_or(current.payment_condition);
    changes.payment_condition =
        changed_value(&current.payment_condition, Some(condition), |a, b| a == b);

    let (installment_text, installment_plan) = if condition == PaymentCondition::Installment {
        (patch.installment_text.trimmed(), patch.installment_plan)
    } else {
        (FieldUpdate::Clear, FieldUpdate::Clear)
    };
    changes.installment_text =
        changed_optional(current.installment_text.as_ref(), installment_text, |a, b| a == b);
    changes.installment_plan =
        changed_optional(current.installment_plan.as_ref(), installment_plan, plans_equal);

    // Only the percent is taken from the caller; values follow the current total.
    let total = changes.items.as_ref().map_or(current.totals.total, |change| change.totals.total);
    let discount = if condition == PaymentCondition::Cash {
        match patch.discount {
            FieldUpdate::Set(info) => {
                apply_discount(total, info.percent).map_or(FieldUpdate::Clear, FieldUpdate::Set)
            }
            FieldUpdate::Keep if changes.items.is_some() => current
                .discount
                .as_ref()
                .and_then(|info| apply_discount(total, info.percent))
                .map_or(FieldUpdate::Keep, FieldUpdate::Set),
            other => other,
        }
    } else {
        FieldUpdate::Clear
    };
    changes.discount = changed_optional(current.discount.as_ref(), discount, discounts_equal);

    changes.notes = changed_text(current.notes.as_ref(), patch.notes);
    let contacts: &ContactOverrides = &current.contacts;
    changes.consultant = changed_text(contacts.consultant.as_ref(), patch.consultant);
    changes.contact = changed_text(contacts.contact.as_ref(), patch.contact);
    changes.email = changed_text(contacts.email.as_ref(), patch.email);
    changes.phone = changed_text(contacts.phone.as_ref(), patch.phone);
    changes.service_address =
        changed_text(contacts.service_address.as_ref(), patch.service_address);

    if !changes.is_empty() {
        changes.version = Some(current.version + 1);
    }
    changes
}

/// Rebuilds the installment plan a patch would leave on `current` so it matches
/// the total after the patch. A plan sent by the caller contributes only its entry
/// percent and selection; a stored plan is rebuilt when the items move the total.
pub fn reprice_installment_plan(
    current: &Quote,
    patch: &mut QuotePatch,
    config: &InstallmentConfig,
) -> Result<(), DomainError> {
    let condition = patch.payment_condition.unwrap_or(current.payment_condition);
    if condition != PaymentCondition::Installment {
        return Ok(());
    }

    let total = match &patch.items {
        Some(drafts) => price_quote(drafts).1.total,
        None => current.totals.total,
    };
    let base = match &patch.installment_plan {
        FieldUpdate::Set(plan) => Some(plan),
        FieldUpdate::Keep if total != current.totals.total => current.installment_plan.as_ref(),
        _ => None,
    };
    let rebuilt = match base {
        Some(plan) => {
            let selected: Vec<u32> = plan.selected.iter().copied().collect();
            Some(plan_installments(total, plan.entry_percent, config, &selected)?)
        }
        None => None,
    };

    if let Some(plan) = rebuilt {
        patch.installment_plan = FieldUpdate::Set(plan);
    }
    Ok(())
}

fn changed_value<T>(current: &T, incoming: Option<T>, eq: impl Fn(&T, &T) -> bool) -> Option<T> {
    incoming.filter(|value| !eq(current, value))
}

fn changed_optional<T>(
    current: Option<&T>,
    incoming: FieldUpdate<T>,
    eq: impl Fn(&T, &T) -> bool,
) -> FieldUpdate<T> {
    match incoming {
        FieldUpdate::Keep => FieldUpdate::Keep,
        FieldUpdate::Clear if current.is_none() => FieldUpdate::Keep,
        FieldUpdate::Clear => FieldUpdate::Clear,
        FieldUpdate::Set(value) => {
            if optional_equal(current, Some(&value), &eq) {
                FieldUpdate::Keep
            } else {
                FieldUpdate::Set(value)
            }
        }
    }
}

fn changed_text(current: Option<&String>, incoming: FieldUpdate<String>) -> FieldUpdate<String> {
    changed_optional(current, incoming.trimmed(), |a, b| a == b)
}

pub fn optional_equal<T>(a: Option<&T>, b: Option<&T>, eq: impl Fn(&T, &T) -> bool) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => eq(a, b),
        _ => false,
    }
}

pub fn dates_equal(a: &DateTime<Utc>, b: &DateTime<Utc>) -> bool {
    a.timestamp() == b.timestamp() && a.timestamp_subsec_nanos() == b.timestamp_subsec_nanos()
}

pub fn strings_equal(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a == b)
}

pub fn item_equal(a: &QuoteItem, b: &QuoteItem) -> bool {
    a.category_id == b.category_id
        && a.category_name == b.category_name
        && a.description == b.description
        && a.unit == b.unit
        && a.quantity == b.quantity
        && a.unit_labor_price == b.unit_labor_price
        && a.unit_material_price == b.unit_material_price
        && a.labor_total == b.labor_total
        && a.material_total == b.material_total
        && a.total == b.total
}

pub fn items_equal(a: &[QuoteItem], b: &[QuoteItem]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| item_equal(a, b))
}

fn option_equal(a: &InstallmentOption, b: &InstallmentOption) -> bool {
    a.installment_number == b.installment_number
        && a.value == b.value
        && a.has_interest == b.has_interest
        && a.rate == b.rate
        && a.plan_total == b.plan_total
        && a.below_minimum == b.below_minimum
}

pub fn plans_equal(a: &InstallmentPlan, b: &InstallmentPlan) -> bool {
    a.entry_percent == b.entry_percent
        && a.entry_value == b.entry_value
        && a.remaining_value == b.remaining_value
        && a.options.len() == b.options.len()
        && a.options.iter().zip(&b.options).all(|(a, b)| option_equal(a, b))
        && a.selected == b.selected
}

pub fn discounts_equal(a: &DiscountInfo, b: &DiscountInfo) -> bool {
    a.percent == b.percent && a.discount_value == b.discount_value && a.final_value == b.final_value
}
