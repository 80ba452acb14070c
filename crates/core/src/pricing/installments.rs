//! Installment schedule for the remaining balance after an entry payment.
//!
//! Installment counts below `interest_free_threshold` carry no interest. From the
//! threshold on, simple interest of `interest_rate_per_installment` percent is
//! charged once per installment-with-interest, so the `n`-th option pays
//! `remaining * (1 + rate/100 * (n - threshold + 1))` spread over `n` payments.

use std::collections::BTreeSet;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::quote::{InstallmentOption, InstallmentPlan};
use crate::domain::settings::GeneralSettings;
use crate::errors::DomainError;

pub const ALLOWED_ENTRY_PERCENTS: [u32; 9] = [10, 15, 20, 25, 30, 35, 40, 45, 50];
pub const DEFAULT_SELECTION: [u32; 2] = [1, 2];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentConfig {
    pub max_installments: u32,
    pub interest_free_threshold: u32,
    pub interest_rate_per_installment: Decimal,
    pub min_installment_value: Decimal,
}

impl Default for InstallmentConfig {
    fn default() -> Self {
        Self::from(&GeneralSettings::default())
    }
}

impl From<&GeneralSettings> for InstallmentConfig {
    fn from(settings: &GeneralSettings) -> Self {
        Self {
            max_installments: settings.max_installments,
            interest_free_threshold: settings.interest_free_threshold,
            interest_rate_per_installment: settings.interest_rate_per_installment,
            min_installment_value: settings.min_installment_value,
        }
    }
}

pub fn is_allowed_entry_percent(entry_percent: Decimal) -> bool {
    ALLOWED_ENTRY_PERCENTS.iter().any(|allowed| Decimal::from(*allowed) == entry_percent)
}

/// Builds the full schedule for `1..=max_installments`.
///
/// `selected` marks the options shown on the proposal; numbers outside the
/// schedule are dropped and an empty selection falls back to 1x and 2x.
pub fn plan_installments(
    total_value: Decimal,
    entry_percent: Decimal,
    config: &InstallmentConfig,
    selected: &[u32],
) -> Result<InstallmentPlan, DomainError> {
    if total_value < Decimal::ZERO {
        return Err(DomainError::Validation("total value must not be negative".to_string()));
    }
    if !is_allowed_entry_percent(entry_percent) {
        return Err(DomainError::Validation(format!(
            "entry percent {entry_percent} is not allowed (expected one of 10, 15, ..., 50)"
        )));
    }

    let hundred = Decimal::ONE_HUNDRED;
    let entry_value = total_value * entry_percent / hundred;
    let remaining_value = total_value - entry_value;

    let options = (1..=config.max_installments)
        .map(|number| installment_option(number, remaining_value, config))
        .collect::<Vec<_>>();

    Ok(InstallmentPlan {
        entry_percent,
        entry_value: round_money(entry_value),
        remaining_value: round_money(remaining_value),
        options,
        selected: normalize_selection(selected, config.max_installments),
    })
}

fn installment_option(
    number: u32,
    remaining_value: Decimal,
    config: &InstallmentConfig,
) -> InstallmentOption {
    let has_interest = number >= config.interest_free_threshold;
    let plan_total = if has_interest {
        let periods = Decimal::from(number - config.interest_free_threshold + 1);
        remaining_value
            * (Decimal::ONE + config.interest_rate_per_installment / Decimal::ONE_HUNDRED * periods)
    } else {
        remaining_value
    };
    let value = round_money(plan_total / Decimal::from(number));

    InstallmentOption {
        installment_number: number,
        value,
        has_interest,
        rate: if has_interest { config.interest_rate_per_installment } else { Decimal::ZERO },
        plan_total: round_money(plan_total),
        below_minimum: value < config.min_installment_value,
    }
}

fn normalize_selection(selected: &[u32], max_installments: u32) -> BTreeSet<u32> {
    let in_range = |number: &u32| (1..=max_installments).contains(number);
    let chosen: BTreeSet<u32> = selected.iter().copied().filter(in_range).collect();
    if chosen.is_empty() {
        DEFAULT_SELECTION.iter().copied().filter(in_range).collect()
    } else {
        chosen
    }
}

pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
