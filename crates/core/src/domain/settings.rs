use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Company-wide settings that drive quote expiry and installment plans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    pub validity_days: u32,
    pub max_installments: u32,
    pub min_installment_value: Decimal,
    /// Installments numbered below this threshold are interest-free.
    pub interest_free_threshold: u32,
    /// Simple interest, in percent, charged per installment at or above the threshold.
    pub interest_rate_per_installment: Decimal,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            validity_days: 15,
            max_installments: 6,
            min_installment_value: Decimal::from(1000),
            interest_free_threshold: 3,
            interest_rate_per_installment: Decimal::new(25, 1),
        }
    }
}
