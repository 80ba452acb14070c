pub mod discount;
pub mod installments;
pub mod totals;

pub use discount::apply_discount;
pub use installments::{plan_installments, InstallmentConfig, ALLOWED_ENTRY_PERCENTS};
pub use totals::{price_item, price_quote, sum_totals};
