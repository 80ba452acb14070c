use rust_decimal::Decimal;

use crate::commands::{load_config, CommandResult};
use quotedesk_core::pricing::{plan_installments, InstallmentConfig};

/// Computes a plan from configured defaults; stored settings are not consulted.
pub fn run(total: Decimal, entry_percent: Decimal, selected: &[u32]) -> CommandResult {
    let config = match load_config("installments") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let settings = config.quotes.general_settings();

    match plan_installments(total, entry_percent, &InstallmentConfig::from(&settings), selected) {
        Ok(plan) => {
            let message = format!(
                "entry {} then up to {} installments over {}",
                plan.entry_value,
                plan.options.len(),
                plan.remaining_value
            );
            CommandResult::success_with_data("installments", message, &plan)
        }
        Err(error) => CommandResult::failure("installments", "domain_rule", error.to_string(), 6),
    }
}
