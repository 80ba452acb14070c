use rust_decimal::Decimal;

use crate::commands::CommandResult;
use quotedesk_core::pricing::apply_discount;

pub fn run(total: Decimal, percent: Decimal) -> CommandResult {
    if total < Decimal::ZERO {
        return CommandResult::failure("discount", "domain_rule", "total must not be negative", 6);
    }

    match apply_discount(total, percent) {
        Some(discount) => CommandResult::success_with_data(
            "discount",
            format!("{} off, {} to pay", discount.discount_value, discount.final_value),
            &discount,
        ),
        None => CommandResult::success("discount", format!("no discount, {total} to pay")),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::Value;

    use super::run;

    #[test]
    fn ten_percent_of_1500() {
        let result = run(Decimal::from(1500), Decimal::from(10));
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["message"], "150 off, 1350 to pay");
    }

    #[test]
    fn zero_percent_means_no_discount() {
        let result = run(Decimal::from(1500), Decimal::ZERO);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert!(payload.get("data").is_none());
        assert_eq!(payload["message"], "no discount, 1500 to pay");
    }
}
