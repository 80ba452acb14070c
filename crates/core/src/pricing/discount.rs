use rust_decimal::Decimal;

use crate::domain::quote::DiscountInfo;
use crate::pricing::installments::round_money;

/// Cash discount over `total_value`. The percent is clamped to `0..=100` and a
/// zero percent means the quote carries no discount at all.
pub fn apply_discount(total_value: Decimal, percent: Decimal) -> Option<DiscountInfo> {
    let percent = percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    if percent.is_zero() {
        return None;
    }

    let discount_value = round_money(total_value * percent / Decimal::ONE_HUNDRED);
    Some(DiscountInfo { percent, discount_value, final_value: total_value - discount_value })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::apply_discount;

    #[test]
    fn ten_percent_of_fifteen_hundred() {
        let info = apply_discount(Decimal::from(1500), Decimal::from(10)).expect("discount");

        assert_eq!(info.discount_value, Decimal::from(150));
        assert_eq!(info.final_value, Decimal::from(1350));
    }

    #[test]
    fn zero_percent_is_no_discount() {
        assert_eq!(apply_discount(Decimal::from(1500), Decimal::ZERO), None);
        assert_eq!(apply_discount(Decimal::from(1500), Decimal::from(-5)), None);
    }

    #[test]
    fn percent_is_clamped_to_one_hundred() {
        let info = apply_discount(Decimal::from(800), Decimal::from(130)).expect("discount");

        assert_eq!(info.percent, Decimal::ONE_HUNDRED);
        assert_eq!(info.final_value, Decimal::ZERO);
    }
}
