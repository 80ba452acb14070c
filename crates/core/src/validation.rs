use rust_decimal::Decimal;

use crate::domain::quote::QuoteItemDraft;
use crate::errors::DomainError;

pub const MIN_DESCRIPTION_CHARS: usize = 3;

/// Checks a single line item. Positions in messages are 1-based, matching what
/// an operator sees on the proposal.
pub fn validate_item(position: usize, item: &QuoteItemDraft) -> Result<(), DomainError> {
    if item.category_id.trim().is_empty() {
        return Err(DomainError::Validation(format!("item {position}: category is required")));
    }

    if item.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(DomainError::Validation(format!(
            "item {position}: description must have at least {MIN_DESCRIPTION_CHARS} characters"
        )));
    }

    if item.quantity <= Decimal::ZERO {
        return Err(DomainError::Validation(format!(
            "item {position}: quantity must be greater than zero"
        )));
    }

    Ok(())
}

pub fn validate_items(items: &[QuoteItemDraft]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::Validation("quote must contain at least one item".to_string()));
    }

    items.iter().enumerate().try_for_each(|(index, item)| validate_item(index + 1, item))
}

pub fn validate_new_quote(service_id: &str, items: &[QuoteItemDraft]) -> Result<(), DomainError> {
    if service_id.trim().is_empty() {
        return Err(DomainError::Validation("service is required".to_string()));
    }

    validate_items(items)
}
