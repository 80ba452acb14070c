use crate::domain::quote::{QuoteItem, QuoteItemDraft, QuoteTotals};

pub fn price_item(draft: &QuoteItemDraft) -> QuoteItem {
    let labor_total = draft.quantity * draft.unit_labor_price;
    let material_total = draft.quantity * draft.unit_material_price;
    let total = draft.quantity * (draft.unit_labor_price + draft.unit_material_price);

    QuoteItem {
        category_id: draft.category_id.clone(),
        category_name: draft.category_name.clone(),
        description: draft.description.clone(),
        unit: draft.unit.clone(),
        quantity: draft.quantity,
        unit_labor_price: draft.unit_labor_price,
        unit_material_price: draft.unit_material_price,
        labor_total,
        material_total,
        total,
    }
}

pub fn price_items(drafts: &[QuoteItemDraft]) -> Vec<QuoteItem> {
    drafts.iter().map(price_item).collect()
}

pub fn sum_totals(items: &[QuoteItem]) -> QuoteTotals {
    items.iter().fold(QuoteTotals::default(), |acc, item| QuoteTotals {
        labor: acc.labor + item.labor_total,
        material: acc.material + item.material_total,
        total: acc.total + item.total,
    })
}

/// Prices every draft and sums the result in one go.
pub fn price_quote(drafts: &[QuoteItemDraft]) -> (Vec<QuoteItem>, QuoteTotals) {
    let items = price_items(drafts);
    let totals = sum_totals(&items);
    (items, totals)
}

pub fn is_consistent(item: &QuoteItem) -> bool {
    item.total == item.labor_total + item.material_total
        && item.total == item.quantity * (item.unit_labor_price + item.unit_material_price)
}
