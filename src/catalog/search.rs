use crate::models::Item;

pub fn matches(item: &Item, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }

    item.title.to_lowercase().contains(&term)
        || item.tags.iter().any(|t| t.to_lowercase().contains(&term))
        || item.status.to_lowercase().contains(&term)
        || item.display_initials().to_lowercase().contains(&term)
}

/// Items matching `term`, in catalog order.
pub fn filter_items(items: &[Item], term: &str) -> Vec<Item> {
    items.iter().filter(|i| matches(i, term)).cloned().collect()
}
