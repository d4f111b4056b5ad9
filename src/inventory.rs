//! Pure inventory transforms.
//!
//! These never mutate in place; callers hand the result to
//! `Action::InventoryReplace` (or `BattleSession::transform_inventory`).

use crate::entity::InventoryItem;

/// Uses one of the item with `item_id`. The stack is dropped when it runs out.
/// Unknown ids leave the inventory unchanged.
pub fn consume(items: &[InventoryItem], item_id: &str) -> Vec<InventoryItem> {
    items
        .iter()
        .filter_map(|item| {
            if item.id != item_id {
                return Some(item.clone());
            }
            let quantity = item.quantity.saturating_sub(1);
            (quantity > 0).then(|| InventoryItem {
                quantity,
                ..item.clone()
            })
        })
        .collect()
}

/// Adds `item`, merging into an existing stack with the same id.
pub fn add(items: &[InventoryItem], item: InventoryItem) -> Vec<InventoryItem> {
    let mut next = items.to_vec();
    match next.iter_mut().find(|existing| existing.id == item.id) {
        Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
        None => next.push(item),
    }
    next
}

pub fn usable(items: &[InventoryItem]) -> impl Iterator<Item = &InventoryItem> {
    items
        .iter()
        .filter(|item| item.usable_in_battle && item.quantity > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ItemEffect, ItemTarget};
    use pretty_assertions::assert_eq;

    fn stack(id: &str, quantity: u32, usable: bool) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            name: id.to_string(),
            quantity,
            description: None,
            usable_in_battle: usable,
            target: ItemTarget::SelfTeam,
            effect: usable.then_some(ItemEffect::HealHp { amount: 20 }),
            image: String::new(),
        }
    }

    #[test]
    fn consume_decrements_then_drops() {
        let items = vec![stack("potion", 2, true), stack("rope", 1, false)];
        let once = consume(&items, "potion");
        assert_eq!(once[0].quantity, 1);
        let twice = consume(&once, "potion");
        assert_eq!(twice, vec![stack("rope", 1, false)]);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn consume_unknown_is_identity() {
        let items = vec![stack("potion", 2, true)];
        assert_eq!(consume(&items, "elixir"), items);
    }

    #[test]
    fn add_merges_stacks() {
        let items = vec![stack("potion", 2, true)];
        let merged = add(&items, stack("potion", 3, true));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 5);
        let appended = add(&merged, stack("rope", 1, false));
        assert_eq!(appended.len(), 2);
    }

    #[test]
    fn usable_filters_battle_items() {
        let items = vec![stack("potion", 1, true), stack("rope", 1, false)];
        let names: Vec<&str> = usable(&items).map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["potion"]);
    }
}
