use std::collections::BTreeSet;

use crate::types::Item;

/// Read-through cache of the provider's items.
///
/// Every refresh replaces the whole collection. Completed items are dropped on
/// the way in so no view ever sees them.
#[derive(Debug, Default, Clone)]
pub struct ItemStore {
    items: Vec<Item>,
    generation: u64,
    loaded: bool,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, items: Vec<Item>) {
        self.items = items.into_iter().filter(|item| !item.completed).collect();
        self.generation = self.generation.wrapping_add(1);
        self.loaded = true;
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// Number of wholesale replacements applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False until the first successful fetch lands.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        distinct_categories(&self.items)
    }
}

pub fn distinct_categories(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter(|item| !item.completed)
        .map(|item| item.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(external_ref: &str, category: &str, completed: bool) -> Item {
        Item {
            external_ref: external_ref.to_string(),
            title: external_ref.to_string(),
            notes: String::new(),
            category: category.to_string(),
            due: None,
            priority: 0,
            completed,
        }
    }

    #[test]
    fn replace_all_drops_completed_items() {
        let mut store = ItemStore::new();
        assert!(!store.is_loaded());

        store.replace_all(vec![
            item("a", "Work", false),
            item("b", "Home", true),
            item("c", "Home", false),
        ]);

        assert!(store.is_loaded());
        let refs: Vec<&str> = store
            .items()
            .iter()
            .map(|item| item.external_ref.as_str())
            .collect();
        assert_eq!(refs, vec!["a", "c"]);
    }

    #[test]
    fn replace_all_is_wholesale() {
        let mut store = ItemStore::new();
        store.replace_all(vec![item("a", "Work", false)]);
        store.replace_all(vec![item("z", "Home", false)]);

        assert_eq!(store.generation(), 2);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].external_ref, "z");
        assert_eq!(store.categories(), vec!["Home".to_string()]);
    }

    #[test]
    fn categories_are_sorted_and_distinct() {
        let mut store = ItemStore::new();
        store.replace_all(vec![
            item("a", "Work", false),
            item("b", "Errands", false),
            item("c", "Work", false),
        ]);
        assert_eq!(
            store.categories(),
            vec!["Errands".to_string(), "Work".to_string()]
        );
    }
}
