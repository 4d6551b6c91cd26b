//! Server-held option-selection state.
//!
//! While a user is toggling options for a product, the in-progress
//! selection lives here, keyed by (user, product). Holding the state
//! server-side replaces the fragile alternative of re-parsing checkmark
//! characters out of a rendered keyboard. Entries expire after an idle
//! TTL; an abandoned selection simply disappears.

use std::time::Duration;

use moka::sync::Cache;

use dragonfruit_core::{OptionId, ProductId, UserId};

/// Maximum number of concurrent in-progress selections to retain.
const SELECTION_CAPACITY: u64 = 10_000;

/// In-progress option selections, keyed by (user, product).
pub struct SelectionRegistry {
    cache: Cache<(UserId, ProductId), Vec<OptionId>>,
}

impl SelectionRegistry {
    /// Create a registry whose entries expire after `ttl` of inactivity.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(SELECTION_CAPACITY)
                .time_to_idle(ttl)
                .build(),
        }
    }

    /// Flip one option in a user's selection and return the new set.
    pub fn toggle(&self, user: UserId, product: ProductId, option: OptionId) -> Vec<OptionId> {
        let key = (user, product);
        let mut selected = self.cache.get(&key).unwrap_or_default();
        if let Some(pos) = selected.iter().position(|o| *o == option) {
            selected.remove(pos);
        } else {
            selected.push(option);
            selected.sort_unstable();
        }
        self.cache.insert(key, selected.clone());
        selected
    }

    /// The current selection, if any.
    #[must_use]
    pub fn selected(&self, user: UserId, product: ProductId) -> Vec<OptionId> {
        self.cache.get(&(user, product)).unwrap_or_default()
    }

    /// Consume and return the selection.
    pub fn take(&self, user: UserId, product: ProductId) -> Vec<OptionId> {
        let key = (user, product);
        let selected = self.cache.get(&key).unwrap_or_default();
        self.cache.invalidate(&key);
        selected
    }

    /// Discard the selection without reading it.
    pub fn clear(&self, user: UserId, product: ProductId) {
        self.cache.invalidate(&(user, product));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_membership() {
        let registry = SelectionRegistry::new(Duration::from_secs(60));
        let (user, product) = (UserId::new(1), ProductId::new(10));

        let selected = registry.toggle(user, product, OptionId::new(3));
        assert_eq!(selected, vec![OptionId::new(3)]);

        let selected = registry.toggle(user, product, OptionId::new(1));
        assert_eq!(selected, vec![OptionId::new(1), OptionId::new(3)]);

        let selected = registry.toggle(user, product, OptionId::new(3));
        assert_eq!(selected, vec![OptionId::new(1)]);
    }

    #[test]
    fn test_take_consumes() {
        let registry = SelectionRegistry::new(Duration::from_secs(60));
        let (user, product) = (UserId::new(1), ProductId::new(10));

        registry.toggle(user, product, OptionId::new(3));
        assert_eq!(registry.take(user, product), vec![OptionId::new(3)]);
        assert!(registry.take(user, product).is_empty());
    }

    #[test]
    fn test_selections_are_keyed_per_product() {
        let registry = SelectionRegistry::new(Duration::from_secs(60));
        let user = UserId::new(1);

        registry.toggle(user, ProductId::new(10), OptionId::new(3));
        assert!(registry.selected(user, ProductId::new(11)).is_empty());
    }
}
