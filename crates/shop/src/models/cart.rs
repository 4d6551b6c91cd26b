//! Cart records.

use serde::{Deserialize, Serialize};

use dragonfruit_core::{CartLineId, OptionId, ProductId, UserId};

/// One row in a user's in-progress cart: a product, a quantity, and the
/// options selected for it.
///
/// There is at most one line per (user, product) pair; adding the same
/// product again merges into the existing line. `quantity` is at least 1
/// while the line exists, but may exceed the product's current stock
/// between catalog changes and the next validator pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Selected option ids, kept sorted and deduplicated.
    pub option_ids: Vec<OptionId>,
}

impl CartLine {
    /// Union `options` into the line's selection, keeping it sorted.
    pub fn merge_options(&mut self, options: &[OptionId]) {
        self.option_ids.extend_from_slice(options);
        self.option_ids.sort_unstable();
        self.option_ids.dedup();
    }
}

/// Fields for inserting a new cart line.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub option_ids: Vec<OptionId>,
}
