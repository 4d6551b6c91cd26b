//! Cart validator: reconcile a cart against catalog drift.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use dragonfruit_core::UserId;

use crate::store::{ShopStore, StoreError};

/// Why a cart line had to be adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartIssueKind {
    /// The product was removed or deactivated; the line was deleted.
    Delisted,
    /// The product's stock hit zero; the line was deleted.
    SoldOut,
    /// Stock dropped below the line's quantity; the quantity was clamped.
    Reduced {
        /// The clamped quantity.
        to: u32,
    },
}

/// A forced cart adjustment, phrased for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartIssue {
    pub product_name: String,
    pub kind: CartIssueKind,
}

impl fmt::Display for CartIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CartIssueKind::Delisted => write!(f, "{} — delisted", self.product_name),
            CartIssueKind::SoldOut => write!(f, "{} — sold out", self.product_name),
            CartIssueKind::Reduced { to } => {
                write!(f, "{} — reduced to {to}", self.product_name)
            }
        }
    }
}

/// Reconciles cart lines against the current catalog.
///
/// Runs before checkout entry and again immediately before the order
/// commit, closing the window between "browse cart" and "confirm
/// purchase". Adjustments are persisted as they are found; the returned
/// issue list is what the user must re-confirm. An empty list means the
/// cart matches the catalog, and running the validator again with no
/// intervening catalog change returns an empty list.
#[derive(Clone)]
pub struct CartValidator {
    store: Arc<dyn ShopStore>,
}

impl CartValidator {
    /// Create a validator over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    /// Reconcile the user's cart, persisting removals and clamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    #[instrument(skip(self))]
    pub async fn validate(&self, user: UserId) -> Result<Vec<CartIssue>, StoreError> {
        let lines = self.store.cart_lines(user).await?;
        let mut issues = Vec::new();

        for mut line in lines {
            let product = match self.store.product(line.product_id).await? {
                Some(p) if p.is_active => p,
                gone => {
                    let name = gone.map_or_else(|| "unknown product".to_owned(), |p| p.name);
                    self.store.delete_cart_line(user, line.id).await?;
                    issues.push(CartIssue {
                        product_name: name,
                        kind: CartIssueKind::Delisted,
                    });
                    continue;
                }
            };

            if product.stock == 0 {
                self.store.delete_cart_line(user, line.id).await?;
                issues.push(CartIssue {
                    product_name: product.name,
                    kind: CartIssueKind::SoldOut,
                });
            } else if line.quantity > product.stock {
                line.quantity = product.stock;
                self.store.save_cart_line(&line).await?;
                issues.push(CartIssue {
                    product_name: product.name,
                    kind: CartIssueKind::Reduced { to: line.quantity },
                });
            }
        }

        Ok(issues)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dragonfruit_core::Price;

    use super::*;
    use crate::models::{NewCartLine, NewProduct};
    use crate::store::MemoryStore;

    async fn seed_line(store: &MemoryStore, user: UserId, stock: u32, quantity: u32) -> ProductSeed {
        let product = store
            .insert_product(NewProduct {
                name: "Tea".to_owned(),
                price: Price::from_major(100),
                stock,
                is_active: true,
                category_id: None,
                description: None,
            })
            .await
            .unwrap();
        let line = store
            .insert_cart_line(NewCartLine {
                user_id: user,
                product_id: product.id,
                quantity,
                option_ids: Vec::new(),
            })
            .await
            .unwrap();
        ProductSeed {
            product_id: product.id,
            line_id: line.id,
        }
    }

    struct ProductSeed {
        product_id: dragonfruit_core::ProductId,
        line_id: dragonfruit_core::CartLineId,
    }

    #[tokio::test]
    async fn test_delisted_product_removes_line() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new(1);
        let seed = seed_line(&store, user, 5, 2).await;

        let mut product = store.product(seed.product_id).await.unwrap().unwrap();
        product.is_active = false;
        store.save_product(&product).await.unwrap();

        let issues = CartValidator::new(store.clone()).validate(user).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues.first().unwrap().to_string(), "Tea — delisted");
        assert!(store.cart_lines(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sold_out_product_removes_line() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new(1);
        let seed = seed_line(&store, user, 5, 2).await;

        let mut product = store.product(seed.product_id).await.unwrap().unwrap();
        product.stock = 0;
        store.save_product(&product).await.unwrap();

        let issues = CartValidator::new(store.clone()).validate(user).await.unwrap();
        assert_eq!(issues.first().unwrap().to_string(), "Tea — sold out");
        assert!(store.cart_lines(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shortfall_clamps_quantity() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new(1);
        let seed = seed_line(&store, user, 5, 4).await;

        let mut product = store.product(seed.product_id).await.unwrap().unwrap();
        product.stock = 2;
        store.save_product(&product).await.unwrap();

        let issues = CartValidator::new(store.clone()).validate(user).await.unwrap();
        assert_eq!(issues.first().unwrap().to_string(), "Tea — reduced to 2");
        let line = store.cart_line(user, seed.line_id).await.unwrap().unwrap();
        assert_eq!(line.quantity, 2);
    }

    #[tokio::test]
    async fn test_validation_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new(1);
        let seed = seed_line(&store, user, 5, 4).await;

        let mut product = store.product(seed.product_id).await.unwrap().unwrap();
        product.stock = 2;
        store.save_product(&product).await.unwrap();

        let validator = CartValidator::new(store.clone());
        let first = validator.validate(user).await.unwrap();
        assert_eq!(first.len(), 1);

        // No catalog change in between: the second pass is clean.
        let second = validator.validate(user).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_clean_cart_yields_no_issues() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new(1);
        seed_line(&store, user, 5, 2).await;

        let issues = CartValidator::new(store.clone()).validate(user).await.unwrap();
        assert!(issues.is_empty());
    }
}
