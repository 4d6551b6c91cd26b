//! Cart engine: add, adjust, remove, and price cart lines.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use dragonfruit_core::{CartLineId, OptionId, Price, ProductId, UserId};

use crate::config::ShopConfig;
use crate::models::{NewCartLine, ProductOption};
use crate::services::selection::SelectionRegistry;
use crate::store::{ShopStore, StoreError};

/// Errors from cart operations.
///
/// Stock and availability errors are recoverable here: the single
/// operation is rejected and the caller re-renders the cart.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// The product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The product has been deactivated.
    #[error("product is no longer available")]
    ProductInactive,

    /// Not enough stock; `available` is how many more units can still be
    /// added on top of what the cart already holds.
    #[error("insufficient stock ({available} more can be added)")]
    OutOfStock {
        /// Units still addable.
        available: u32,
    },

    /// Quantity would drop below 1; lines are removed explicitly, never by
    /// decrementing to zero.
    #[error("quantity cannot go below 1")]
    InvalidQuantity,

    /// The cart line does not exist (or belongs to another user).
    #[error("cart line not found")]
    LineNotFound,

    /// An option id does not belong to the product.
    #[error("option does not belong to this product")]
    UnknownOption,

    /// Price arithmetic overflowed.
    #[error("price arithmetic overflow")]
    Arithmetic,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One priced cart line, for rendering.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartLineView {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Base price plus selected option prices, from the live catalog.
    pub unit_price: Price,
    pub subtotal: Price,
    pub option_names: Vec<String>,
}

/// A priced cart, for rendering.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartTotals {
    pub lines: Vec<CartLineView>,
    pub total: Price,
    /// Total units across all lines.
    pub item_count: u32,
}

impl CartTotals {
    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// An in-progress option selection with its running unit price.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectionView {
    pub selected: Vec<OptionId>,
    /// Base price plus currently selected option prices.
    pub unit_price: Price,
}

/// Per-user mutable cart over a [`ShopStore`].
///
/// Prices are always recomputed from the live catalog; the cart never
/// caches them.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn ShopStore>,
    selections: Arc<SelectionRegistry>,
}

impl CartService {
    /// Create a cart service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>, config: &ShopConfig) -> Self {
        Self {
            store,
            selections: Arc::new(SelectionRegistry::new(config.selection_ttl)),
        }
    }

    /// Add `quantity` units of a product to the user's cart.
    ///
    /// Merges into the existing line for that product, if any, unioning
    /// `options` into the line's selection. Returns the line's new total
    /// quantity.
    ///
    /// # Errors
    ///
    /// - [`CartError::ProductNotFound`] / [`CartError::ProductInactive`]
    /// - [`CartError::UnknownOption`] if an option belongs to another product
    /// - [`CartError::OutOfStock`] if the line would exceed current stock;
    ///   the error reports how many more units are still addable
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: u32,
        options: &[OptionId],
    ) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if !product.is_active {
            return Err(CartError::ProductInactive);
        }

        if !options.is_empty() {
            let known = self.store.options_for(product_id).await?;
            for option in options {
                if !known.iter().any(|o| o.id == *option) {
                    return Err(CartError::UnknownOption);
                }
            }
        }

        let existing = self.store.find_cart_line(user, product_id).await?;
        let current = existing.as_ref().map_or(0, |l| l.quantity);
        let total = current.saturating_add(quantity);

        if total > product.stock {
            return Err(CartError::OutOfStock {
                available: product.stock.saturating_sub(current),
            });
        }

        match existing {
            Some(mut line) => {
                line.quantity = total;
                line.merge_options(options);
                self.store.save_cart_line(&line).await?;
            }
            None => {
                self.store
                    .insert_cart_line(NewCartLine {
                        user_id: user,
                        product_id,
                        quantity,
                        option_ids: options.to_vec(),
                    })
                    .await?;
            }
        }

        Ok(total)
    }

    /// Add a product using the user's in-progress option selection.
    ///
    /// The selection is consumed only if the add succeeds, so a stock
    /// rejection doesn't wipe the user's toggles.
    ///
    /// # Errors
    ///
    /// Same as [`add_item`](Self::add_item).
    pub async fn add_from_selection(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, CartError> {
        let options = self.selections.selected(user, product_id);
        let total = self.add_item(user, product_id, quantity, &options).await?;
        self.selections.take(user, product_id);
        Ok(total)
    }

    /// Flip one option in the user's in-progress selection for a product.
    ///
    /// Returns the new selection and its running unit price for rendering.
    ///
    /// # Errors
    ///
    /// - [`CartError::ProductNotFound`]
    /// - [`CartError::UnknownOption`] if the option belongs elsewhere
    pub async fn toggle_option(
        &self,
        user: UserId,
        product_id: ProductId,
        option_id: OptionId,
    ) -> Result<SelectionView, CartError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        let known = self.store.options_for(product_id).await?;
        if !known.iter().any(|o| o.id == option_id) {
            return Err(CartError::UnknownOption);
        }

        let selected = self.selections.toggle(user, product_id, option_id);
        let unit_price = unit_price(product.price, &known, &selected)?;

        Ok(SelectionView {
            selected,
            unit_price,
        })
    }

    /// Change a line's quantity by `delta`, clamping at a minimum of 1.
    ///
    /// Returns the new quantity.
    ///
    /// # Errors
    ///
    /// - [`CartError::LineNotFound`]
    /// - [`CartError::InvalidQuantity`] if the result would drop below 1
    /// - [`CartError::OutOfStock`] if the result would exceed current stock
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        user: UserId,
        line_id: CartLineId,
        delta: i32,
    ) -> Result<u32, CartError> {
        let mut line = self
            .store
            .cart_line(user, line_id)
            .await?
            .ok_or(CartError::LineNotFound)?;

        let new_quantity = i64::from(line.quantity) + i64::from(delta);
        if new_quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let new_quantity = u32::try_from(new_quantity).map_err(|_| CartError::InvalidQuantity)?;

        if delta > 0 {
            let product = self
                .store
                .product(line.product_id)
                .await?
                .ok_or(CartError::ProductNotFound)?;
            if new_quantity > product.stock {
                return Err(CartError::OutOfStock {
                    available: product.stock.saturating_sub(line.quantity),
                });
            }
        }

        line.quantity = new_quantity;
        self.store.save_cart_line(&line).await?;
        Ok(new_quantity)
    }

    /// Remove a line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line does not exist or
    /// belongs to another user.
    pub async fn remove_line(&self, user: UserId, line_id: CartLineId) -> Result<(), CartError> {
        self.store
            .delete_cart_line(user, line_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => CartError::LineNotFound,
                other => CartError::Store(other),
            })
    }

    /// Remove every line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] on storage failure.
    pub async fn clear(&self, user: UserId) -> Result<(), CartError> {
        Ok(self.store.clear_cart(user).await?)
    }

    /// Price the user's cart from the live catalog.
    ///
    /// Unit prices are base price plus selected option prices, recomputed
    /// on every call. Lines whose product has vanished are omitted from
    /// the view; removing them is the validator's job.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] on storage failure or
    /// [`CartError::Arithmetic`] on price overflow.
    pub async fn totals(&self, user: UserId) -> Result<CartTotals, CartError> {
        let lines = self.store.cart_lines(user).await?;

        let mut views = Vec::with_capacity(lines.len());
        let mut total = Price::ZERO;
        let mut item_count: u32 = 0;

        for line in lines {
            let Some(product) = self.store.product(line.product_id).await? else {
                continue;
            };
            let known = self.store.options_for(line.product_id).await?;
            let unit = unit_price(product.price, &known, &line.option_ids)?;
            let subtotal = unit.times(line.quantity).ok_or(CartError::Arithmetic)?;

            total = total.checked_add(subtotal).ok_or(CartError::Arithmetic)?;
            item_count = item_count.saturating_add(line.quantity);

            views.push(CartLineView {
                line_id: line.id,
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price: unit,
                subtotal,
                option_names: known
                    .iter()
                    .filter(|o| line.option_ids.contains(&o.id))
                    .map(|o| o.name.clone())
                    .collect(),
            });
        }

        Ok(CartTotals {
            lines: views,
            total,
            item_count,
        })
    }
}

/// Base price plus the prices of the selected options.
fn unit_price(
    base: Price,
    known: &[ProductOption],
    selected: &[OptionId],
) -> Result<Price, CartError> {
    let mut unit = base;
    for option in known.iter().filter(|o| selected.contains(&o.id)) {
        unit = unit.checked_add(option.price).ok_or(CartError::Arithmetic)?;
    }
    Ok(unit)
}
