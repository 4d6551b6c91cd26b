//! Persisted storage capability for catalog, cart, and order records.
//!
//! The fulfillment core never talks to a database directly; it goes
//! through [`ShopStore`], a small repository interface with query-by-id and
//! filter-by-owner primitives plus two transactional hooks:
//!
//! - [`ShopStore::reserve_stock`] performs the read-check-decrement for a
//!   whole order in one all-or-nothing step, closing the race between two
//!   checkouts competing for the same units.
//! - [`ShopStore::insert_order`] enforces order-number uniqueness, so the
//!   order builder can detect a number collision and regenerate.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and
//! development; a deployment backs the trait with its own storage.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use dragonfruit_core::{
    CartLineId, CategoryId, OptionId, OrderId, OrderNumber, OrderStatus, ProductId, UserId,
};

use crate::models::{
    CartLine, Category, NewCartLine, NewCategory, NewOrder, NewProduct, NewProductOption, Order,
    Product, ProductOption,
};

/// Errors returned by [`ShopStore`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate order number).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A stock reservation could not be satisfied.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock {
        /// The first product that failed the stock check.
        product_id: ProductId,
    },

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Internal(String),
}

/// Persisted storage for the fulfillment core.
///
/// All methods take `&self`; implementations handle their own interior
/// locking. Single-process deployment is assumed (see the concurrency
/// notes on [`reserve_stock`](ShopStore::reserve_stock)).
#[async_trait]
pub trait ShopStore: Send + Sync {
    // -- catalog ----------------------------------------------------------

    /// Fetch a product by id.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Insert a new product, assigning its id.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Replace a product record.
    async fn save_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Fetch an option by id.
    async fn option(&self, id: OptionId) -> Result<Option<ProductOption>, StoreError>;

    /// All options attached to a product.
    async fn options_for(&self, product_id: ProductId) -> Result<Vec<ProductOption>, StoreError>;

    /// Insert a new product option, assigning its id.
    async fn insert_option(&self, option: NewProductOption)
    -> Result<ProductOption, StoreError>;

    /// Fetch a category by id.
    async fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Insert a new category, assigning its id.
    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError>;

    // -- cart -------------------------------------------------------------

    /// All cart lines owned by a user.
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError>;

    /// Fetch one of a user's cart lines by line id.
    async fn cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Find a user's cart line for a product, if any.
    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Insert a new cart line, assigning its id.
    async fn insert_cart_line(&self, line: NewCartLine) -> Result<CartLine, StoreError>;

    /// Replace a cart line record.
    async fn save_cart_line(&self, line: &CartLine) -> Result<(), StoreError>;

    /// Delete one of a user's cart lines.
    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId)
    -> Result<(), StoreError>;

    /// Delete all of a user's cart lines.
    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError>;

    // -- stock ------------------------------------------------------------

    /// Atomically check and decrement stock for every `(product, quantity)`
    /// pair, all-or-nothing.
    ///
    /// Either every product has sufficient stock and every decrement is
    /// applied, or nothing changes and the first failing product is
    /// reported via [`StoreError::InsufficientStock`]. Implementations
    /// must execute the whole check-and-decrement under one transaction
    /// boundary (or equivalent lock), so two concurrent reservations can
    /// never both pass the check and drive stock negative.
    async fn reserve_stock(&self, wants: &[(ProductId, u32)]) -> Result<(), StoreError>;

    /// Return previously reserved units to stock.
    ///
    /// Used to roll back a reservation when a later commit step fails.
    async fn release_stock(&self, wants: &[(ProductId, u32)]) -> Result<(), StoreError>;

    // -- orders -----------------------------------------------------------

    /// Insert a new order, assigning its id.
    ///
    /// Returns [`StoreError::Conflict`] if the order number is already
    /// taken; the caller regenerates and retries.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Replace an order record.
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Fetch an order by id.
    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Fetch an order by its order number.
    async fn order_by_no(&self, order_no: &OrderNumber) -> Result<Option<Order>, StoreError>;

    /// A user's orders, newest first, bounded by `limit`.
    async fn orders_for_user(&self, user_id: UserId, limit: usize)
    -> Result<Vec<Order>, StoreError>;

    /// Orders in a given status, newest first, bounded by `limit`.
    async fn orders_with_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError>;
}
