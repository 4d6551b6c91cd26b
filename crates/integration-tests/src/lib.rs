//! Integration tests for Dragonfruit.
//!
//! Everything runs in-process against [`MemoryStore`]; no external
//! services are required. This crate provides the shared fixture
//! ([`TestContext`]) and a failure-injecting store decorator
//! ([`FailingStore`]) used by the tests in `tests/`.
//!
//! # Test Categories
//!
//! - `checkout_flow` - End-to-end cart → dialogue → order scenarios
//! - `commit_atomicity` - Concurrent commits and mid-commit rollback
//! - `order_lifecycle` - Status transitions and customer notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use dragonfruit_core::{
    CartLineId, CategoryId, OptionId, OrderId, OrderNumber, OrderStatus, Price, ProductId, UserId,
};
use dragonfruit_shop::ShopConfig;
use dragonfruit_shop::models::{
    CartLine, Category, NewCartLine, NewCategory, NewOrder, NewProduct, NewProductOption, Order,
    Product, ProductOption,
};
use dragonfruit_shop::notify::RecordingNotifier;
use dragonfruit_shop::services::{
    CartService, CartValidator, CheckoutDialogue, OrderLifecycle, OrderService,
};
use dragonfruit_shop::store::{MemoryStore, ShopStore, StoreError};

/// Operators configured into every test context.
pub const OPERATORS: [UserId; 2] = [UserId::new(900), UserId::new(901)];

/// Everything a scenario test needs, wired over one in-memory store.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: ShopConfig,
    pub cart: CartService,
    pub validator: CartValidator,
    pub orders: OrderService,
    pub dialogue: CheckoutDialogue,
    pub lifecycle: OrderLifecycle,
}

impl TestContext {
    /// Build a context with the default ten-minute idle window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_idle_timeout(Duration::from_secs(600))
    }

    /// Build a context with a custom checkout idle window.
    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        init_tracing();

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let config = ShopConfig {
            order_prefix: "DF".to_owned(),
            checkout_idle_timeout: idle_timeout,
            selection_ttl: Duration::from_secs(300),
            operator_ids: OPERATORS.to_vec(),
        };

        let shop_store: Arc<dyn ShopStore> = store.clone();
        Self {
            cart: CartService::new(shop_store.clone(), &config),
            validator: CartValidator::new(shop_store.clone()),
            orders: OrderService::new(shop_store.clone(), notifier.clone(), &config),
            dialogue: CheckoutDialogue::new(shop_store.clone(), notifier.clone(), &config),
            lifecycle: OrderLifecycle::new(shop_store, notifier.clone()),
            store,
            notifier,
            config,
        }
    }

    /// Seed an active product.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails (test fixture).
    pub async fn seed_product(&self, name: &str, price: u64, stock: u32) -> Product {
        self.store
            .insert_product(NewProduct {
                name: name.to_owned(),
                price: Price::from_major(price),
                stock,
                is_active: true,
                category_id: None,
                description: None,
            })
            .await
            .expect("seed product")
    }

    /// Seed an option on a product.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails (test fixture).
    pub async fn seed_option(&self, product_id: ProductId, name: &str, price: u64) -> ProductOption {
        self.store
            .insert_option(NewProductOption {
                product_id,
                name: name.to_owned(),
                price: Price::from_major(price),
            })
            .await
            .expect("seed option")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test subscriber once so `RUST_LOG` controls trace output
/// during test runs. Subsequent calls are no-ops.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A [`ShopStore`] decorator that can be told to fail order inserts,
/// simulating a storage write failure mid-commit.
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    fail_insert_order: AtomicBool,
}

impl FailingStore {
    #[must_use]
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_insert_order: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `insert_order` fail.
    pub fn fail_order_inserts(&self) {
        self.fail_insert_order.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ShopStore for FailingStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.inner.product(id).await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.inner.insert_product(product).await
    }

    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        self.inner.save_product(product).await
    }

    async fn option(&self, id: OptionId) -> Result<Option<ProductOption>, StoreError> {
        self.inner.option(id).await
    }

    async fn options_for(&self, product_id: ProductId) -> Result<Vec<ProductOption>, StoreError> {
        self.inner.options_for(product_id).await
    }

    async fn insert_option(
        &self,
        option: NewProductOption,
    ) -> Result<ProductOption, StoreError> {
        self.inner.insert_option(option).await
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        self.inner.category(id).await
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        self.inner.insert_category(category).await
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        self.inner.cart_lines(user_id).await
    }

    async fn cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError> {
        self.inner.cart_line(user_id, line_id).await
    }

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        self.inner.find_cart_line(user_id, product_id).await
    }

    async fn insert_cart_line(&self, line: NewCartLine) -> Result<CartLine, StoreError> {
        self.inner.insert_cart_line(line).await
    }

    async fn save_cart_line(&self, line: &CartLine) -> Result<(), StoreError> {
        self.inner.save_cart_line(line).await
    }

    async fn delete_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), StoreError> {
        self.inner.delete_cart_line(user_id, line_id).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError> {
        self.inner.clear_cart(user_id).await
    }

    async fn reserve_stock(&self, wants: &[(ProductId, u32)]) -> Result<(), StoreError> {
        self.inner.reserve_stock(wants).await
    }

    async fn release_stock(&self, wants: &[(ProductId, u32)]) -> Result<(), StoreError> {
        self.inner.release_stock(wants).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        if self.fail_insert_order.load(Ordering::SeqCst) {
            return Err(StoreError::Internal("injected write failure".to_owned()));
        }
        self.inner.insert_order(order).await
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.save_order(order).await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.order(id).await
    }

    async fn order_by_no(&self, order_no: &OrderNumber) -> Result<Option<Order>, StoreError> {
        self.inner.order_by_no(order_no).await
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        self.inner.orders_for_user(user_id, limit).await
    }

    async fn orders_with_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        self.inner.orders_with_status(status, limit).await
    }
}
