//! In-memory [`ShopStore`] implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use dragonfruit_core::{
    CartLineId, CategoryId, OptionId, OrderId, OrderNumber, OrderStatus, ProductId, UserId,
};

use super::{ShopStore, StoreError};
use crate::models::{
    CartLine, Category, NewCartLine, NewCategory, NewOrder, NewProduct, NewProductOption, Order,
    OrderLine, Product, ProductOption,
};

/// In-memory implementation for development and testing.
///
/// All state lives behind one `RwLock`, which also serves as the
/// transaction boundary for [`reserve_stock`](ShopStore::reserve_stock):
/// the whole check-and-decrement runs under a single write guard.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    products: HashMap<ProductId, Product>,
    options: HashMap<OptionId, ProductOption>,
    categories: HashMap<CategoryId, Category>,
    cart_lines: HashMap<CartLineId, CartLine>,
    orders: HashMap<OrderId, Order>,
    /// Order-number index. Orders are never deleted, so this doubles as
    /// the "never reused" registry.
    order_nos: HashMap<String, OrderId>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    // -- catalog ----------------------------------------------------------

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut inner = self.write()?;
        let id = ProductId::new(inner.next_id());
        let product = Product {
            id,
            name: product.name,
            price: product.price,
            stock: product.stock,
            is_active: product.is_active,
            category_id: product.category_id,
            description: product.description,
        };
        inner.products.insert(id, product.clone());
        Ok(product)
    }

    async fn save_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.products.contains_key(&product.id) {
            return Err(StoreError::NotFound(format!("product {}", product.id)));
        }
        inner.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn option(&self, id: OptionId) -> Result<Option<ProductOption>, StoreError> {
        Ok(self.read()?.options.get(&id).cloned())
    }

    async fn options_for(&self, product_id: ProductId) -> Result<Vec<ProductOption>, StoreError> {
        let inner = self.read()?;
        let mut options: Vec<ProductOption> = inner
            .options
            .values()
            .filter(|o| o.product_id == product_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.id);
        Ok(options)
    }

    async fn insert_option(
        &self,
        option: NewProductOption,
    ) -> Result<ProductOption, StoreError> {
        let mut inner = self.write()?;
        if !inner.products.contains_key(&option.product_id) {
            return Err(StoreError::NotFound(format!(
                "product {}",
                option.product_id
            )));
        }
        let id = OptionId::new(inner.next_id());
        let option = ProductOption {
            id,
            product_id: option.product_id,
            name: option.name,
            price: option.price,
        };
        inner.options.insert(id, option.clone());
        Ok(option)
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut inner = self.write()?;
        let id = CategoryId::new(inner.next_id());
        let category = Category {
            id,
            name: category.name,
            is_active: true,
            display_order: category.display_order,
        };
        inner.categories.insert(id, category.clone());
        Ok(category)
    }

    // -- cart -------------------------------------------------------------

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let inner = self.read()?;
        let mut lines: Vec<CartLine> = inner
            .cart_lines
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines)
    }

    async fn cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .cart_lines
            .get(&line_id)
            .filter(|l| l.user_id == user_id)
            .cloned())
    }

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .cart_lines
            .values()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_line(&self, line: NewCartLine) -> Result<CartLine, StoreError> {
        let mut inner = self.write()?;
        let id = CartLineId::new(inner.next_id());
        let mut option_ids = line.option_ids;
        option_ids.sort_unstable();
        option_ids.dedup();
        let line = CartLine {
            id,
            user_id: line.user_id,
            product_id: line.product_id,
            quantity: line.quantity,
            option_ids,
        };
        inner.cart_lines.insert(id, line.clone());
        Ok(line)
    }

    async fn save_cart_line(&self, line: &CartLine) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.cart_lines.contains_key(&line.id) {
            return Err(StoreError::NotFound(format!("cart line {}", line.id)));
        }
        inner.cart_lines.insert(line.id, line.clone());
        Ok(())
    }

    async fn delete_cart_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let owned = inner
            .cart_lines
            .get(&line_id)
            .is_some_and(|l| l.user_id == user_id);
        if !owned {
            return Err(StoreError::NotFound(format!("cart line {line_id}")));
        }
        inner.cart_lines.remove(&line_id);
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.cart_lines.retain(|_, l| l.user_id != user_id);
        Ok(())
    }

    // -- stock ------------------------------------------------------------

    async fn reserve_stock(&self, wants: &[(ProductId, u32)]) -> Result<(), StoreError> {
        let mut inner = self.write()?;

        // Fold duplicate product entries before checking.
        let mut needed: HashMap<ProductId, u32> = HashMap::new();
        for (product_id, quantity) in wants {
            *needed.entry(*product_id).or_default() += quantity;
        }

        for (product_id, quantity) in &needed {
            let product = inner
                .products
                .get(product_id)
                .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
            if product.stock < *quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: *product_id,
                });
            }
        }

        for (product_id, quantity) in &needed {
            if let Some(product) = inner.products.get_mut(product_id) {
                product.stock -= quantity;
            }
        }

        Ok(())
    }

    async fn release_stock(&self, wants: &[(ProductId, u32)]) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        for (product_id, quantity) in wants {
            let product = inner
                .products
                .get_mut(product_id)
                .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
            product.stock = product.stock.saturating_add(*quantity);
        }
        Ok(())
    }

    // -- orders -----------------------------------------------------------

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut inner = self.write()?;

        if inner.order_nos.contains_key(order.order_no.as_str()) {
            return Err(StoreError::Conflict(format!(
                "order number {} already taken",
                order.order_no
            )));
        }

        let id = OrderId::new(inner.next_id());
        let order = Order {
            id,
            order_no: order.order_no,
            user_id: order.user_id,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            store_code: order.store_code,
            status: OrderStatus::Pending,
            tracking_number: None,
            created_at: order.created_at,
            confirmed_at: None,
            shipped_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
            total: order.total,
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLine {
                    product_id: l.product_id,
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    options: l.options,
                })
                .collect(),
        };

        inner
            .order_nos
            .insert(order.order_no.as_str().to_owned(), id);
        inner.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.orders.contains_key(&order.id) {
            return Err(StoreError::NotFound(format!("order {}", order.id)));
        }
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn order_by_no(&self, order_no: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .order_nos
            .get(order_no.as_str())
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let inner = self.read()?;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.truncate(limit);
        Ok(orders)
    }

    async fn orders_with_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let inner = self.read()?;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.truncate(limit);
        Ok(orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use dragonfruit_core::{CustomerName, OrderNumber, PhoneNumber, Price, StoreCode};

    use super::*;

    fn new_product(name: &str, price: u64, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            price: Price::from_major(price),
            stock,
            is_active: true,
            category_id: None,
            description: None,
        }
    }

    fn new_order(user: i64) -> NewOrder {
        NewOrder {
            order_no: OrderNumber::generate("T", Utc::now(), &mut rand::rng()),
            user_id: UserId::new(user),
            customer_name: CustomerName::parse("王小明").unwrap(),
            customer_phone: PhoneNumber::parse("0912345678").unwrap(),
            store_code: StoreCode::parse("123456").unwrap(),
            total: Price::ZERO,
            created_at: Utc::now(),
            lines: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_reserve_stock_all_or_nothing() {
        let store = MemoryStore::new();
        let a = store.insert_product(new_product("A", 10, 5)).await.unwrap();
        let b = store.insert_product(new_product("B", 10, 1)).await.unwrap();

        let err = store
            .reserve_stock(&[(a.id, 2), (b.id, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { product_id } if product_id == b.id
        ));

        // Nothing was decremented.
        assert_eq!(store.product(a.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(store.product(b.id).await.unwrap().unwrap().stock, 1);

        store.reserve_stock(&[(a.id, 2), (b.id, 1)]).await.unwrap();
        assert_eq!(store.product(a.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(store.product(b.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_release_stock_restores_units() {
        let store = MemoryStore::new();
        let a = store.insert_product(new_product("A", 10, 4)).await.unwrap();

        store.reserve_stock(&[(a.id, 3)]).await.unwrap();
        store.release_stock(&[(a.id, 3)]).await.unwrap();

        assert_eq!(store.product(a.id).await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_insert_order_rejects_duplicate_number() {
        let store = MemoryStore::new();

        let first = new_order(1);
        let duplicate_no = first.order_no.clone();
        store.insert_order(first).await.unwrap();

        let mut second = new_order(2);
        second.order_no = duplicate_no;
        let err = store.insert_order(second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cart_line_ownership() {
        let store = MemoryStore::new();
        let p = store.insert_product(new_product("A", 10, 5)).await.unwrap();
        let line = store
            .insert_cart_line(NewCartLine {
                user_id: UserId::new(1),
                product_id: p.id,
                quantity: 1,
                option_ids: Vec::new(),
            })
            .await
            .unwrap();

        // Another user cannot see or delete the line.
        assert!(
            store
                .cart_line(UserId::new(2), line.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .delete_cart_line(UserId::new(2), line.id)
                .await
                .is_err()
        );

        store.delete_cart_line(UserId::new(1), line.id).await.unwrap();
        assert!(store.cart_lines(UserId::new(1)).await.unwrap().is_empty());
    }
}
