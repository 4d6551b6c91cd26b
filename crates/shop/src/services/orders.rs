//! Order builder: the atomic cart-to-order commit.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::instrument;

use dragonfruit_core::{
    CustomerName, OrderNumber, PhoneNumber, Price, ProductId, StoreCode, UserId,
};

use crate::config::ShopConfig;
use crate::events::OrderCreated;
use crate::models::{NewOrder, NewOrderLine, Order, OrderLineOption};
use crate::notify::{BroadcastReport, Notifier, broadcast};
use crate::services::validator::{CartIssue, CartValidator};
use crate::store::{ShopStore, StoreError};

/// How many order-number collisions to tolerate before giving up.
const MAX_ORDER_NO_ATTEMPTS: usize = 32;

/// Errors from the commit operation.
///
/// Stock errors are fatal for the attempt: the checkout aborts and the
/// user returns to the cart view. Integrity errors roll the commit back
/// completely and surface as a generic retry-later failure.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// The cart has no lines to commit.
    #[error("cart is empty")]
    EmptyCart,

    /// The validator had to adjust the cart; the user must re-confirm.
    #[error("cart changed during checkout")]
    CartChanged(Vec<CartIssue>),

    /// Stock ran out between validation and the reservation.
    #[error("insufficient stock for {product}")]
    StockConflict {
        /// Name of the product that lost the race.
        product: String,
    },

    /// Could not allocate an unused order number.
    #[error("could not allocate a unique order number")]
    OrderNumberExhausted,

    /// Price arithmetic overflowed.
    #[error("price arithmetic overflow")]
    Arithmetic,

    /// Storage failure mid-commit; all effects were rolled back.
    #[error(transparent)]
    Store(StoreError),
}

impl CommitError {
    /// The message shown to the user for this failure.
    ///
    /// Integrity failures get a generic retry-later line; the detail is
    /// for the logs, not the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty, nothing to check out".to_owned(),
            Self::CartChanged(issues) => {
                let mut text = "Your cart has changed:\n".to_owned();
                for issue in issues {
                    text.push_str(&format!("\n- {issue}"));
                }
                text.push_str("\n\nPlease review your cart and try again");
                text
            }
            Self::StockConflict { product } => format!(
                "\"{product}\" ran out of stock before your order could be completed. \
                 Please review your cart and try again"
            ),
            Self::OrderNumberExhausted | Self::Arithmetic | Self::Store(_) => {
                "Order could not be created, please try again later".to_owned()
            }
        }
    }
}

/// The customer fields collected by the checkout dialogue.
#[derive(Debug, Clone)]
pub struct CheckoutFields {
    pub customer_name: CustomerName,
    pub customer_phone: PhoneNumber,
    pub store_code: StoreCode,
}

/// Everything produced by a successful commit.
#[derive(Debug)]
pub struct CommitReceipt {
    pub order: Order,
    pub event: OrderCreated,
    /// Outcome of the operator broadcast.
    pub operator_report: BroadcastReport,
}

/// Allocates order numbers that are distinct within this process.
///
/// The random suffix only has a thousand values per millisecond, so a
/// burst of orders can collide. Numbers handed out are remembered and
/// collisions regenerated; the store's uniqueness check on insert covers
/// collisions with numbers from earlier runs.
pub(crate) struct OrderNumberGenerator {
    prefix: String,
    issued: Mutex<HashSet<String>>,
}

impl OrderNumberGenerator {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            issued: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn next(&self) -> OrderNumber {
        let mut rng = rand::rng();
        loop {
            let candidate = OrderNumber::generate(&self.prefix, Utc::now(), &mut rng);
            let fresh = self
                .issued
                .lock()
                .map(|mut issued| issued.insert(candidate.as_str().to_owned()))
                .unwrap_or(true);
            if fresh {
                return candidate;
            }
        }
    }
}

/// Converts a validated cart plus collected customer fields into a
/// persisted order.
pub struct OrderService {
    store: Arc<dyn ShopStore>,
    notifier: Arc<dyn Notifier>,
    validator: CartValidator,
    numbers: OrderNumberGenerator,
    operator_ids: Vec<UserId>,
}

impl OrderService {
    /// Create an order service over `store`, broadcasting new orders to
    /// the operators in `config`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ShopStore>,
        notifier: Arc<dyn Notifier>,
        config: &ShopConfig,
    ) -> Self {
        Self {
            validator: CartValidator::new(store.clone()),
            numbers: OrderNumberGenerator::new(&config.order_prefix),
            operator_ids: config.operator_ids.clone(),
            store,
            notifier,
        }
    }

    /// Commit the user's cart into an order.
    ///
    /// The sequence is: re-validate the cart, reserve stock for every line
    /// in one all-or-nothing step, insert the order with a freshly
    /// allocated order number (regenerating on collision), clear the cart,
    /// and broadcast the created order to operators.
    ///
    /// Failure after the reservation releases it, so no stock is ever
    /// decremented without a persisted order. Cart clearing is the final
    /// step; if it fails the order still stands, the failure is logged,
    /// and the leftover lines are swept up by the next validator pass.
    ///
    /// # Errors
    ///
    /// See [`CommitError`] for the failure taxonomy.
    #[instrument(skip_all, fields(user = %user))]
    pub async fn commit(
        &self,
        user: UserId,
        fields: CheckoutFields,
    ) -> Result<CommitReceipt, CommitError> {
        // Double-check the cart right before committing; the user may have
        // been reading prompts for a while.
        let issues = self.validator.validate(user).await.map_err(CommitError::Store)?;
        if !issues.is_empty() {
            return Err(CommitError::CartChanged(issues));
        }

        let lines = self
            .store
            .cart_lines(user)
            .await
            .map_err(CommitError::Store)?;
        if lines.is_empty() {
            return Err(CommitError::EmptyCart);
        }

        // Freeze prices and build the order lines from the live catalog.
        let mut order_lines = Vec::with_capacity(lines.len());
        let mut wants: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        let mut total = Price::ZERO;

        for line in &lines {
            let product = self
                .store
                .product(line.product_id)
                .await
                .map_err(CommitError::Store)?
                .ok_or_else(|| {
                    CommitError::Store(StoreError::NotFound(format!(
                        "product {}",
                        line.product_id
                    )))
                })?;

            let known = self
                .store
                .options_for(line.product_id)
                .await
                .map_err(CommitError::Store)?;

            let mut unit_price = product.price;
            let mut options = Vec::new();
            for option in known.iter().filter(|o| line.option_ids.contains(&o.id)) {
                unit_price = unit_price
                    .checked_add(option.price)
                    .ok_or(CommitError::Arithmetic)?;
                options.push(OrderLineOption {
                    option_id: option.id,
                    name: option.name.clone(),
                    price: option.price,
                });
            }

            let subtotal = unit_price
                .times(line.quantity)
                .ok_or(CommitError::Arithmetic)?;
            total = total.checked_add(subtotal).ok_or(CommitError::Arithmetic)?;

            wants.push((product.id, line.quantity));
            order_lines.push(NewOrderLine {
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price,
                options,
            });
        }

        // Atomic all-or-nothing: either every line's stock is decremented
        // here, or nothing changes and the commit aborts.
        if let Err(e) = self.store.reserve_stock(&wants).await {
            return Err(match e {
                StoreError::InsufficientStock { product_id } => CommitError::StockConflict {
                    product: self.product_name(product_id).await,
                },
                other => CommitError::Store(other),
            });
        }

        let order = match self
            .insert_with_fresh_number(user, &fields, total, order_lines)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // Roll the reservation back before surfacing the failure.
                if let Err(release_err) = self.store.release_stock(&wants).await {
                    tracing::error!(
                        user = %user,
                        error = %release_err,
                        "failed to release reserved stock after aborted commit"
                    );
                }
                return Err(e);
            }
        };

        // Cart clearing is last and independently retryable; a failure
        // here must not undo the persisted order.
        if let Err(e) = self.store.clear_cart(user).await {
            tracing::error!(user = %user, order_no = %order.order_no, error = %e,
                "order committed but cart could not be cleared");
        }

        let event = OrderCreated::from_order(&order);
        let operator_report = broadcast(
            self.notifier.as_ref(),
            &self.operator_ids,
            &event.operator_message(),
        )
        .await;

        tracing::info!(order_no = %order.order_no, total = %order.total,
            delivered = operator_report.delivered, failed = operator_report.failed,
            "order created");

        Ok(CommitReceipt {
            order,
            event,
            operator_report,
        })
    }

    /// Insert the order, regenerating the order number on collision.
    async fn insert_with_fresh_number(
        &self,
        user: UserId,
        fields: &CheckoutFields,
        total: Price,
        lines: Vec<NewOrderLine>,
    ) -> Result<Order, CommitError> {
        for _ in 0..MAX_ORDER_NO_ATTEMPTS {
            let order_no = self.numbers.next();
            let new_order = NewOrder {
                order_no: order_no.clone(),
                user_id: user,
                customer_name: fields.customer_name.clone(),
                customer_phone: fields.customer_phone.clone(),
                store_code: fields.store_code.clone(),
                total,
                created_at: Utc::now(),
                lines: lines.clone(),
            };
            match self.store.insert_order(new_order).await {
                Ok(order) => return Ok(order),
                Err(StoreError::Conflict(_)) => {
                    tracing::warn!(order_no = %order_no, "order number collision, regenerating");
                }
                Err(e) => return Err(CommitError::Store(e)),
            }
        }
        Err(CommitError::OrderNumberExhausted)
    }

    async fn product_name(&self, product_id: ProductId) -> String {
        match self.store.product(product_id).await {
            Ok(Some(product)) => product.name,
            _ => format!("product {product_id}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_order_numbers_distinct_in_tight_loop() {
        let generator = OrderNumberGenerator::new("DF");
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let no = generator.next();
            assert!(seen.insert(no.as_str().to_owned()), "duplicate {no}");
        }
    }

    #[test]
    fn test_integrity_failures_get_generic_message() {
        let err = CommitError::Store(StoreError::Internal("disk on fire".to_owned()));
        assert!(!err.user_message().contains("disk"));

        let err = CommitError::OrderNumberExhausted;
        assert!(err.user_message().contains("try again later"));
    }

    #[test]
    fn test_cart_changed_message_lists_issues() {
        let err = CommitError::CartChanged(vec![crate::services::validator::CartIssue {
            product_name: "Tea".to_owned(),
            kind: crate::services::validator::CartIssueKind::SoldOut,
        }]);
        let text = err.user_message();
        assert!(text.contains("Tea — sold out"));
    }
}
