//! Order lifecycle: post-creation status transitions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::instrument;

use dragonfruit_core::{OrderId, OrderStatus, TrackingNumber, TrackingNumberError, UserId};

use crate::events::OrderStatusChanged;
use crate::notify::Notifier;
use crate::store::{ShopStore, StoreError};

/// Errors from lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The order does not exist.
    #[error("order not found")]
    OrderNotFound,

    /// The requested transition is not allowed by the state machine.
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Marking an order shipped requires a tracking number.
    #[error("a tracking number is required to mark an order shipped")]
    TrackingRequired,

    /// The submitted tracking number is malformed.
    #[error(transparent)]
    InvalidTracking(#[from] TrackingNumberError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a status transition.
#[derive(Debug, Clone)]
pub struct TransitionReceipt {
    pub event: OrderStatusChanged,
    /// Whether the customer notification was delivered. A failed delivery
    /// never fails the transition; it is only reported here and logged.
    pub customer_notified: bool,
}

/// Drives order status transitions and the notifications they trigger.
///
/// The `shipped` transition needs a tracking number, collected through a
/// one-field sub-dialogue: [`start_ship`](Self::start_ship) arms the
/// prompt for an operator, and their next text input lands in
/// [`submit_tracking`](Self::submit_tracking).
pub struct OrderLifecycle {
    store: Arc<dyn ShopStore>,
    notifier: Arc<dyn Notifier>,
    /// Operators currently being prompted for a tracking number.
    pending_tracking: Mutex<HashMap<UserId, OrderId>>,
}

impl OrderLifecycle {
    /// Create a lifecycle service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            pending_tracking: Mutex::new(HashMap::new()),
        }
    }

    /// Move an order to a new status.
    ///
    /// Stamps the transition timestamp, persists the order, and notifies
    /// the customer. Notification failure does not fail the transition.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::OrderNotFound`]
    /// - [`LifecycleError::InvalidTransition`] per the state machine
    /// - [`LifecycleError::TrackingRequired`] when moving to `shipped`
    ///   without a tracking number
    #[instrument(skip(self, tracking))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        tracking: Option<TrackingNumber>,
    ) -> Result<TransitionReceipt, LifecycleError> {
        let mut order = self
            .store
            .order(order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound)?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(LifecycleError::InvalidTransition {
                from: old_status,
                to: new_status,
            });
        }

        if new_status == OrderStatus::Shipped
            && tracking.is_none()
            && order.tracking_number.is_none()
        {
            return Err(LifecycleError::TrackingRequired);
        }

        let now = Utc::now();
        let newly_tracked = tracking.is_some();
        if let Some(tracking) = tracking {
            order.tracking_number = Some(tracking);
        }
        order.status = new_status;
        order.stamp_status(new_status, now);
        self.store.save_order(&order).await?;

        let event = OrderStatusChanged {
            order_no: order.order_no.clone(),
            user_id: order.user_id,
            old_status,
            new_status,
            tracking_number: if newly_tracked {
                order.tracking_number.clone()
            } else {
                None
            },
            changed_at: now,
        };

        let customer_notified = match self
            .notifier
            .notify(order.user_id, &event.customer_message())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(order_no = %order.order_no, error = %e,
                    "status updated but customer notification failed");
                false
            }
        };

        tracing::info!(order_no = %order.order_no, from = %old_status, to = %new_status,
            "order status changed");

        Ok(TransitionReceipt {
            event,
            customer_notified,
        })
    }

    /// Begin the ship sub-dialogue: the operator's next text input is
    /// taken as the tracking number for `order_id`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::OrderNotFound`]
    /// - [`LifecycleError::InvalidTransition`] if the order cannot be
    ///   shipped from its current status
    pub async fn start_ship(&self, operator: UserId, order_id: OrderId) -> Result<(), LifecycleError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound)?;
        if !order.status.can_transition_to(OrderStatus::Shipped) {
            return Err(LifecycleError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Shipped,
            });
        }

        if let Ok(mut pending) = self.pending_tracking.lock() {
            pending.insert(operator, order_id);
        }
        Ok(())
    }

    /// Complete the ship sub-dialogue with the operator's text input.
    ///
    /// Returns `Ok(None)` if the operator has no pending ship prompt (the
    /// input belongs to someone else's flow). A malformed tracking number
    /// keeps the prompt armed so the operator can resend it.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidTracking`] if the input is not a valid
    ///   tracking number
    /// - Everything [`transition`](Self::transition) can return
    pub async fn submit_tracking(
        &self,
        operator: UserId,
        input: &str,
    ) -> Result<Option<TransitionReceipt>, LifecycleError> {
        let order_id = {
            let pending = self
                .pending_tracking
                .lock()
                .map_err(|e| StoreError::Internal(e.to_string()))?;
            match pending.get(&operator) {
                Some(order_id) => *order_id,
                None => return Ok(None),
            }
        };

        let tracking = TrackingNumber::parse(input)?;

        let receipt = self
            .transition(order_id, OrderStatus::Shipped, Some(tracking))
            .await?;

        if let Ok(mut pending) = self.pending_tracking.lock() {
            pending.remove(&operator);
        }

        Ok(Some(receipt))
    }

    /// Drop an operator's pending ship prompt, if any.
    pub fn cancel_ship(&self, operator: UserId) -> bool {
        self.pending_tracking
            .lock()
            .map(|mut pending| pending.remove(&operator).is_some())
            .unwrap_or(false)
    }

    /// Send a free-form message to an order's customer.
    ///
    /// Returns whether the message was delivered; delivery failure is
    /// logged, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::OrderNotFound`] if the order does not
    /// exist.
    pub async fn notify_customer(
        &self,
        order_id: OrderId,
        text: &str,
    ) -> Result<bool, LifecycleError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound)?;

        let message = format!("Order {}\n\n{text}", order.order_no);
        match self.notifier.notify(order.user_id, &message).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!(order_no = %order.order_no, error = %e,
                    "customer notification failed");
                Ok(false)
            }
        }
    }
}
