//! Order lifecycle events exposed to the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dragonfruit_core::{OrderNumber, OrderStatus, Price, TrackingNumber, UserId};

use crate::models::Order;

/// Emitted once per successful commit.
///
/// Carries everything the notification collaborator needs to alert
/// operators without re-reading the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCreated {
    pub order_no: OrderNumber,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_phone: String,
    pub store_code: String,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderCreatedLine>,
}

/// One line of an [`OrderCreated`] event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCreatedLine {
    pub product_name: String,
    pub quantity: u32,
    pub subtotal: Price,
}

impl OrderCreated {
    /// Build the event from a freshly committed order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_no: order.order_no.clone(),
            user_id: order.user_id,
            customer_name: order.customer_name.as_str().to_owned(),
            customer_phone: order.customer_phone.as_str().to_owned(),
            store_code: order.store_code.as_str().to_owned(),
            total: order.total,
            created_at: order.created_at,
            lines: order
                .lines
                .iter()
                .map(|l| OrderCreatedLine {
                    product_name: l.product_name.clone(),
                    quantity: l.quantity,
                    subtotal: l.subtotal().unwrap_or(Price::ZERO),
                })
                .collect(),
        }
    }

    /// The message broadcast to operators when an order lands.
    #[must_use]
    pub fn operator_message(&self) -> String {
        let mut text = format!(
            "New order {}\n\
             Customer: {}\n\
             Phone: {}\n\
             Pickup store: {}\n\n\
             Items:\n",
            self.order_no, self.customer_name, self.customer_phone, self.store_code
        );
        for line in &self.lines {
            text.push_str(&format!(
                "- {} x{} = {}\n",
                line.product_name, line.quantity, line.subtotal
            ));
        }
        text.push_str(&format!(
            "Total: {}\nPlaced at: {}",
            self.total,
            self.created_at.format("%Y-%m-%d %H:%M")
        ));
        text
    }

    /// The confirmation message sent to the ordering customer.
    #[must_use]
    pub fn customer_message(&self) -> String {
        format!(
            "Order placed!\n\n\
             Order number: {}\n\
             Name: {}\n\
             Phone: {}\n\
             Pickup store: {}\n\
             Total: {}\n\
             Placed at: {}\n\n\
             Thank you for your purchase!",
            self.order_no,
            self.customer_name,
            self.customer_phone,
            self.store_code,
            self.total,
            self.created_at.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Emitted on every order status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderStatusChanged {
    pub order_no: OrderNumber,
    pub user_id: UserId,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    /// Set when this transition attached a tracking number.
    pub tracking_number: Option<TrackingNumber>,
    pub changed_at: DateTime<Utc>,
}

impl OrderStatusChanged {
    /// The notification sent to the order's customer.
    #[must_use]
    pub fn customer_message(&self) -> String {
        let mut text = format!(
            "Your order {} has been updated:\n{} → {}",
            self.order_no, self.old_status, self.new_status
        );
        if let Some(tracking) = &self.tracking_number {
            text.push_str(&format!("\n\nTracking number: {tracking}"));
        }
        if self.new_status == OrderStatus::Arrived {
            text.push_str("\n\nYour items have arrived at the pickup store, please collect them soon!");
        }
        text
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dragonfruit_core::OrderStatus;

    use super::*;

    #[test]
    fn test_status_change_message_includes_tracking() {
        let event = OrderStatusChanged {
            order_no: OrderNumber::generate("DF", Utc::now(), &mut rand::rng()),
            user_id: UserId::new(1),
            old_status: OrderStatus::Pending,
            new_status: OrderStatus::Shipped,
            tracking_number: Some(TrackingNumber::parse("TRK123").unwrap()),
            changed_at: Utc::now(),
        };

        let text = event.customer_message();
        assert!(text.contains("pending → shipped"));
        assert!(text.contains("TRK123"));
    }

    #[test]
    fn test_arrival_message_mentions_pickup() {
        let event = OrderStatusChanged {
            order_no: OrderNumber::generate("DF", Utc::now(), &mut rand::rng()),
            user_id: UserId::new(1),
            old_status: OrderStatus::Shipped,
            new_status: OrderStatus::Arrived,
            tracking_number: None,
            changed_at: Utc::now(),
        };

        assert!(event.customer_message().contains("pickup store"));
    }
}
