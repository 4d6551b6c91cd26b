//! Order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dragonfruit_core::{
    CustomerName, OptionId, OrderId, OrderNumber, OrderStatus, PhoneNumber, Price, ProductId,
    StoreCode, TrackingNumber, UserId,
};

/// A committed order.
///
/// Everything except `status`, `tracking_number`, and the per-status
/// timestamps is frozen at commit time. Orders are never deleted;
/// cancellation is a status, not a removal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub order_no: OrderNumber,
    pub user_id: UserId,
    pub customer_name: CustomerName,
    pub customer_phone: PhoneNumber,
    pub store_code: StoreCode,
    pub status: OrderStatus,
    pub tracking_number: Option<TrackingNumber>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Sum of line subtotals at commit time.
    pub total: Price,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Record the timestamp for a status the order has just entered.
    pub fn stamp_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        match status {
            OrderStatus::Pending => {}
            OrderStatus::Confirmed => self.confirmed_at = Some(at),
            OrderStatus::Shipped => self.shipped_at = Some(at),
            OrderStatus::Arrived => self.arrived_at = Some(at),
            OrderStatus::Completed => self.completed_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
        }
    }
}

/// One line of a committed order.
///
/// `unit_price` is the product's base price plus the selected option
/// prices, captured at purchase time. It never follows later catalog
/// price changes. `product_name` is copied for the same reason: deleting
/// the product must not touch historical orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub options: Vec<OrderLineOption>,
}

impl OrderLine {
    /// Line subtotal: unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        self.unit_price.times(self.quantity)
    }
}

/// An option copied by value onto an order line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineOption {
    pub option_id: OptionId,
    pub name: String,
    pub price: Price,
}

/// Fields for inserting a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: OrderNumber,
    pub user_id: UserId,
    pub customer_name: CustomerName,
    pub customer_phone: PhoneNumber,
    pub store_code: StoreCode,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<NewOrderLine>,
}

/// Fields for one line of a new order.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub options: Vec<OrderLineOption>,
}
