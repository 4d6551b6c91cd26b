//! Core types for Dragonfruit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod name;
pub mod order_no;
pub mod phone;
pub mod price;
pub mod status;
pub mod store_code;
pub mod tracking;

pub use id::*;
pub use name::{CustomerName, CustomerNameError};
pub use order_no::OrderNumber;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use price::{Price, PriceError};
pub use status::OrderStatus;
pub use store_code::{StoreCode, StoreCodeError};
pub use tracking::{TrackingNumber, TrackingNumberError};
