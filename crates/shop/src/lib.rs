//! Dragonfruit Shop - Cart-to-order fulfillment core.
//!
//! This crate turns a per-user shopping cart into an immutable order
//! through a multi-step checkout dialogue, and drives the order's status
//! lifecycle afterwards. It is a library: the conversational transport
//! (buttons, messages) and all rendering live in the surrounding frontend,
//! which talks to this crate through a handful of capability traits.
//!
//! # Architecture
//!
//! - [`store::ShopStore`] - persisted catalog/cart/order storage. The
//!   in-process [`store::MemoryStore`] implements it for tests and
//!   development; a production deployment plugs in its own backend.
//! - [`notify::Notifier`] - "deliver a message to a user". Delivery
//!   failures are swallowed per-recipient and counted, never surfaced as
//!   aborting the triggering operation.
//! - [`reply::ReplySink`] - "a place to send a reply" for the dialogue,
//!   with message-originated and callback-originated variants.
//!
//! # Services
//!
//! - [`services::CartService`] - add/adjust/remove cart lines with live
//!   stock ceilings and option pricing
//! - [`services::CartValidator`] - reconcile a cart against catalog drift
//! - [`services::CheckoutDialogue`] - the strictly-ordered name/phone/store
//!   collection conversation
//! - [`services::OrderService`] - atomic cart-to-order commit
//! - [`services::OrderLifecycle`] - post-creation status transitions and
//!   customer notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod events;
pub mod models;
pub mod notify;
pub mod reply;
pub mod services;
pub mod store;

pub use config::{ConfigError, ShopConfig};
