//! Domain models for the fulfillment core.

pub mod cart;
pub mod catalog;
pub mod order;

pub use cart::{CartLine, NewCartLine};
pub use catalog::{Category, NewCategory, NewProduct, NewProductOption, Product, ProductOption};
pub use order::{NewOrder, NewOrderLine, Order, OrderLine, OrderLineOption};
