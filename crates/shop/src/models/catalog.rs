//! Catalog records: products, options, categories.

use serde::{Deserialize, Serialize};

use dragonfruit_core::{CategoryId, OptionId, Price, ProductId};

/// A sellable product.
///
/// `stock` and `is_active` are the live values the cart engine checks
/// against; both change underneath open carts, which is exactly what the
/// cart validator reconciles. Products referenced by historical orders are
/// never cascaded into them: order lines copy name and price at purchase
/// time, so a later product deletion only detaches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Base unit price, before options.
    pub price: Price,
    /// Units currently available for sale.
    pub stock: u32,
    pub is_active: bool,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
}

/// Fields for inserting a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub is_active: bool,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
}

/// An add-on option attached to a product (e.g. "extra large" or
/// "gift wrap"), with an additive price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductOption {
    pub id: OptionId,
    pub product_id: ProductId,
    pub name: String,
    /// Additive price on top of the product's base price.
    pub price: Price,
}

/// Fields for inserting a new product option.
#[derive(Debug, Clone)]
pub struct NewProductOption {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub is_active: bool,
    pub display_order: i32,
}

/// Fields for inserting a new category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub display_order: i32,
}
