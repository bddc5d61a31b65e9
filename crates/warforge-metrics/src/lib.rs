//! Order analytics over the armory's sales records.
//!
//! The armory sells surplus parts and assembled robots; this crate
//! answers questions over its order history. All queries are pure
//! functions over a slice of [`Order`] values: no storage, no I/O, and
//! monetary amounts carried as [`rust_decimal::Decimal`] throughout so
//! totals and averages are exact.
//!
//! # Modules
//!
//! - [`order`] -- The order record types ([`Order`], [`Customer`],
//!   [`OrderItem`], [`OrderStatus`]).
//! - [`queries`] -- The analytics queries.
//!
//! [`Order`]: order::Order
//! [`Customer`]: order::Customer
//! [`OrderItem`]: order::OrderItem
//! [`OrderStatus`]: order::OrderStatus

pub mod order;
pub mod queries;

// Re-export primary types at crate root.
pub use order::{Category, Customer, Order, OrderItem, OrderStatus};
pub use queries::{
    average_delivered_order_value, best_selling_product, customers_with_more_orders_than,
    total_income_of_complete_orders, unique_order_cities,
};

/// Errors from the analytics queries.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// No product was ever sold in a non-cancelled order.
    #[error("no products sold")]
    NoProductsSold,

    /// An order-count threshold must be strictly positive.
    #[error("order count threshold must be positive, got {given}")]
    InvalidThreshold {
        /// The rejected value.
        given: i64,
    },
}
