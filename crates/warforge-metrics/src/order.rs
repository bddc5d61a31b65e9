//! Order record types for the armory's sales history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The lifecycle of an order. Only [`Shipped`] and [`Delivered`] orders
/// count as completed income; [`Cancelled`] orders are excluded from
/// sales rankings.
///
/// [`Shipped`]: OrderStatus::Shipped
/// [`Delivered`]: OrderStatus::Delivered
/// [`Cancelled`]: OrderStatus::Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed but not yet picked up.
    New,
    /// Being prepared for shipment.
    Processing,
    /// Handed to the courier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before delivery.
    Cancelled,
}

/// What shelf of the armory an item comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Loose robot parts.
    Parts,
    /// Fully assembled robots.
    Robots,
    /// Plating and shielding.
    Armor,
    /// Assembly and maintenance tooling.
    Tools,
}

/// A customer of the armory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Stable customer identifier.
    pub customer_id: String,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// When the customer registered.
    pub registered_at: DateTime<Utc>,
    /// The city orders ship to.
    pub city: String,
}

/// One line of an order.
///
/// Quantities are signed: a negative quantity records a return, which
/// can drive an order's total negative. Queries over income ignore
/// orders whose total is not positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product sold.
    pub product_name: String,
    /// Units sold (negative for returns).
    pub quantity: i64,
    /// Price per unit.
    pub price: Decimal,
    /// The product's shelf.
    pub category: Category,
}

impl OrderItem {
    /// The line total: price times quantity.
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A single order: one customer, one or more items, one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable order identifier.
    pub order_id: String,
    /// When the order was placed.
    pub order_date: DateTime<Utc>,
    /// Who placed it.
    pub customer: Customer,
    /// The order lines.
    pub items: Vec<OrderItem>,
    /// Current lifecycle state.
    pub status: OrderStatus,
}

impl Order {
    /// The order total: the sum of all line totals.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(OrderItem::total).sum()
    }
}
