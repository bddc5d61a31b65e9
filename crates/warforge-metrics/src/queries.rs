//! Analytics queries over the order history.
//!
//! Every query is a pure function over a slice of orders. Monetary
//! results are exact [`Decimal`] values; only the delivered-order
//! average is rounded, to 2 decimal places with half-up rounding.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::MetricsError;
use crate::order::{Customer, Order, OrderStatus};

/// Every city that placed at least one order.
pub fn unique_order_cities(orders: &[Order]) -> BTreeSet<String> {
    orders
        .iter()
        .map(|order| order.customer.city.clone())
        .collect()
}

/// Whether an order counts as completed for income purposes.
const fn is_completed(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Shipped | OrderStatus::Delivered)
}

/// Sum the totals of the given orders, skipping any order whose total is
/// not strictly positive (a fully-returned order earns nothing).
fn sum_positive_totals<'a>(orders: impl Iterator<Item = &'a Order>) -> Decimal {
    orders
        .map(Order::total)
        .filter(|total| *total > Decimal::ZERO)
        .sum()
}

/// Total income over all shipped and delivered orders.
pub fn total_income_of_complete_orders(orders: &[Order]) -> Decimal {
    sum_positive_totals(orders.iter().filter(|o| is_completed(o.status)))
}

/// The product with the highest unit sales across all non-cancelled
/// orders. Ties resolve to the lexicographically smallest name.
///
/// # Errors
///
/// Returns [`MetricsError::NoProductsSold`] if no non-cancelled order
/// has any items.
pub fn best_selling_product(orders: &[Order]) -> Result<String, MetricsError> {
    let mut sales: BTreeMap<&str, i64> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.status != OrderStatus::Cancelled) {
        for item in &order.items {
            let count = sales.entry(item.product_name.as_str()).or_insert(0);
            *count = count.saturating_add(item.quantity);
        }
    }
    sales
        .into_iter()
        // Strictly-greater keeps the first (smallest) name on ties.
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .map(|(name, _)| name.to_owned())
        .ok_or(MetricsError::NoProductsSold)
}

/// Average value of delivered orders, rounded to 2 decimal places with
/// half-up rounding. Orders with non-positive totals are excluded from
/// both the sum and the count; no qualifying orders yields zero.
pub fn average_delivered_order_value(orders: &[Order]) -> Decimal {
    let delivered = || {
        orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
    };
    let count = delivered()
        .map(Order::total)
        .filter(|total| *total > Decimal::ZERO)
        .count();
    let Ok(count) = i64::try_from(count) else {
        return Decimal::ZERO;
    };
    if count == 0 {
        return Decimal::ZERO;
    }
    let total = sum_positive_totals(delivered());
    (total / Decimal::from(count))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Every customer who placed strictly more than `threshold` orders.
///
/// The result is ordered by customer id. Orders of every status count,
/// including cancelled ones.
///
/// # Errors
///
/// Returns [`MetricsError::InvalidThreshold`] if `threshold` is zero or
/// negative.
pub fn customers_with_more_orders_than(
    orders: &[Order],
    threshold: i64,
) -> Result<Vec<Customer>, MetricsError> {
    if threshold <= 0 {
        return Err(MetricsError::InvalidThreshold { given: threshold });
    }
    let mut counts: BTreeMap<&str, (i64, &Customer)> = BTreeMap::new();
    for order in orders {
        let entry = counts
            .entry(order.customer.customer_id.as_str())
            .or_insert((0, &order.customer));
        entry.0 = entry.0.saturating_add(1);
    }
    Ok(counts
        .into_values()
        .filter(|(count, _)| *count > threshold)
        .map(|(_, customer)| customer.clone())
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use crate::order::{Category, OrderItem};

    use super::*;

    fn customer(id: &str, name: &str, city: &str) -> Customer {
        Customer {
            customer_id: id.to_owned(),
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_lowercase()),
            registered_at: Utc::now(),
            city: city.to_owned(),
        }
    }

    fn item(name: &str, quantity: i64, price: &str, category: Category) -> OrderItem {
        OrderItem {
            product_name: name.to_owned(),
            quantity,
            price: price.parse().unwrap(),
            category,
        }
    }

    fn order(id: &str, customer: Customer, items: Vec<OrderItem>, status: OrderStatus) -> Order {
        Order {
            order_id: id.to_owned(),
            order_date: Utc::now(),
            customer,
            items,
            status,
        }
    }

    /// A fixed order book: three customers, three cities, a mix of
    /// statuses, one return.
    fn order_book() -> Vec<Order> {
        let nadia = customer("1111", "Nadia", "Kharkiv");
        let mirek = customer("2222", "Mirek", "Krakow");
        let anna = customer("3333", "Anna", "Tallinn");
        vec![
            order(
                "0001",
                nadia.clone(),
                vec![
                    item("Servo Hand", 3, "20.10", Category::Parts),
                    item("Optic Head", 2, "40.00", Category::Parts),
                ],
                OrderStatus::Delivered,
            ),
            order(
                "0002",
                nadia,
                vec![item("Torso Frame", 1, "1250.50", Category::Parts)],
                OrderStatus::Cancelled,
            ),
            order(
                "0003",
                anna.clone(),
                vec![
                    item("Plating Kit", 2, "55.55", Category::Armor),
                    item("Shield Coil", 1, "90.30", Category::Armor),
                ],
                OrderStatus::Delivered,
            ),
            order(
                "0004",
                anna.clone(),
                vec![item("Servo Hand", 3, "20.20", Category::Parts)],
                OrderStatus::Cancelled,
            ),
            order(
                "0005",
                anna.clone(),
                vec![item("Servo Hand", 3, "20.20", Category::Parts)],
                OrderStatus::Delivered,
            ),
            order(
                "0006",
                anna.clone(),
                vec![item("Torque Wrench", 2, "20.10", Category::Tools)],
                OrderStatus::Delivered,
            ),
            order(
                "0007",
                anna.clone(),
                vec![item("Sentinel Mk I", 1, "900.30", Category::Robots)],
                OrderStatus::Delivered,
            ),
            order(
                "0008",
                anna,
                vec![item("Plating Kit", 1, "55.55", Category::Armor)],
                OrderStatus::Shipped,
            ),
            order(
                "0009",
                mirek.clone(),
                vec![item("Torso Frame", 1, "1250.50", Category::Parts)],
                OrderStatus::Delivered,
            ),
            order(
                "0010",
                mirek.clone(),
                vec![item("Torque Wrench", 2, "20.10", Category::Tools)],
                OrderStatus::New,
            ),
            order(
                "0011",
                mirek,
                vec![item("Feed Line", 1, "200.20", Category::Parts)],
                OrderStatus::Processing,
            ),
        ]
    }

    #[test]
    fn cities_are_distinct() {
        let cities = unique_order_cities(&order_book());
        let expected: BTreeSet<String> = ["Kharkiv", "Krakow", "Tallinn"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        assert_eq!(cities, expected);
    }

    #[test]
    fn no_orders_no_cities() {
        assert!(unique_order_cities(&[]).is_empty());
    }

    #[test]
    fn income_counts_only_shipped_and_delivered() {
        let income = total_income_of_complete_orders(&order_book());
        // 140.30 + 201.40 + 60.60 + 40.20 + 900.30 + 55.55 + 1250.50
        assert_eq!(income, "2648.85".parse::<Decimal>().unwrap());
    }

    #[test]
    fn income_skips_fully_returned_orders() {
        let nadia = customer("1111", "Nadia", "Kharkiv");
        let orders = vec![
            order(
                "0001",
                nadia.clone(),
                vec![item("Servo Hand", 2, "20.10", Category::Parts)],
                OrderStatus::Delivered,
            ),
            order(
                "0002",
                nadia,
                vec![item("Torso Frame", -1, "1250.50", Category::Parts)],
                OrderStatus::Delivered,
            ),
        ];
        assert_eq!(
            total_income_of_complete_orders(&orders),
            "40.20".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn best_seller_excludes_cancelled_orders() {
        // Servo Hand sells 6 in non-cancelled orders (3 + 3); the
        // cancelled 3 must not push another product below it.
        let best = best_selling_product(&order_book()).unwrap();
        assert_eq!(best, "Servo Hand");
    }

    #[test]
    fn best_seller_with_no_sales_is_an_error() {
        let orders = vec![order(
            "0001",
            customer("1111", "Nadia", "Kharkiv"),
            vec![item("Torso Frame", 1, "1250.50", Category::Parts)],
            OrderStatus::Cancelled,
        )];
        assert!(matches!(
            best_selling_product(&orders),
            Err(MetricsError::NoProductsSold)
        ));
        assert!(matches!(
            best_selling_product(&[]),
            Err(MetricsError::NoProductsSold)
        ));
    }

    #[test]
    fn best_seller_tie_resolves_to_smallest_name() {
        let nadia = customer("1111", "Nadia", "Kharkiv");
        let orders = vec![order(
            "0001",
            nadia,
            vec![
                item("Optic Head", 2, "40.00", Category::Parts),
                item("Feed Line", 2, "200.20", Category::Parts),
            ],
            OrderStatus::Delivered,
        )];
        assert_eq!(best_selling_product(&orders).unwrap(), "Feed Line");
    }

    #[test]
    fn average_is_rounded_half_up_to_cents() {
        let avg = average_delivered_order_value(&order_book());
        // Six delivered orders with positive totals:
        // (140.30 + 201.40 + 60.60 + 40.20 + 900.30 + 1250.50) / 6
        assert_eq!(avg, "432.22".parse::<Decimal>().unwrap());
    }

    #[test]
    fn average_of_no_delivered_orders_is_zero() {
        let orders = vec![order(
            "0001",
            customer("1111", "Nadia", "Kharkiv"),
            vec![item("Servo Hand", 2, "20.10", Category::Parts)],
            OrderStatus::New,
        )];
        assert_eq!(average_delivered_order_value(&orders), Decimal::ZERO);
        assert_eq!(average_delivered_order_value(&[]), Decimal::ZERO);
    }

    #[test]
    fn average_excludes_returned_orders_from_the_count() {
        let nadia = customer("1111", "Nadia", "Kharkiv");
        let orders = vec![
            order(
                "0001",
                nadia.clone(),
                vec![item("Servo Hand", 2, "20.10", Category::Parts)],
                OrderStatus::Delivered,
            ),
            order(
                "0002",
                nadia,
                vec![item("Torso Frame", -1, "1250.50", Category::Parts)],
                OrderStatus::Delivered,
            ),
        ];
        // The returned order affects neither the sum nor the divisor.
        assert_eq!(
            average_delivered_order_value(&orders),
            "40.20".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn frequent_customers_above_threshold() {
        let frequent = customers_with_more_orders_than(&order_book(), 3).unwrap();
        // Only Anna placed more than three orders.
        assert_eq!(frequent.len(), 1);
        assert_eq!(frequent.first().unwrap().name, "Anna");
    }

    #[test]
    fn threshold_counts_every_status() {
        // Mirek's three orders are New, Processing, and Delivered.
        let frequent = customers_with_more_orders_than(&order_book(), 1).unwrap();
        let names: Vec<&str> = frequent.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Nadia", "Mirek", "Anna"]);
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        for given in [0, -3] {
            assert!(matches!(
                customers_with_more_orders_than(&order_book(), given),
                Err(MetricsError::InvalidThreshold { .. })
            ));
        }
    }
}
