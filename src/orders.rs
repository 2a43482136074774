//! Order creation protocol: cart validation, order insert, one item per line.
//!
//! The total is computed client-side and trusted as given; the server does
//! not recompute it from the item prices. There is no rollback if an item
//! insert fails after the order record exists.

use crate::error::ApiError;
use crate::model::{InsertOrder, InsertOrderItem, Order};
use crate::store::Store;
use chrono::{DateTime, Utc};

/// One validated cart line. `price` is the unit price at order time.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: u32,
    pub price: f64,
}

fn validate(total: f64, lines: &[CartLine]) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if !total.is_finite() || total < 0.0 {
        errors.push("total must be a non-negative number".to_string());
    }
    for (i, line) in lines.iter().enumerate() {
        if line.product_id <= 0 {
            errors.push(format!("items[{}].product.id must be a valid id", i));
        }
        if line.quantity < 1 {
            errors.push(format!("items[{}].quantity must be at least 1", i));
        }
        if !line.price.is_finite() || line.price < 0.0 {
            errors.push(format!("items[{}].product.price must be a non-negative number", i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_fields("Invalid order data", errors))
    }
}

/// Validates the cart, creates the order, then creates one item per line.
///
/// No referential check is made that `user_id` or the product ids exist in
/// the store; the item rows snapshot whatever price the caller supplied.
pub fn place_order(
    store: &mut Store,
    user_id: i64,
    total: f64,
    order_date: Option<DateTime<Utc>>,
    lines: &[CartLine],
) -> Result<Order, ApiError> {
    validate(total, lines)?;

    let order = store.create_order(InsertOrder {
        user_id,
        total,
        order_date: order_date.unwrap_or_else(Utc::now),
    });

    for line in lines {
        store.create_order_item(InsertOrderItem {
            order_id: order.id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        });
    }

    Ok(order)
}
