//! Source rows and the two derived tables handed to visualization.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Fulfilment state shared by `orders.status` and `order_items.status`.
///
/// Stored in the warehouse as title-case strings (`"Complete"`); parsing is
/// case-insensitive and accepts `placed` as an alias for `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Complete,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// The exact string written to the `status` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Complete => "Complete",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "processing" | "placed" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "complete" => Ok(OrderStatus::Complete),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "returned" => Ok(OrderStatus::Returned),
            _ => Err(CoreError::InvalidStatus(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
}

/// One line of an order. `user_id` and `created_at` are denormalized from the
/// parent order, as in the warehouse export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub status: OrderStatus,
    pub sale_price: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// `None` when the source has no gender; such users only count overall.
    pub gender: Option<String>,
    pub age: i32,
}

/// A row of `customer_lifespan_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerLifespanRow {
    pub user_id: i64,
    pub first_purchase_date: NaiveDate,
    pub last_purchase_date: NaiveDate,
    pub customer_lifespan_days: i64,
}

/// A row of `customer_purchases_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPurchaseRow {
    pub order_id: i64,
    pub gender: String,
    pub purchase_value: f64,
}
