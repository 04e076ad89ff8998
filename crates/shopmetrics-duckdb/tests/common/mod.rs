#![allow(dead_code)]

use chrono::NaiveDateTime;
use shopmetrics_core::model::{Order, OrderItem, OrderStatus, Product, User};
use shopmetrics_duckdb::DuckDbBackend;

pub fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").expect("timestamp")
}

pub async fn add_user(db: &DuckDbBackend, id: i64, gender: &str) {
    db.insert_users(&[User {
        id,
        gender: Some(gender.to_string()),
        age: 30,
    }])
    .await
    .expect("insert user");
}

/// A users row whose `gender` column is NULL.
pub async fn add_user_without_gender(db: &DuckDbBackend, id: i64) {
    db.insert_users(&[User {
        id,
        gender: None,
        age: 30,
    }])
    .await
    .expect("insert user");
}

pub async fn add_product(db: &DuckDbBackend, id: i64, name: &str) {
    db.insert_products(&[Product {
        id,
        name: name.to_string(),
    }])
    .await
    .expect("insert product");
}

/// Insert an order plus one item per `(product_id, sale_price)` line. Items
/// carry the order's status and get ids `order_id * 100 + line`.
pub async fn place_order(
    db: &DuckDbBackend,
    order_id: i64,
    user_id: i64,
    status: OrderStatus,
    created_at: &str,
    lines: &[(i64, f64)],
) {
    let created_at = ts(created_at);
    db.insert_orders(&[Order {
        order_id,
        user_id,
        status,
        created_at,
    }])
    .await
    .expect("insert order");

    let items: Vec<OrderItem> = lines
        .iter()
        .enumerate()
        .map(|(idx, (product_id, sale_price))| OrderItem {
            id: order_id * 100 + idx as i64,
            order_id,
            user_id,
            product_id: *product_id,
            status,
            sale_price: *sale_price,
            created_at,
        })
        .collect();
    db.insert_order_items(&items).await.expect("insert items");
}

/// Insert a single item with its own status. No order row is created, so
/// pointing `order_id` at a missing order yields an orphan item.
#[allow(clippy::too_many_arguments)]
pub async fn add_item(
    db: &DuckDbBackend,
    id: i64,
    order_id: i64,
    user_id: i64,
    product_id: i64,
    status: OrderStatus,
    sale_price: f64,
    created_at: &str,
) {
    db.insert_order_items(&[OrderItem {
        id,
        order_id,
        user_id,
        product_id,
        status,
        sale_price,
        created_at: ts(created_at),
    }])
    .await
    .expect("insert item");
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
