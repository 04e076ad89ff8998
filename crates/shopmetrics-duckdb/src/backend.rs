use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use shopmetrics_core::model::{Order, OrderItem, Product, User};

use crate::schema::init_sql;

fn timestamp_param(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// A DuckDB-backed warehouse holding the four source tables and the two
/// derived tables.
///
/// The connection lives behind `Arc<Mutex<_>>`, so passes run one at a time
/// and the struct can be shared as `Arc<dyn InsightsBackend>`.
///
/// Memory and thread limits are enforced by [`init_sql`] at open time.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Source tables are created if they do not already exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests; data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Insert or replace users. No-op for an empty slice.
    pub async fn insert_users(&self, users: &[User]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for user in users {
            tx.execute(
                "INSERT OR REPLACE INTO users (id, gender, age) VALUES (?1, ?2, ?3)",
                duckdb::params![user.id, user.gender, user.age],
            )?;
        }
        tx.commit()?;
        tracing::debug!("Inserted {} users", users.len());
        Ok(())
    }

    pub async fn insert_products(&self, products: &[Product]) -> Result<()> {
        if products.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for product in products {
            tx.execute(
                "INSERT OR REPLACE INTO products (id, name) VALUES (?1, ?2)",
                duckdb::params![product.id, product.name],
            )?;
        }
        tx.commit()?;
        tracing::debug!("Inserted {} products", products.len());
        Ok(())
    }

    /// Plain `INSERT`: DuckDB refuses upserts that rewrite indexed columns,
    /// so re-inserting an existing `order_id` is an error.
    pub async fn insert_orders(&self, orders: &[Order]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for order in orders {
            tx.execute(
                r#"INSERT INTO orders (order_id, user_id, status, created_at)
                   VALUES (?1, ?2, ?3, CAST(?4 AS TIMESTAMP))"#,
                duckdb::params![
                    order.order_id,
                    order.user_id,
                    order.status.as_str(),
                    timestamp_param(&order.created_at),
                ],
            )?;
        }
        tx.commit()?;
        tracing::debug!("Inserted {} orders", orders.len());
        Ok(())
    }

    pub async fn insert_order_items(&self, items: &[OrderItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for item in items {
            tx.execute(
                r#"INSERT INTO order_items (
                    id, order_id, user_id, product_id, status, sale_price, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, CAST(?6 AS DECIMAL(12, 2)), CAST(?7 AS TIMESTAMP)
                )"#,
                duckdb::params![
                    item.id,
                    item.order_id,
                    item.user_id,
                    item.product_id,
                    item.status.as_str(),
                    item.sale_price,
                    timestamp_param(&item.created_at),
                ],
            )?;
        }
        tx.commit()?;
        tracing::debug!("Inserted {} order items", items.len());
        Ok(())
    }
}
