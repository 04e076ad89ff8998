//! Rebuilds the two derived tables for downstream visualization.
//!
//! Both are disposable caches: each call drops and recreates the table from
//! the source tables, so re-running the pipeline is idempotent.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::model::{CustomerLifespanRow, CustomerPurchaseRow};

use crate::queries::lifespan::customer_lifespan_sql;
use crate::queries::purchase_value::order_gender_values_sql;
use crate::schema::{CUSTOMER_LIFESPAN_TABLE, CUSTOMER_PURCHASES_TABLE};
use crate::DuckDbBackend;

fn count_rows(conn: &duckdb::Connection, table: &str) -> Result<usize> {
    let count: i64 = conn
        .prepare(&format!("SELECT COUNT(*) FROM {table}"))?
        .query_row([], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let prefix = raw.get(0..10).ok_or_else(|| anyhow!("invalid date: {raw}"))?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

pub async fn materialize_customer_lifespan_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
) -> Result<usize> {
    let conn = db.conn.lock().await;
    let sql = format!(
        r#"CREATE OR REPLACE TABLE {CUSTOMER_LIFESPAN_TABLE} AS
{base}
SELECT
    user_id,
    first_purchase_date,
    last_purchase_date,
    customer_lifespan_days
FROM customer_lifespan
ORDER BY user_id ASC"#,
        base = customer_lifespan_sql(exclusion)
    );
    conn.execute_batch(&sql)
        .with_context(|| format!("materializing {CUSTOMER_LIFESPAN_TABLE}"))?;
    let rows = count_rows(&conn, CUSTOMER_LIFESPAN_TABLE)?;
    tracing::info!(rows, table = CUSTOMER_LIFESPAN_TABLE, "Materialized derived table");
    Ok(rows)
}

pub async fn materialize_customer_purchases_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
) -> Result<usize> {
    let conn = db.conn.lock().await;
    let sql = format!(
        r#"CREATE OR REPLACE TABLE {CUSTOMER_PURCHASES_TABLE} AS
{base}
SELECT
    order_id,
    gender,
    purchase_value
FROM order_gender_values
ORDER BY order_id ASC, gender ASC"#,
        base = order_gender_values_sql(exclusion)
    );
    conn.execute_batch(&sql)
        .with_context(|| format!("materializing {CUSTOMER_PURCHASES_TABLE}"))?;
    let rows = count_rows(&conn, CUSTOMER_PURCHASES_TABLE)?;
    tracing::info!(rows, table = CUSTOMER_PURCHASES_TABLE, "Materialized derived table");
    Ok(rows)
}

impl DuckDbBackend {
    /// Read back `customer_lifespan_table`. Errors if it was never materialized.
    pub async fn customer_lifespan_rows(&self) -> Result<Vec<CustomerLifespanRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT
                    user_id,
                    CAST(first_purchase_date AS VARCHAR),
                    CAST(last_purchase_date AS VARCHAR),
                    customer_lifespan_days
                FROM {CUSTOMER_LIFESPAN_TABLE}
                ORDER BY user_id ASC"#
            ))
            .with_context(|| format!("reading {CUSTOMER_LIFESPAN_TABLE}"))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (user_id, first, last, customer_lifespan_days) = row?;
            out.push(CustomerLifespanRow {
                user_id,
                first_purchase_date: parse_date(&first)?,
                last_purchase_date: parse_date(&last)?,
                customer_lifespan_days,
            });
        }
        Ok(out)
    }

    /// Read back `customer_purchases_table`. Errors if it was never materialized.
    pub async fn customer_purchase_rows(&self) -> Result<Vec<CustomerPurchaseRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT order_id, gender, purchase_value
                FROM {CUSTOMER_PURCHASES_TABLE}
                ORDER BY order_id ASC, gender ASC"#
            ))
            .with_context(|| format!("reading {CUSTOMER_PURCHASES_TABLE}"))?;
        let rows = stmt.query_map([], |row| {
            Ok(CustomerPurchaseRow {
                order_id: row.get(0)?,
                gender: row.get(1)?,
                purchase_value: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_date;
    use chrono::NaiveDate;

    #[test]
    fn parse_date_accepts_timestamp_prefix() {
        assert_eq!(
            parse_date("2023-06-01 00:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
        );
        assert!(parse_date("06/01").is_err());
    }
}
