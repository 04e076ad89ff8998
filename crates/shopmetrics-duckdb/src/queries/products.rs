use anyhow::Result;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::ProductSales;

use crate::queries::qualifying::qualifying_ctes;
use crate::DuckDbBackend;

/// Products with this many qualifying units count as underperforming.
const BOTTOM_SELLER_QUANTITY: i64 = 1;

/// Per-product unit counts. Inner join: items whose product is unknown, and
/// products that sold nothing, never appear.
fn product_counts_sql(exclusion: &ExclusionPolicy) -> String {
    format!(
        r#"
WITH {ctes},
product_counts AS (
    SELECT
        p.name AS product_name,
        COUNT(*) AS quantity_ordered
    FROM qualifying_items qi
    JOIN products p
      ON p.id = qi.product_id
    GROUP BY p.name
)"#,
        ctes = qualifying_ctes(exclusion)
    )
}

fn collect_rows(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[&dyn duckdb::types::ToSql],
) -> Result<Vec<ProductSales>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok(ProductSales {
            product_name: row.get(0)?,
            quantity_ordered: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub async fn get_top_sellers_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
    limit: Option<usize>,
) -> Result<Vec<ProductSales>> {
    let conn = db.conn.lock().await;
    let base = product_counts_sql(exclusion);

    let rows = match limit {
        Some(limit) => {
            let sql = format!(
                "{base}
SELECT product_name, quantity_ordered
FROM product_counts
ORDER BY quantity_ordered DESC, product_name ASC
LIMIT ?1"
            );
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            collect_rows(&conn, &sql, &[&limit])?
        }
        None => {
            let sql = format!(
                "{base}
SELECT product_name, quantity_ordered
FROM product_counts
ORDER BY quantity_ordered DESC, product_name ASC"
            );
            collect_rows(&conn, &sql, &[])?
        }
    };

    tracing::debug!(products = rows.len(), "Computed top sellers");
    Ok(rows)
}

pub async fn get_bottom_sellers_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
) -> Result<Vec<ProductSales>> {
    let conn = db.conn.lock().await;
    let sql = format!(
        "{base}
SELECT product_name, quantity_ordered
FROM product_counts
WHERE quantity_ordered = ?1
ORDER BY product_name ASC",
        base = product_counts_sql(exclusion)
    );
    let rows = collect_rows(&conn, &sql, &[&BOTTOM_SELLER_QUANTITY])?;
    tracing::debug!(products = rows.len(), "Computed bottom sellers");
    Ok(rows)
}
