use anyhow::Result;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::{GenderAverage, PurchaseValueSummary};

use crate::queries::qualifying::qualifying_ctes;
use crate::DuckDbBackend;

/// `order_gender_values(order_id, gender, purchase_value)`: qualifying items
/// summed per order and attributed to the gender of the purchasing user.
/// Orders whose user is missing or has no recorded gender drop out here.
///
/// Also the body of `customer_purchases_table`.
pub(crate) fn order_gender_values_sql(exclusion: &ExclusionPolicy) -> String {
    format!(
        r#"
WITH {ctes},
order_gender_values AS (
    SELECT
        qi.order_id,
        u.gender,
        SUM(qi.sale_price) AS purchase_value
    FROM qualifying_items qi
    JOIN users u
      ON u.id = qi.user_id
    WHERE u.gender IS NOT NULL
    GROUP BY qi.order_id, u.gender
)"#,
        ctes = qualifying_ctes(exclusion)
    )
}

pub(crate) fn read_gender_averages(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[&dyn duckdb::types::ToSql],
) -> Result<Vec<GenderAverage>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok(GenderAverage {
            gender: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub async fn get_purchase_value_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
) -> Result<PurchaseValueSummary> {
    let conn = db.conn.lock().await;

    let overall_sql = format!(
        r#"
WITH {ctes},
order_values AS (
    SELECT
        qi.order_id,
        SUM(qi.sale_price) AS purchase_value
    FROM qualifying_items qi
    GROUP BY qi.order_id
)
SELECT
    AVG(purchase_value) AS avg_purchase_value,
    COUNT(*) AS orders
FROM order_values
"#,
        ctes = qualifying_ctes(exclusion)
    );
    let (avg_purchase_value, orders): (Option<f64>, i64) = conn
        .prepare(&overall_sql)?
        .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let by_gender_sql = format!(
        "{base}
SELECT
    gender,
    AVG(purchase_value) AS avg_purchase_value
FROM order_gender_values
GROUP BY gender
ORDER BY gender ASC",
        base = order_gender_values_sql(exclusion)
    );
    let by_gender = read_gender_averages(&conn, &by_gender_sql, &[])?;

    tracing::debug!(orders, genders = by_gender.len(), "Computed purchase value");
    Ok(PurchaseValueSummary {
        avg_purchase_value,
        orders,
        by_gender,
    })
}
