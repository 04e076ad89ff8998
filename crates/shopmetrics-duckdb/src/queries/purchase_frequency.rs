use anyhow::Result;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::PurchaseFrequencySummary;

use crate::queries::purchase_value::read_gender_averages;
use crate::queries::qualifying::qualifying_ctes;
use crate::DuckDbBackend;

pub async fn get_purchase_frequency_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
) -> Result<PurchaseFrequencySummary> {
    let conn = db.conn.lock().await;
    let ctes = qualifying_ctes(exclusion);

    // One row per customer, however many orders they placed.
    let overall_sql = format!(
        r#"
WITH {ctes},
customer_orders AS (
    SELECT
        qi.user_id,
        COUNT(DISTINCT qi.order_id) AS num_of_purchases
    FROM qualifying_items qi
    WHERE qi.user_id IS NOT NULL
    GROUP BY qi.user_id
)
SELECT
    AVG(num_of_purchases) AS avg_num_of_purchases,
    COUNT(*) AS customers
FROM customer_orders
"#
    );
    let (avg_num_of_purchases, customers): (Option<f64>, i64) = conn
        .prepare(&overall_sql)?
        .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let by_gender_sql = format!(
        r#"
WITH {ctes},
customer_gender_orders AS (
    SELECT
        qi.user_id,
        u.gender,
        COUNT(DISTINCT qi.order_id) AS num_of_purchases
    FROM qualifying_items qi
    JOIN users u
      ON u.id = qi.user_id
    WHERE u.gender IS NOT NULL
    GROUP BY qi.user_id, u.gender
)
SELECT
    gender,
    AVG(num_of_purchases) AS avg_num_of_purchases
FROM customer_gender_orders
GROUP BY gender
ORDER BY gender ASC
"#
    );
    let by_gender = read_gender_averages(&conn, &by_gender_sql, &[])?;

    tracing::debug!(customers, genders = by_gender.len(), "Computed purchase frequency");
    Ok(PurchaseFrequencySummary {
        avg_num_of_purchases,
        customers,
        by_gender,
    })
}
