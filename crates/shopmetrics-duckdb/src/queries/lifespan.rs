//! Customer lifespan with the one-time-buyer censoring correction.
//!
//! Lifespan is an inclusive day count, `last - first + 1`, in both the overall
//! and the per-gender figures. A one-time buyer whose only purchase date is on
//! or after the cutoff is censored: counted in `customers` and in the
//! uncorrected average, left out of the corrected one.

use anyhow::Result;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::{GenderLifespan, LifespanPolicy, LifespanSummary};

use crate::queries::qualifying::qualifying_ctes;
use crate::DuckDbBackend;

/// `customer_lifespan(user_id, first_purchase_date, last_purchase_date,
/// customer_lifespan_days)` over qualifying orders. Also the body of
/// `customer_lifespan_table`.
pub(crate) fn customer_lifespan_sql(exclusion: &ExclusionPolicy) -> String {
    format!(
        r#"
WITH {ctes},
customer_lifespan AS (
    SELECT
        qo.user_id,
        CAST(MIN(qo.created_at) AS DATE) AS first_purchase_date,
        CAST(MAX(qo.created_at) AS DATE) AS last_purchase_date,
        DATE_DIFF(
            'day',
            CAST(MIN(qo.created_at) AS DATE),
            CAST(MAX(qo.created_at) AS DATE)
        ) + 1 AS customer_lifespan_days
    FROM qualifying_orders qo
    GROUP BY qo.user_id
)"#,
        ctes = qualifying_ctes(exclusion)
    )
}

/// Adds the `censored` flag; the cutoff is bound as `?1`.
fn flagged_lifespan_sql(exclusion: &ExclusionPolicy, policy: &LifespanPolicy) -> String {
    format!(
        r#"{base},
flagged AS (
    SELECT
        cl.*,
        {censored} AS censored
    FROM customer_lifespan cl
)"#,
        base = customer_lifespan_sql(exclusion),
        censored = policy.sql_predicate("cl.first_purchase_date", "cl.last_purchase_date", "?1")
    )
}

pub async fn get_customer_lifespan_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
    policy: &LifespanPolicy,
) -> Result<LifespanSummary> {
    let conn = db.conn.lock().await;
    let cutoff = policy.cutoff_param();
    let flagged = flagged_lifespan_sql(exclusion, policy);

    let overall_sql = format!(
        r#"{flagged}
SELECT
    AVG(customer_lifespan_days) FILTER (WHERE NOT censored) AS avg_lifespan_days,
    AVG(customer_lifespan_days) AS uncorrected_avg_lifespan_days,
    COUNT(*) AS customers,
    COUNT(*) FILTER (WHERE censored) AS censored_customers
FROM flagged
"#
    );
    let (avg_lifespan_days, uncorrected_avg_lifespan_days, customers, censored_customers): (
        Option<f64>,
        Option<f64>,
        i64,
        i64,
    ) = conn
        .prepare(&overall_sql)?
        .query_row(duckdb::params![cutoff], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;

    let by_gender_sql = format!(
        r#"{flagged}
SELECT
    u.gender,
    AVG(f.customer_lifespan_days) FILTER (WHERE NOT f.censored) AS avg_lifespan_days,
    COUNT(*) AS customers,
    COUNT(*) FILTER (WHERE f.censored) AS censored_customers
FROM flagged f
JOIN users u
  ON u.id = f.user_id
WHERE u.gender IS NOT NULL
GROUP BY u.gender
ORDER BY u.gender ASC
"#
    );
    let mut stmt = conn.prepare(&by_gender_sql)?;
    let rows = stmt.query_map(duckdb::params![cutoff], |row| {
        Ok(GenderLifespan {
            gender: row.get(0)?,
            avg_lifespan_days: row.get(1)?,
            customers: row.get(2)?,
            censored_customers: row.get(3)?,
        })
    })?;
    let mut by_gender = Vec::new();
    for row in rows {
        by_gender.push(row?);
    }

    tracing::debug!(
        customers,
        censored_customers,
        censor_from = %cutoff,
        "Computed customer lifespan"
    );
    Ok(LifespanSummary {
        censor_from: policy.censor_from,
        avg_lifespan_days,
        uncorrected_avg_lifespan_days,
        customers,
        censored_customers,
        by_gender,
    })
}
