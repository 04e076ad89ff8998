use std::collections::BTreeMap;

use anyhow::Result;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::YearlySales;

use crate::queries::qualifying::qualifying_ctes;
use crate::DuckDbBackend;

/// Percent change from `previous` to `current`, undefined when nothing was
/// sold the year before.
fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous * 100.0)
    }
}

/// Turn sparse `(year, total)` rows into a dense ascending series with
/// year-over-year deltas. Years between the first and last year that sold
/// nothing are filled in with zero.
fn build_series(raw: Vec<(i32, f64)>) -> Vec<YearlySales> {
    let totals: BTreeMap<i32, f64> = raw.into_iter().collect();
    let (Some(&first), Some(&last)) = (totals.keys().next(), totals.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::with_capacity((last - first + 1) as usize);
    let mut previous: Option<f64> = None;
    for year in first..=last {
        let total_sales = totals.get(&year).copied().unwrap_or(0.0);
        series.push(YearlySales {
            year,
            total_sales,
            previous_year_sales: previous,
            pct_change: previous.and_then(|prev| pct_change(total_sales, prev)),
        });
        previous = Some(total_sales);
    }
    series
}

pub async fn get_sales_trend_inner(
    db: &DuckDbBackend,
    exclusion: &ExclusionPolicy,
) -> Result<Vec<YearlySales>> {
    let conn = db.conn.lock().await;

    let sql = format!(
        r#"
WITH {ctes}
SELECT
    CAST(year(qi.created_at) AS INTEGER) AS year,
    SUM(qi.sale_price) AS total_sales
FROM qualifying_items qi
GROUP BY 1
ORDER BY 1 ASC
"#,
        ctes = qualifying_ctes(exclusion)
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i32>(0)?, row.get::<_, f64>(1)?)))?;
    let mut raw = Vec::new();
    for row in rows {
        raw.push(row?);
    }

    let series = build_series(raw);
    tracing::debug!(years = series.len(), "Computed sales trend");
    Ok(series)
}
