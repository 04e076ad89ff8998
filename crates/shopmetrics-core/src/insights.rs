//! Insights backend abstraction and the result types of every pass.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cltv::CltvBreakdown;
use crate::exclusion::ExclusionPolicy;
use crate::model::OrderStatus;

/// Censoring rule for one-time buyers.
///
/// A customer whose first and last qualifying purchase fall on the same date,
/// with that date on or after `censor_from`, may still come back: their
/// lifespan is unobservable and they are left out of the corrected average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifespanPolicy {
    pub censor_from: NaiveDate,
}

impl LifespanPolicy {
    pub fn new(censor_from: NaiveDate) -> Self {
        Self { censor_from }
    }

    /// Boolean SQL expression that is true for a censored customer, given the
    /// first/last purchase DATE columns and the placeholder the cutoff is
    /// bound to (e.g. `"?1"`). The cutoff itself is never interpolated.
    pub fn sql_predicate(
        &self,
        first_column: &str,
        last_column: &str,
        cutoff_param: &str,
    ) -> String {
        format!(
            "({first_column} = {last_column} AND {first_column} >= CAST({cutoff_param} AS DATE))"
        )
    }

    /// The cutoff in the form bound to [`Self::sql_predicate`]'s placeholder.
    pub fn cutoff_param(&self) -> String {
        self.censor_from.format("%Y-%m-%d").to_string()
    }
}

impl Default for LifespanPolicy {
    fn default() -> Self {
        Self {
            censor_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySales {
    pub year: i32,
    pub total_sales: f64,
    /// `None` for the first year of the series.
    pub previous_year_sales: Option<f64>,
    /// `None` for the first year and whenever the previous year sold nothing.
    pub pct_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_name: String,
    pub quantity_ordered: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderAverage {
    pub gender: String,
    pub value: f64,
}

/// Looks up a gender's figure in a per-gender list.
pub fn value_for_gender(rows: &[GenderAverage], gender: &str) -> Option<f64> {
    rows.iter().find(|r| r.gender == gender).map(|r| r.value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseValueSummary {
    /// Mean of per-order purchase values; `None` when no order qualifies.
    pub avg_purchase_value: Option<f64>,
    pub orders: i64,
    pub by_gender: Vec<GenderAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseFrequencySummary {
    pub avg_num_of_purchases: Option<f64>,
    pub customers: i64,
    pub by_gender: Vec<GenderAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderLifespan {
    pub gender: String,
    /// Corrected average; `None` when every customer of the segment is censored.
    pub avg_lifespan_days: Option<f64>,
    pub customers: i64,
    pub censored_customers: i64,
}

/// Looks up a gender's corrected average lifespan.
pub fn lifespan_for_gender(rows: &[GenderLifespan], gender: &str) -> Option<f64> {
    rows.iter()
        .find(|r| r.gender == gender)
        .and_then(|r| r.avg_lifespan_days)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifespanSummary {
    pub censor_from: NaiveDate,
    /// Average over customers that are not censored.
    pub avg_lifespan_days: Option<f64>,
    /// Average over every customer, censored ones counted with lifespan 1.
    pub uncorrected_avg_lifespan_days: Option<f64>,
    pub customers: i64,
    pub censored_customers: i64,
    pub by_gender: Vec<GenderLifespan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCltv {
    pub gender: String,
    /// `None` when one of the segment's three averages is missing.
    pub breakdown: Option<CltvBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvReport {
    pub overall: Option<CltvBreakdown>,
    pub by_gender: Vec<SegmentCltv>,
}

/// Row counts written by the two materialization passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedTables {
    pub customer_lifespan_rows: usize,
    pub customer_purchases_rows: usize,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub generated_at: DateTime<Utc>,
    pub excluded_statuses: Vec<OrderStatus>,
    pub sales_trend: Vec<YearlySales>,
    pub top_sellers: Vec<ProductSales>,
    pub bottom_sellers: Vec<ProductSales>,
    pub purchase_value: PurchaseValueSummary,
    pub purchase_frequency: PurchaseFrequencySummary,
    pub customer_lifespan: LifespanSummary,
    pub cltv: CltvReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materialized: Option<MaterializedTables>,
}

/// Storage-agnostic seam the report runner drives.
///
/// Every method applies `exclusion` before grouping; implementations must not
/// filter statuses any other way.
#[async_trait]
pub trait InsightsBackend: Send + Sync + 'static {
    async fn sales_trend(&self, exclusion: &ExclusionPolicy) -> anyhow::Result<Vec<YearlySales>>;

    /// Descending by quantity, ties by product name. `limit` caps the list.
    async fn top_sellers(
        &self,
        exclusion: &ExclusionPolicy,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<ProductSales>>;

    /// Products ordered exactly once, by product name.
    async fn bottom_sellers(&self, exclusion: &ExclusionPolicy)
        -> anyhow::Result<Vec<ProductSales>>;

    async fn purchase_value(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<PurchaseValueSummary>;

    async fn purchase_frequency(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<PurchaseFrequencySummary>;

    async fn customer_lifespan(
        &self,
        exclusion: &ExclusionPolicy,
        lifespan: &LifespanPolicy,
    ) -> anyhow::Result<LifespanSummary>;

    /// Recreate `customer_lifespan_table`; returns the number of rows written.
    async fn materialize_customer_lifespan(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<usize>;

    /// Recreate `customer_purchases_table`; returns the number of rows written.
    async fn materialize_customer_purchases(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_cutoff_is_2024_01_01() {
        assert_eq!(LifespanPolicy::default().censor_from, day(2024, 1, 1));
    }

    #[test]
    fn censoring_predicate_compares_dates_against_bound_cutoff() {
        let policy = LifespanPolicy::new(day(2023, 7, 1));
        assert_eq!(
            policy.sql_predicate("cl.first_purchase_date", "cl.last_purchase_date", "?1"),
            "(cl.first_purchase_date = cl.last_purchase_date \
AND cl.first_purchase_date >= CAST(?1 AS DATE))"
        );
        assert_eq!(policy.cutoff_param(), "2023-07-01");
    }

    #[test]
    fn lifespan_for_gender_skips_fully_censored_segments() {
        let rows = vec![
            GenderLifespan {
                gender: "F".to_string(),
                avg_lifespan_days: Some(12.0),
                customers: 3,
                censored_customers: 1,
            },
            GenderLifespan {
                gender: "M".to_string(),
                avg_lifespan_days: None,
                customers: 1,
                censored_customers: 1,
            },
        ];
        assert_eq!(lifespan_for_gender(&rows, "F"), Some(12.0));
        assert_eq!(lifespan_for_gender(&rows, "M"), None);
        assert_eq!(lifespan_for_gender(&rows, "X"), None);
    }

    #[test]
    fn value_for_gender_finds_exact_match() {
        let rows = vec![
            GenderAverage {
                gender: "F".to_string(),
                value: 1.5,
            },
            GenderAverage {
                gender: "M".to_string(),
                value: 2.0,
            },
        ];
        assert_eq!(value_for_gender(&rows, "M"), Some(2.0));
        assert_eq!(value_for_gender(&rows, "X"), None);
    }
}
