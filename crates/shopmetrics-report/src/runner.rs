//! Chains every aggregation pass into one [`InsightsReport`].

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use shopmetrics_core::cltv::{compose, CltvInputs};
use shopmetrics_core::config::Config;
use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::{
    lifespan_for_gender, value_for_gender, CltvReport, InsightsBackend, InsightsReport,
    LifespanPolicy, LifespanSummary, MaterializedTables, PurchaseFrequencySummary,
    PurchaseValueSummary, SegmentCltv,
};

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub exclusion: ExclusionPolicy,
    pub lifespan: LifespanPolicy,
    pub top_n: Option<usize>,
    pub materialize: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            exclusion: ExclusionPolicy::default(),
            lifespan: LifespanPolicy::default(),
            top_n: Some(10),
            materialize: true,
        }
    }
}

impl From<&Config> for ReportOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            exclusion: cfg.exclusion.clone(),
            lifespan: cfg.lifespan,
            top_n: cfg.top_n,
            materialize: cfg.materialize,
        }
    }
}

/// Overall CLTV plus one entry per gender seen by any of the three passes.
///
/// Each segment uses only its own averages. A gender missing from one of
/// the passes (e.g. every customer censored) gets `breakdown: None`.
pub fn compose_cltv(
    value: &PurchaseValueSummary,
    frequency: &PurchaseFrequencySummary,
    lifespan: &LifespanSummary,
) -> CltvReport {
    let overall = CltvInputs::from_parts(
        value.avg_purchase_value,
        frequency.avg_num_of_purchases,
        lifespan.avg_lifespan_days,
    )
    .map(compose);

    let genders: BTreeSet<&str> = value
        .by_gender
        .iter()
        .map(|g| g.gender.as_str())
        .chain(frequency.by_gender.iter().map(|g| g.gender.as_str()))
        .chain(lifespan.by_gender.iter().map(|g| g.gender.as_str()))
        .collect();

    let by_gender = genders
        .into_iter()
        .map(|gender| {
            let breakdown = CltvInputs::from_parts(
                value_for_gender(&value.by_gender, gender),
                value_for_gender(&frequency.by_gender, gender),
                lifespan_for_gender(&lifespan.by_gender, gender),
            )
            .map(compose);
            SegmentCltv {
                gender: gender.to_string(),
                breakdown,
            }
        })
        .collect();

    CltvReport { overall, by_gender }
}

/// Run every pass against `backend` and assemble the report.
///
/// With `options.materialize` set, both derived tables are rebuilt first so
/// that they reflect the same snapshot the report was computed from.
pub async fn build_report(
    backend: &dyn InsightsBackend,
    options: &ReportOptions,
) -> Result<InsightsReport> {
    let exclusion = &options.exclusion;

    let materialized = if options.materialize {
        Some(MaterializedTables {
            customer_lifespan_rows: backend.materialize_customer_lifespan(exclusion).await?,
            customer_purchases_rows: backend.materialize_customer_purchases(exclusion).await?,
        })
    } else {
        None
    };

    let sales_trend = backend.sales_trend(exclusion).await?;
    let top_sellers = backend.top_sellers(exclusion, options.top_n).await?;
    let bottom_sellers = backend.bottom_sellers(exclusion).await?;
    let purchase_value = backend.purchase_value(exclusion).await?;
    let purchase_frequency = backend.purchase_frequency(exclusion).await?;
    let customer_lifespan = backend
        .customer_lifespan(exclusion, &options.lifespan)
        .await?;

    let cltv = compose_cltv(&purchase_value, &purchase_frequency, &customer_lifespan);
    match cltv.overall {
        Some(overall) => info!(
            cltv = overall.cltv,
            customer_value = overall.customer_value,
            avg_lifespan_years = overall.avg_lifespan_years,
            "CLTV computed"
        ),
        None => tracing::warn!("CLTV undefined: at least one component average is empty"),
    }

    Ok(InsightsReport {
        generated_at: Utc::now(),
        excluded_statuses: exclusion.statuses().collect(),
        sales_trend,
        top_sellers,
        bottom_sellers,
        purchase_value,
        purchase_frequency,
        customer_lifespan,
        cltv,
        materialized,
    })
}
