use async_trait::async_trait;

use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::{
    InsightsBackend, LifespanPolicy, LifespanSummary, ProductSales, PurchaseFrequencySummary,
    PurchaseValueSummary, YearlySales,
};

use crate::DuckDbBackend;

#[async_trait]
impl InsightsBackend for DuckDbBackend {
    async fn sales_trend(&self, exclusion: &ExclusionPolicy) -> anyhow::Result<Vec<YearlySales>> {
        crate::queries::sales_trend::get_sales_trend_inner(self, exclusion).await
    }

    async fn top_sellers(
        &self,
        exclusion: &ExclusionPolicy,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<ProductSales>> {
        crate::queries::products::get_top_sellers_inner(self, exclusion, limit).await
    }

    async fn bottom_sellers(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<Vec<ProductSales>> {
        crate::queries::products::get_bottom_sellers_inner(self, exclusion).await
    }

    async fn purchase_value(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<PurchaseValueSummary> {
        crate::queries::purchase_value::get_purchase_value_inner(self, exclusion).await
    }

    async fn purchase_frequency(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<PurchaseFrequencySummary> {
        crate::queries::purchase_frequency::get_purchase_frequency_inner(self, exclusion).await
    }

    async fn customer_lifespan(
        &self,
        exclusion: &ExclusionPolicy,
        lifespan: &LifespanPolicy,
    ) -> anyhow::Result<LifespanSummary> {
        crate::queries::lifespan::get_customer_lifespan_inner(self, exclusion, lifespan).await
    }

    async fn materialize_customer_lifespan(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<usize> {
        crate::materialize::materialize_customer_lifespan_inner(self, exclusion).await
    }

    async fn materialize_customer_purchases(
        &self,
        exclusion: &ExclusionPolicy,
    ) -> anyhow::Result<usize> {
        crate::materialize::materialize_customer_purchases_inner(self, exclusion).await
    }
}
