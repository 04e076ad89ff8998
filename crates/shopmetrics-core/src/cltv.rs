//! Customer lifetime value composition.
//!
//! No aggregation happens here: the three averages come from the
//! purchase-value, purchase-frequency and lifespan passes of one segment.

use serde::{Deserialize, Serialize};

pub const DAYS_PER_YEAR: f64 = 365.0;

/// The three per-segment averages CLTV is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CltvInputs {
    pub avg_purchase_value: f64,
    pub avg_num_of_purchases: f64,
    pub avg_lifespan_days: f64,
}

impl CltvInputs {
    /// Collect the inputs of a segment, or `None` if any pass produced no
    /// figure for it.
    pub fn from_parts(
        avg_purchase_value: Option<f64>,
        avg_num_of_purchases: Option<f64>,
        avg_lifespan_days: Option<f64>,
    ) -> Option<Self> {
        Some(Self {
            avg_purchase_value: avg_purchase_value?,
            avg_num_of_purchases: avg_num_of_purchases?,
            avg_lifespan_days: avg_lifespan_days?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CltvBreakdown {
    #[serde(flatten)]
    pub inputs: CltvInputs,
    pub customer_value: f64,
    pub avg_lifespan_years: f64,
    pub cltv: f64,
}

pub fn compose(inputs: CltvInputs) -> CltvBreakdown {
    let customer_value = inputs.avg_purchase_value * inputs.avg_num_of_purchases;
    let avg_lifespan_years = inputs.avg_lifespan_days / DAYS_PER_YEAR;
    CltvBreakdown {
        inputs,
        customer_value,
        avg_lifespan_years,
        cltv: customer_value * avg_lifespan_years,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_multiplies_value_frequency_and_years() {
        let out = compose(CltvInputs {
            avg_purchase_value: 85.0,
            avg_num_of_purchases: 1.5,
            avg_lifespan_days: 365.0,
        });
        assert!((out.customer_value - 127.5).abs() < 1e-9);
        assert!((out.avg_lifespan_years - 1.0).abs() < 1e-9);
        assert!((out.cltv - 127.5).abs() < 1e-9);
    }

    #[test]
    fn compose_matches_single_product_form() {
        let inputs = CltvInputs {
            avg_purchase_value: 86.12,
            avg_num_of_purchases: 1.26,
            avg_lifespan_days: 165.0,
        };
        let out = compose(inputs);
        let direct = 86.12 * 1.26 * (165.0 / 365.0);
        assert!((out.cltv - direct).abs() < 1e-9);
    }

    #[test]
    fn missing_input_yields_no_inputs() {
        assert!(CltvInputs::from_parts(Some(10.0), None, Some(30.0)).is_none());
        assert!(CltvInputs::from_parts(Some(10.0), Some(1.0), Some(30.0)).is_some());
    }
}
