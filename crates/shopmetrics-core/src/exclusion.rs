//! The single non-revenue filter every aggregation pass goes through.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::OrderStatus;

/// Set of statuses treated as non-revenue and dropped before any grouping.
///
/// Query code never spells status names itself: it asks the policy for a SQL
/// predicate, so every pass filters the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    excluded: BTreeSet<OrderStatus>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new([OrderStatus::Cancelled, OrderStatus::Returned])
    }
}

impl ExclusionPolicy {
    pub fn new(statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        Self {
            excluded: statuses.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list such as `"cancelled,returned"`.
    /// An empty string yields a policy that excludes nothing.
    pub fn parse_list(raw: &str) -> Result<Self, CoreError> {
        let statuses = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<OrderStatus>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(statuses))
    }

    pub fn statuses(&self) -> impl Iterator<Item = OrderStatus> + '_ {
        self.excluded.iter().copied()
    }

    /// Boolean SQL expression that is true when `column` holds a qualifying
    /// (non-excluded) status. NULL statuses qualify.
    ///
    /// Only the fixed `OrderStatus` spellings are interpolated, never caller
    /// input, so the fragment is safe to splice into a statement.
    pub fn sql_predicate(&self, column: &str) -> String {
        if self.excluded.is_empty() {
            return "TRUE".to_string();
        }
        let list = self
            .excluded
            .iter()
            .map(|s| format!("'{}'", s.as_str().to_ascii_lowercase()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("lower(COALESCE({column}, '')) NOT IN ({list})")
    }
}
