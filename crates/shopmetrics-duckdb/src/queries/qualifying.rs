//! Shared CTEs that apply the exclusion policy.
//!
//! Every pass selects from `qualifying_orders` or `qualifying_items` and never
//! from the raw `orders` / `order_items` tables, so excluded rows cannot leak
//! into any aggregate.

use shopmetrics_core::exclusion::ExclusionPolicy;

/// Two comma-separated CTE definitions, to be placed right after `WITH`.
///
/// An item qualifies when its own status is not excluded and its parent order
/// (if present) is not excluded either. Items whose order row is missing are
/// judged by their own status only.
pub fn qualifying_ctes(exclusion: &ExclusionPolicy) -> String {
    let order_ok = exclusion.sql_predicate("o.status");
    let item_ok = exclusion.sql_predicate("oi.status");
    format!(
        r#"
qualifying_orders AS (
    SELECT
        o.order_id,
        o.user_id,
        o.created_at
    FROM orders o
    WHERE {order_ok}
),
qualifying_items AS (
    SELECT
        oi.id,
        oi.order_id,
        oi.user_id,
        oi.product_id,
        CAST(oi.sale_price AS DOUBLE) AS sale_price,
        oi.created_at
    FROM order_items oi
    LEFT JOIN orders o
      ON o.order_id = oi.order_id
    WHERE {item_ok}
      AND (o.order_id IS NULL OR {order_ok})
)"#
    )
}
