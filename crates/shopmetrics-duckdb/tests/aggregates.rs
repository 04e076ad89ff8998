mod common;

use common::{add_item, add_product, add_user, add_user_without_gender, approx, place_order};
use shopmetrics_core::exclusion::ExclusionPolicy;
use shopmetrics_core::insights::{InsightsBackend, LifespanPolicy};
use shopmetrics_core::model::OrderStatus;
use shopmetrics_duckdb::DuckDbBackend;

#[tokio::test]
async fn avg_purchase_value_of_three_single_item_orders_is_twenty() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_user(&db, 1, "F").await;
    add_product(&db, 1, "Tee").await;
    place_order(&db, 1, 1, OrderStatus::Complete, "2023-03-01 10:00:00", &[(1, 10.0)]).await;
    place_order(&db, 2, 1, OrderStatus::Complete, "2023-03-02 10:00:00", &[(1, 20.0)]).await;
    place_order(&db, 3, 1, OrderStatus::Shipped, "2023-03-03 10:00:00", &[(1, 30.0)]).await;

    let summary = db
        .purchase_value(&ExclusionPolicy::default())
        .await
        .expect("purchase value");
    assert_eq!(summary.orders, 3);
    assert!(approx(summary.avg_purchase_value.expect("avg"), 20.0));
    assert_eq!(summary.by_gender.len(), 1);
    assert_eq!(summary.by_gender[0].gender, "F");
    assert!(approx(summary.by_gender[0].value, 20.0));
}

#[tokio::test]
async fn purchase_value_sums_items_per_order_and_splits_by_gender() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_user(&db, 1, "F").await;
    add_user(&db, 2, "M").await;
    add_product(&db, 1, "Tee").await;
    place_order(
        &db,
        1,
        1,
        OrderStatus::Complete,
        "2023-03-01 10:00:00",
        &[(1, 10.0), (1, 30.0)],
    )
    .await;
    place_order(&db, 2, 2, OrderStatus::Complete, "2023-03-01 11:00:00", &[(1, 20.0)]).await;
    // User 99 has no users row: counted overall, absent from the gender view.
    place_order(&db, 3, 99, OrderStatus::Complete, "2023-03-01 12:00:00", &[(1, 60.0)]).await;

    let summary = db
        .purchase_value(&ExclusionPolicy::default())
        .await
        .expect("purchase value");
    assert_eq!(summary.orders, 3);
    assert!(approx(summary.avg_purchase_value.expect("avg"), 40.0));

    let genders: Vec<(&str, f64)> = summary
        .by_gender
        .iter()
        .map(|g| (g.gender.as_str(), g.value))
        .collect();
    assert_eq!(genders.len(), 2);
    assert_eq!(genders[0].0, "F");
    assert!(approx(genders[0].1, 40.0));
    assert_eq!(genders[1].0, "M");
    assert!(approx(genders[1].1, 20.0));
}

#[tokio::test]
async fn empty_warehouse_yields_undefined_averages() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let policy = ExclusionPolicy::default();

    let value = db.purchase_value(&policy).await.expect("purchase value");
    assert_eq!(value.avg_purchase_value, None);
    assert_eq!(value.orders, 0);
    assert!(value.by_gender.is_empty());

    let frequency = db.purchase_frequency(&policy).await.expect("frequency");
    assert_eq!(frequency.avg_num_of_purchases, None);
    assert_eq!(frequency.customers, 0);

    let lifespan = db
        .customer_lifespan(&policy, &LifespanPolicy::default())
        .await
        .expect("lifespan");
    assert_eq!(lifespan.avg_lifespan_days, None);
    assert_eq!(lifespan.customers, 0);

    assert!(db.sales_trend(&policy).await.expect("trend").is_empty());
}

#[tokio::test]
async fn purchase_frequency_counts_each_customer_once() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_user(&db, 1, "F").await;
    add_user(&db, 2, "M").await;
    add_product(&db, 1, "Tee").await;
    // Two orders for user 1, one of them with two items.
    place_order(
        &db,
        1,
        1,
        OrderStatus::Complete,
        "2023-01-01 10:00:00",
        &[(1, 5.0), (1, 5.0)],
    )
    .await;
    place_order(&db, 2, 1, OrderStatus::Complete, "2023-02-01 10:00:00", &[(1, 5.0)]).await;
    place_order(&db, 3, 2, OrderStatus::Complete, "2023-02-01 10:00:00", &[(1, 5.0)]).await;
    place_order(&db, 4, 77, OrderStatus::Complete, "2023-02-01 10:00:00", &[(1, 5.0)]).await;

    let summary = db
        .purchase_frequency(&ExclusionPolicy::default())
        .await
        .expect("frequency");
    assert_eq!(summary.customers, 3);
    assert!(approx(summary.avg_num_of_purchases.expect("avg"), 4.0 / 3.0));

    assert_eq!(summary.by_gender.len(), 2);
    assert_eq!(summary.by_gender[0].gender, "F");
    assert!(approx(summary.by_gender[0].value, 2.0));
    assert_eq!(summary.by_gender[1].gender, "M");
    assert!(approx(summary.by_gender[1].value, 1.0));
}

#[tokio::test]
async fn sales_trend_reports_yoy_change_and_undefined_after_empty_year() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_product(&db, 1, "Tee").await;
    place_order(&db, 1, 1, OrderStatus::Complete, "2021-05-01 10:00:00", &[(1, 100.0)]).await;
    place_order(&db, 2, 1, OrderStatus::Complete, "2022-05-01 10:00:00", &[(1, 90.0)]).await;
    place_order(&db, 3, 2, OrderStatus::Complete, "2022-11-01 10:00:00", &[(1, 60.0)]).await;
    place_order(&db, 4, 2, OrderStatus::Complete, "2024-01-15 10:00:00", &[(1, 50.0)]).await;

    let trend = db
        .sales_trend(&ExclusionPolicy::default())
        .await
        .expect("trend");
    let years: Vec<i32> = trend.iter().map(|y| y.year).collect();
    assert_eq!(years, vec![2021, 2022, 2023, 2024]);

    assert!(approx(trend[0].total_sales, 100.0));
    assert_eq!(trend[0].previous_year_sales, None);
    assert_eq!(trend[0].pct_change, None);

    assert!(approx(trend[1].total_sales, 150.0));
    assert!(approx(trend[1].pct_change.expect("2022 change"), 50.0));

    assert!(approx(trend[2].total_sales, 0.0));
    assert!(approx(trend[2].pct_change.expect("2023 change"), -100.0));

    assert!(approx(trend[3].total_sales, 50.0));
    assert_eq!(trend[3].previous_year_sales, Some(0.0));
    assert_eq!(trend[3].pct_change, None);
}

async fn seed_catalog_sales(db: &DuckDbBackend) {
    for (id, name) in [
        (1, "Alpha"),
        (2, "Bravo"),
        (3, "Charlie"),
        (4, "Delta"),
        (5, "Echo"),
        (6, "Foxtrot"),
    ] {
        add_product(db, id, name).await;
    }
    place_order(
        db,
        1,
        1,
        OrderStatus::Complete,
        "2023-01-01 10:00:00",
        &[(2, 1.0), (2, 1.0), (1, 1.0), (4, 1.0)],
    )
    .await;
    place_order(
        db,
        2,
        2,
        OrderStatus::Shipped,
        "2023-01-02 10:00:00",
        &[(1, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)],
    )
    .await;
    // Echo only ever sold in a cancelled order; Foxtrot never sold.
    place_order(db, 3, 2, OrderStatus::Cancelled, "2023-01-03 10:00:00", &[(5, 1.0)]).await;
}

#[tokio::test]
async fn top_sellers_sort_by_quantity_then_name() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    seed_catalog_sales(&db).await;

    let top = db
        .top_sellers(&ExclusionPolicy::default(), None)
        .await
        .expect("top sellers");
    let ranked: Vec<(&str, i64)> = top
        .iter()
        .map(|p| (p.product_name.as_str(), p.quantity_ordered))
        .collect();
    assert_eq!(
        ranked,
        vec![("Alpha", 3), ("Bravo", 3), ("Charlie", 1), ("Delta", 1)]
    );

    let capped = db
        .top_sellers(&ExclusionPolicy::default(), Some(2))
        .await
        .expect("capped");
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].product_name, "Alpha");
    assert_eq!(capped[1].product_name, "Bravo");
}

#[tokio::test]
async fn bottom_sellers_are_single_unit_products_by_name() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    seed_catalog_sales(&db).await;

    let bottom = db
        .bottom_sellers(&ExclusionPolicy::default())
        .await
        .expect("bottom sellers");
    let names: Vec<&str> = bottom.iter().map(|p| p.product_name.as_str()).collect();
    assert_eq!(names, vec!["Charlie", "Delta"]);
    assert!(bottom.iter().all(|p| p.quantity_ordered == 1));
}

#[tokio::test]
async fn items_with_unknown_product_are_dropped_from_rankings() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_product(&db, 1, "Alpha").await;
    place_order(
        &db,
        1,
        1,
        OrderStatus::Complete,
        "2023-01-01 10:00:00",
        &[(1, 1.0), (404, 1.0)],
    )
    .await;

    let top = db
        .top_sellers(&ExclusionPolicy::default(), None)
        .await
        .expect("top sellers");
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].product_name, "Alpha");
}

/// Adding cancelled/returned orders and items must leave every aggregate
/// unchanged.
#[tokio::test]
async fn excluded_rows_change_no_aggregate() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let policy = ExclusionPolicy::default();
    let lifespan_policy = LifespanPolicy::default();

    add_user(&db, 1, "F").await;
    add_user(&db, 2, "M").await;
    add_user(&db, 3, "M").await;
    add_product(&db, 1, "Alpha").await;
    add_product(&db, 2, "Bravo").await;
    place_order(&db, 1, 1, OrderStatus::Complete, "2022-03-01 10:00:00", &[(1, 10.0)]).await;
    place_order(&db, 2, 1, OrderStatus::Complete, "2023-03-01 10:00:00", &[(2, 25.0)]).await;
    place_order(&db, 3, 2, OrderStatus::Shipped, "2023-04-01 10:00:00", &[(1, 40.0)]).await;

    let trend_before = db.sales_trend(&policy).await.expect("trend");
    let top_before = db.top_sellers(&policy, None).await.expect("top");
    let bottom_before = db.bottom_sellers(&policy).await.expect("bottom");
    let value_before = db.purchase_value(&policy).await.expect("value");
    let freq_before = db.purchase_frequency(&policy).await.expect("frequency");
    let lifespan_before = db
        .customer_lifespan(&policy, &lifespan_policy)
        .await
        .expect("lifespan");

    // Cancelled order for an existing customer, outside their active range.
    place_order(&db, 10, 1, OrderStatus::Cancelled, "2021-01-01 10:00:00", &[(1, 500.0)]).await;
    // Returned order from a customer with no other purchases.
    place_order(&db, 11, 3, OrderStatus::Returned, "2020-06-01 10:00:00", &[(2, 70.0)]).await;
    // Returned line inside a qualifying order.
    add_item(&db, 299, 2, 1, 2, OrderStatus::Returned, 999.0, "2023-03-01 10:00:00").await;
    // Complete line inside a cancelled order.
    place_order(&db, 12, 2, OrderStatus::Cancelled, "2024-08-01 10:00:00", &[]).await;
    add_item(&db, 1299, 12, 2, 1, OrderStatus::Complete, 15.0, "2024-08-01 10:00:00").await;

    assert_eq!(db.sales_trend(&policy).await.expect("trend"), trend_before);
    assert_eq!(db.top_sellers(&policy, None).await.expect("top"), top_before);
    assert_eq!(db.bottom_sellers(&policy).await.expect("bottom"), bottom_before);
    assert_eq!(db.purchase_value(&policy).await.expect("value"), value_before);
    assert_eq!(
        db.purchase_frequency(&policy).await.expect("frequency"),
        freq_before
    );
    assert_eq!(
        db.customer_lifespan(&policy, &lifespan_policy)
            .await
            .expect("lifespan"),
        lifespan_before
    );
}

#[tokio::test]
async fn exclusion_policy_drives_every_pass() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_user(&db, 1, "F").await;
    add_product(&db, 1, "Alpha").await;
    place_order(&db, 1, 1, OrderStatus::Complete, "2023-03-01 10:00:00", &[(1, 10.0)]).await;
    place_order(&db, 2, 1, OrderStatus::Returned, "2023-03-05 10:00:00", &[(1, 30.0)]).await;

    let default_value = db
        .purchase_value(&ExclusionPolicy::default())
        .await
        .expect("value");
    assert_eq!(default_value.orders, 1);
    assert!(approx(default_value.avg_purchase_value.expect("avg"), 10.0));

    let only_cancelled = ExclusionPolicy::new([OrderStatus::Cancelled]);
    let widened = db.purchase_value(&only_cancelled).await.expect("value");
    assert_eq!(widened.orders, 2);
    assert!(approx(widened.avg_purchase_value.expect("avg"), 20.0));

    let top = db.top_sellers(&only_cancelled, None).await.expect("top");
    assert_eq!(top[0].quantity_ordered, 2);
}

#[tokio::test]
async fn orphan_items_are_judged_by_their_own_status() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_user(&db, 1, "F").await;
    add_product(&db, 1, "Tee").await;
    // Orders 40 and 41 have no orders row.
    add_item(&db, 4000, 40, 1, 1, OrderStatus::Complete, 10.0, "2023-05-01 10:00:00").await;
    add_item(&db, 4100, 41, 1, 1, OrderStatus::Returned, 99.0, "2023-05-02 10:00:00").await;

    let policy = ExclusionPolicy::default();
    let value = db.purchase_value(&policy).await.expect("value");
    assert_eq!(value.orders, 1);
    assert!(approx(value.avg_purchase_value.expect("avg"), 10.0));

    let trend = db.sales_trend(&policy).await.expect("trend");
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0].year, 2023);
    assert!(approx(trend[0].total_sales, 10.0));

    let top = db.top_sellers(&policy, None).await.expect("top");
    assert_eq!(top[0].quantity_ordered, 1);
}

#[tokio::test]
async fn users_without_gender_count_only_in_overall_figures() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    add_user(&db, 1, "F").await;
    add_user_without_gender(&db, 2).await;
    add_product(&db, 1, "Tee").await;
    place_order(&db, 1, 1, OrderStatus::Complete, "2023-03-01 10:00:00", &[(1, 10.0)]).await;
    place_order(&db, 2, 2, OrderStatus::Complete, "2023-03-01 10:00:00", &[(1, 30.0)]).await;
    place_order(&db, 3, 2, OrderStatus::Complete, "2023-04-01 10:00:00", &[(1, 50.0)]).await;

    let policy = ExclusionPolicy::default();
    let value = db.purchase_value(&policy).await.expect("value");
    assert_eq!(value.orders, 3);
    assert!(approx(value.avg_purchase_value.expect("avg"), 30.0));
    assert_eq!(value.by_gender.len(), 1);
    assert_eq!(value.by_gender[0].gender, "F");
    assert!(approx(value.by_gender[0].value, 10.0));

    let frequency = db.purchase_frequency(&policy).await.expect("frequency");
    assert_eq!(frequency.customers, 2);
    assert!(approx(frequency.avg_num_of_purchases.expect("avg"), 1.5));
    assert_eq!(frequency.by_gender.len(), 1);
    assert!(approx(frequency.by_gender[0].value, 1.0));

    // User 1: 1 day; user 2: 2023-03-01..2023-04-01 = 32 days.
    let lifespan = db
        .customer_lifespan(&policy, &LifespanPolicy::default())
        .await
        .expect("lifespan");
    assert_eq!(lifespan.customers, 2);
    assert!(approx(lifespan.avg_lifespan_days.expect("avg"), 16.5));
    assert_eq!(lifespan.by_gender.len(), 1);
    assert_eq!(lifespan.by_gender[0].customers, 1);

    db.materialize_customer_purchases(&policy)
        .await
        .expect("materialize");
    let rows = db.customer_purchase_rows().await.expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id, 1);
}
