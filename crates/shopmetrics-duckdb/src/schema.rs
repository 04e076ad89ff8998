/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so opening an existing warehouse file
/// leaves its data alone, and an empty file becomes a valid (empty) warehouse.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `SHOPMETRICS_DUCKDB_MEMORY`, default `"1GB"`).
///
/// The two derived tables (`customer_lifespan_table`,
/// `customer_purchases_table`) are NOT created here: they are rebuilt with
/// `CREATE OR REPLACE TABLE` by the materialization passes on every run.
///
/// NOTE: no FOREIGN KEY constraints. Items pointing at missing products or
/// users are legal warehouse data and are dropped by inner joins at query
/// time.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- USERS
-- ===========================================
CREATE TABLE IF NOT EXISTS users (
    id              BIGINT PRIMARY KEY,
    gender          VARCHAR,                       -- 'M' | 'F' as exported; NULL = unknown
    age             INTEGER
);

-- ===========================================
-- PRODUCTS
-- ===========================================
CREATE TABLE IF NOT EXISTS products (
    id              BIGINT PRIMARY KEY,
    name            VARCHAR NOT NULL
);

-- ===========================================
-- ORDERS
-- ===========================================
CREATE TABLE IF NOT EXISTS orders (
    order_id        BIGINT PRIMARY KEY,
    user_id         BIGINT NOT NULL,
    status          VARCHAR,                       -- 'Processing' | 'Shipped' | 'Complete' | 'Cancelled' | 'Returned'
    created_at      TIMESTAMP NOT NULL
);
-- Lifespan pass groups qualifying orders by customer
CREATE INDEX IF NOT EXISTS idx_orders_user_time
    ON orders(user_id, created_at);

-- ===========================================
-- ORDER ITEMS
-- ===========================================
CREATE TABLE IF NOT EXISTS order_items (
    id              BIGINT PRIMARY KEY,
    order_id        BIGINT NOT NULL,
    user_id         BIGINT,                        -- denormalized from orders
    product_id      BIGINT,
    status          VARCHAR,                       -- may differ from the parent order
    sale_price      DECIMAL(12, 2) NOT NULL,
    created_at      TIMESTAMP NOT NULL
);
-- Parent-order status lookup in the qualifying_items CTE
CREATE INDEX IF NOT EXISTS idx_order_items_order
    ON order_items(order_id);
CREATE INDEX IF NOT EXISTS idx_order_items_user
    ON order_items(user_id);
CREATE INDEX IF NOT EXISTS idx_order_items_product
    ON order_items(product_id);
"#
    )
}

pub const CUSTOMER_LIFESPAN_TABLE: &str = "customer_lifespan_table";
pub const CUSTOMER_PURCHASES_TABLE: &str = "customer_purchases_table";
