pub mod lifespan;
pub mod products;
pub mod purchase_frequency;
pub mod purchase_value;
pub mod qualifying;
pub mod sales_trend;
