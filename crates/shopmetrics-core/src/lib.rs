pub mod cltv;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod insights;
pub mod model;
