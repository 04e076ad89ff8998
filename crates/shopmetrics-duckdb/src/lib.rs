pub mod backend;
pub mod export;
pub mod insights_impl;
pub mod materialize;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;
