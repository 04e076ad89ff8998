use chrono::NaiveDate;

use crate::error::CoreError;
use crate::exclusion::ExclusionPolicy;
use crate::insights::LifespanPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub duckdb_memory_limit: String,
    pub lifespan: LifespanPolicy,
    /// `None` means the top-seller list is not capped.
    pub top_n: Option<usize>,
    pub exclusion: ExclusionPolicy,
    pub export_dir: Option<String>,
    pub materialize: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        Ok(Self {
            db_path: lookup("SHOPMETRICS_DB_PATH")
                .unwrap_or_else(|| "./data/shopmetrics.db".to_string()),
            duckdb_memory_limit: lookup("SHOPMETRICS_DUCKDB_MEMORY")
                .unwrap_or_else(|| "1GB".to_string()),
            lifespan: match lookup("SHOPMETRICS_LIFESPAN_CUTOFF") {
                Some(raw) => {
                    let censor_from = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                        .map_err(|e| {
                            CoreError::Config(format!("invalid SHOPMETRICS_LIFESPAN_CUTOFF: {e}"))
                        })?;
                    LifespanPolicy::new(censor_from)
                }
                None => LifespanPolicy::default(),
            },
            top_n: {
                let n: usize = lookup("SHOPMETRICS_TOP_N")
                    .unwrap_or_else(|| "10".to_string())
                    .trim()
                    .parse()
                    .map_err(|e| CoreError::Config(format!("invalid SHOPMETRICS_TOP_N: {e}")))?;
                (n > 0).then_some(n)
            },
            exclusion: match lookup("SHOPMETRICS_EXCLUDED_STATUSES") {
                Some(raw) => ExclusionPolicy::parse_list(&raw)?,
                None => ExclusionPolicy::default(),
            },
            export_dir: lookup("SHOPMETRICS_EXPORT_DIR").filter(|v| !v.trim().is_empty()),
            materialize: match lookup("SHOPMETRICS_MATERIALIZE") {
                Some(raw) => parse_flag("SHOPMETRICS_MATERIALIZE", &raw)?,
                None => true,
            },
        })
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Config(format!("invalid {key}: {raw:?}"))),
    }
}
