//! CSV hand-off of the derived tables to the visualization tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use shopmetrics_core::model::{CustomerLifespanRow, CustomerPurchaseRow};

use crate::schema::{CUSTOMER_LIFESPAN_TABLE, CUSTOMER_PURCHASES_TABLE};
use crate::DuckDbBackend;

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFiles {
    pub customer_lifespan: PathBuf,
    pub customer_purchases: PathBuf,
}

/// Sanitize a CSV field value against formula injection.
///
/// Spreadsheet apps interpret values that start with `=`, `+`, `-`, `@`, tab
/// or carriage return as formulas. Prefixing a single quote forces text.
fn sanitize_csv_field(val: &str) -> std::borrow::Cow<'_, str> {
    if val.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        std::borrow::Cow::Owned(format!("'{val}"))
    } else {
        std::borrow::Cow::Borrowed(val)
    }
}

fn write_lifespan_csv(path: &Path, rows: &[CustomerLifespanRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record([
        "user_id",
        "first_purchase_date",
        "last_purchase_date",
        "customer_lifespan_days",
    ])?;
    for row in rows {
        wtr.write_record([
            row.user_id.to_string(),
            row.first_purchase_date.to_string(),
            row.last_purchase_date.to_string(),
            row.customer_lifespan_days.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_purchases_csv(path: &Path, rows: &[CustomerPurchaseRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["order_id", "gender", "purchase_value"])?;
    for row in rows {
        wtr.write_record([
            row.order_id.to_string(),
            sanitize_csv_field(&row.gender).into_owned(),
            format!("{:.2}", row.purchase_value),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

impl DuckDbBackend {
    /// Write both derived tables as `<table>.csv` into `dir`, creating it if
    /// needed. The tables must have been materialized first.
    pub async fn export_derived_tables(&self, dir: &Path) -> Result<ExportedFiles> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let lifespan_rows = self.customer_lifespan_rows().await?;
        let purchase_rows = self.customer_purchase_rows().await?;

        let files = ExportedFiles {
            customer_lifespan: dir.join(format!("{CUSTOMER_LIFESPAN_TABLE}.csv")),
            customer_purchases: dir.join(format!("{CUSTOMER_PURCHASES_TABLE}.csv")),
        };
        write_lifespan_csv(&files.customer_lifespan, &lifespan_rows)?;
        write_purchases_csv(&files.customer_purchases, &purchase_rows)?;

        tracing::info!(
            dir = %dir.display(),
            lifespan_rows = lifespan_rows.len(),
            purchase_rows = purchase_rows.len(),
            "Exported derived tables"
        );
        Ok(files)
    }
}
