//! Reference data seeding
//!
//! Fee structures and deadlines can be loaded from a TOML file at start-up.
//! Seeding is an upsert: re-running with the same file changes nothing, and
//! edited amounts replace the stored ones.
//!
//! ```toml
//! [[fee_structures]]
//! grade_level = "Grade 3"
//! boarding_status = "day"
//! has_transport = true
//! academic_year = "2025"
//! components = [
//!     { name = "Tuition", amount = 12000.0 },
//!     { name = "Activity", amount = 1500.0 },
//! ]
//! transport_routes = { Kericho = 3500.0, Litein = 4000.0 }
//!
//! [[deadlines]]
//! label = "Term 1"
//! due_date = "2025-01-31"
//! minimum_percentage = 50.0
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::backend::error::BackendError;
use crate::backend::fees::db::{upsert_deadline, upsert_structure};
use crate::shared::fees::UpsertFeeStructureRequest;

#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid reference data: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to store reference data: {0}")]
    Store(#[from] BackendError),
}

#[derive(Debug, Deserialize)]
pub struct DeadlineSeed {
    pub label: String,
    #[serde(default)]
    pub grade_level: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default = "full_percentage")]
    pub minimum_percentage: f64,
}

fn full_percentage() -> f64 {
    100.0
}

#[derive(Debug, Deserialize, Default)]
pub struct ReferenceData {
    #[serde(default)]
    pub fee_structures: Vec<UpsertFeeStructureRequest>,
    #[serde(default)]
    pub deadlines: Vec<DeadlineSeed>,
}

/// Counts of seeded rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub fee_structures: usize,
    pub deadlines: usize,
}

pub fn parse(contents: &str) -> Result<ReferenceData, ReferenceDataError> {
    Ok(toml::from_str(contents)?)
}

pub async fn seed(pool: &SqlitePool, data: &ReferenceData) -> Result<SeedSummary, ReferenceDataError> {
    let mut summary = SeedSummary::default();

    for structure in &data.fee_structures {
        upsert_structure(pool, structure).await?;
        summary.fee_structures += 1;
    }
    for deadline in &data.deadlines {
        upsert_deadline(
            pool,
            &deadline.label,
            deadline.grade_level.as_deref(),
            deadline.due_date,
            deadline.minimum_percentage,
        )
        .await?;
        summary.deadlines += 1;
    }

    Ok(summary)
}

pub async fn seed_from_file(pool: &SqlitePool, path: &Path) -> Result<SeedSummary, ReferenceDataError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let data = parse(&contents)?;
    seed(pool, &data).await
}
