/**
 * Fee Structure and Deadline Database Operations
 *
 * Components and route surcharges are stored as JSON text columns.
 */

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::fees::{normalize_grade, UpsertFeeStructureRequest};
use crate::shared::{BoardingStatus, FeeDeadline, FeeStructure};

const STRUCTURE_COLUMNS: &str = "id, grade_level, boarding_status, has_transport, components, \
     total_calculated, transport_routes, academic_year, created_at, updated_at";

fn structure_from_row(row: &SqliteRow) -> Result<FeeStructure, sqlx::Error> {
    let status: String = row.try_get("boarding_status")?;
    let components: String = row.try_get("components")?;
    let routes: String = row.try_get("transport_routes")?;

    Ok(FeeStructure {
        id: row.try_get("id")?,
        grade_level: row.try_get("grade_level")?,
        boarding_status: BoardingStatus::from_str(&status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown boarding status '{}'", status).into()))?,
        has_transport: row.try_get("has_transport")?,
        components: serde_json::from_str(&components).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        total_calculated: row.try_get("total_calculated")?,
        transport_routes: serde_json::from_str(&routes).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        academic_year: row.try_get("academic_year")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Create or replace the structure for a (grade, boarding, transport) key
pub async fn upsert_structure(
    pool: &SqlitePool,
    request: &UpsertFeeStructureRequest,
) -> Result<FeeStructure, BackendError> {
    request.validate()?;

    let now = Utc::now();
    let components = serde_json::to_string(&request.components)?;
    let routes = serde_json::to_string(&request.normalized_routes())?;

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO fee_structures
            (id, grade_level, boarding_status, has_transport, components, total_calculated,
             transport_routes, academic_year, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (grade_level, boarding_status, has_transport) DO UPDATE SET
            components = excluded.components,
            total_calculated = excluded.total_calculated,
            transport_routes = excluded.transport_routes,
            academic_year = excluded.academic_year,
            updated_at = excluded.updated_at
        RETURNING {STRUCTURE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(normalize_grade(&request.grade_level))
    .bind(request.boarding_status.as_str())
    .bind(request.has_transport)
    .bind(components)
    .bind(request.total())
    .bind(routes)
    .bind(request.academic_year.as_deref())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(structure_from_row(&row)?)
}

/// Exact lookup by key; grade comparison is case-insensitive
pub async fn find_structure(
    pool: &SqlitePool,
    grade_level: &str,
    boarding_status: BoardingStatus,
    has_transport: bool,
) -> Result<Option<FeeStructure>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {STRUCTURE_COLUMNS} FROM fee_structures \
         WHERE grade_level = ? AND boarding_status = ? AND has_transport = ?"
    ))
    .bind(normalize_grade(grade_level))
    .bind(boarding_status.as_str())
    .bind(has_transport)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(structure_from_row).transpose()
}

pub async fn list_structures(pool: &SqlitePool) -> Result<Vec<FeeStructure>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {STRUCTURE_COLUMNS} FROM fee_structures ORDER BY grade_level, boarding_status, has_transport"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(structure_from_row).collect()
}

fn deadline_from_row(row: &SqliteRow) -> Result<FeeDeadline, sqlx::Error> {
    Ok(FeeDeadline {
        id: row.try_get("id")?,
        label: row.try_get("label")?,
        grade_level: row.try_get("grade_level")?,
        due_date: row.try_get("due_date")?,
        minimum_percentage: row.try_get("minimum_percentage")?,
    })
}

/// Deadlines, optionally limited to one grade (plus all-grade deadlines)
/// and to those due on or after `from`
pub async fn list_deadlines(
    pool: &SqlitePool,
    grade_level: Option<&str>,
    from: Option<NaiveDate>,
) -> Result<Vec<FeeDeadline>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, label, grade_level, due_date, minimum_percentage
        FROM fee_deadlines
        WHERE (? IS NULL OR grade_level IS NULL OR grade_level = ?)
          AND (? IS NULL OR due_date >= ?)
        ORDER BY due_date, label
        "#,
    )
    .bind(grade_level.map(normalize_grade))
    .bind(grade_level.map(normalize_grade))
    .bind(from)
    .bind(from)
    .fetch_all(pool)
    .await?;

    rows.iter().map(deadline_from_row).collect()
}

/// Insert a deadline or update the one with the same label and grade
pub async fn upsert_deadline(
    pool: &SqlitePool,
    label: &str,
    grade_level: Option<&str>,
    due_date: NaiveDate,
    minimum_percentage: f64,
) -> Result<(), BackendError> {
    if label.trim().is_empty() {
        return Err(BackendError::validation("label", "Deadline label is required"));
    }
    if !(0.0..=100.0).contains(&minimum_percentage) {
        return Err(BackendError::validation(
            "minimum_percentage",
            "Minimum percentage must be between 0 and 100",
        ));
    }
    let grade_level = grade_level.map(normalize_grade).filter(|g| !g.is_empty());

    let updated = sqlx::query(
        "UPDATE fee_deadlines SET due_date = ?, minimum_percentage = ? WHERE label = ? AND grade_level IS ?",
    )
    .bind(due_date)
    .bind(minimum_percentage)
    .bind(label.trim())
    .bind(grade_level.as_deref())
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            "INSERT INTO fee_deadlines (id, label, grade_level, due_date, minimum_percentage) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(label.trim())
        .bind(grade_level.as_deref())
        .bind(due_date)
        .bind(minimum_percentage)
        .execute(pool)
        .await?;
    }
    Ok(())
}
