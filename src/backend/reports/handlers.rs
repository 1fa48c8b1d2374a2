/**
 * Report and Export Handlers
 *
 * All routes are staff-only.
 *
 * - `GET /api/reports/dashboard`
 * - `GET /api/reports/by-method?from=&to=`
 * - `GET /api/reports/by-grade`
 * - `GET /api/reports/defaulters?grade_level=&min_balance=`
 * - `GET /api/reports/recent-payments?limit=`
 * - `GET /api/reports/students/{admission_number}/statement`
 * - `GET /api/exports/payments.csv?from=&to=`
 * - `GET /api/exports/defaulters.csv?grade_level=&min_balance=`
 */

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::StaffUser;
use crate::backend::payments::db::{list_payments, list_payments_for_student, PaymentFilter};
use crate::backend::reports::db::{self, DashboardSummary, Defaulter, GradeSummary, MethodTotal};
use crate::backend::reports::export;
use crate::backend::students::require_student;
use crate::shared::{Payment, Student};

const RECENT_DEFAULT: i64 = 20;
const EXPORT_LIMIT: i64 = 100_000;

/// Date range in calendar days; `to` is inclusive
#[derive(Debug, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let from = self.from.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc());
        let to = self
            .to
            .and_then(|d| d.succ_opt())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc());
        (from, to)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DefaulterParams {
    pub grade_level: Option<String>,
    #[serde(default)]
    pub min_balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StudentStatement {
    pub student: Student,
    pub payments: Vec<Payment>,
}

/// Report failures never leak query details
fn report_error(report: &str, e: sqlx::Error) -> BackendError {
    tracing::error!("Report {} failed: {:?}", report, e);
    BackendError::internal(format!("report {} failed", report))
}

pub async fn dashboard(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
) -> BackendResult<Json<DashboardSummary>> {
    let day_start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or_else(Utc::now);
    let summary = db::dashboard_summary(&pool, day_start)
        .await
        .map_err(|e| report_error("dashboard", e))?;
    Ok(Json(summary))
}

pub async fn by_method(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
    Query(range): Query<DateRange>,
) -> BackendResult<Json<Vec<MethodTotal>>> {
    let (from, to) = range.bounds();
    let totals = db::collections_by_method(&pool, from, to)
        .await
        .map_err(|e| report_error("by-method", e))?;
    Ok(Json(totals))
}

pub async fn by_grade(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
) -> BackendResult<Json<Vec<GradeSummary>>> {
    let grades = db::collections_by_grade(&pool)
        .await
        .map_err(|e| report_error("by-grade", e))?;
    Ok(Json(grades))
}

pub async fn defaulters(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
    Query(params): Query<DefaulterParams>,
) -> BackendResult<Json<Vec<Defaulter>>> {
    let rows = db::defaulters(&pool, params.grade_level.as_deref(), params.min_balance)
        .await
        .map_err(|e| report_error("defaulters", e))?;
    Ok(Json(rows))
}

pub async fn recent_payments(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
    Query(params): Query<RecentParams>,
) -> BackendResult<Json<Vec<Payment>>> {
    let filter = PaymentFilter {
        limit: params.limit.unwrap_or(RECENT_DEFAULT).clamp(1, 200),
        ..Default::default()
    };
    let payments = list_payments(&pool, &filter)
        .await
        .map_err(|e| report_error("recent-payments", e))?;
    Ok(Json(payments))
}

pub async fn student_statement(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
    Path(admission_number): Path<String>,
) -> BackendResult<Json<StudentStatement>> {
    let student = require_student(&pool, &admission_number).await?;
    let payments = list_payments_for_student(&pool, student.id)
        .await
        .map_err(|e| report_error("statement", e))?;
    Ok(Json(StudentStatement { student, payments }))
}

fn csv_response(filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
}

pub async fn export_payments(
    State(pool): State<SqlitePool>,
    StaffUser(user): StaffUser,
    Query(range): Query<DateRange>,
) -> BackendResult<impl IntoResponse> {
    let (from, to) = range.bounds();
    let filter = PaymentFilter {
        from,
        to,
        limit: EXPORT_LIMIT,
        ..Default::default()
    };
    let payments = list_payments(&pool, &filter)
        .await
        .map_err(|e| report_error("payments export", e))?;
    tracing::info!("{} exported {} payments", user.email, payments.len());
    Ok(csv_response("payments.csv", export::payments_csv(&payments)?))
}

pub async fn export_defaulters(
    State(pool): State<SqlitePool>,
    StaffUser(user): StaffUser,
    Query(params): Query<DefaulterParams>,
) -> BackendResult<impl IntoResponse> {
    let rows = db::defaulters(&pool, params.grade_level.as_deref(), params.min_balance)
        .await
        .map_err(|e| report_error("defaulters export", e))?;
    tracing::info!("{} exported {} defaulters", user.email, rows.len());
    Ok(csv_response("defaulters.csv", export::defaulters_csv(&rows)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_is_inclusive_of_last_day() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2025, 1, 1),
            to: NaiveDate::from_ymd_opt(2025, 1, 31),
        };
        let (from, to) = range.bounds();
        assert_eq!(from.unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(to.unwrap().to_rfc3339(), "2025-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_report_error_is_sanitised() {
        let err = report_error("dashboard", sqlx::Error::PoolTimedOut);
        assert_eq!(err.message(), crate::backend::error::types::INTERNAL_ERROR_MESSAGE);
    }
}
