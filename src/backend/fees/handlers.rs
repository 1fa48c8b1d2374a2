/**
 * Fee Structure and Deadline Handlers
 *
 * - `GET  /api/fee-structures` - list structures (staff)
 * - `POST /api/fee-structures` - create or replace a structure (admin)
 * - `POST /api/fees/calculate` - compute the fee total for a query
 * - `GET  /api/fee-deadlines` - list deadlines, `?upcoming=true` for future ones
 */

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::backend::error::BackendResult;
use crate::backend::fees::{calculator, db};
use crate::backend::middleware::{AdminUser, AuthUser, StaffUser};
use crate::shared::fees::UpsertFeeStructureRequest;
use crate::shared::{FeeBreakdown, FeeDeadline, FeeQuery, FeeStructure};

pub async fn list_fee_structures(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
) -> BackendResult<Json<Vec<FeeStructure>>> {
    Ok(Json(db::list_structures(&pool).await?))
}

pub async fn upsert_fee_structure(
    State(pool): State<SqlitePool>,
    AdminUser(user): AdminUser,
    Json(request): Json<UpsertFeeStructureRequest>,
) -> BackendResult<Json<FeeStructure>> {
    let structure = db::upsert_structure(&pool, &request).await?;
    tracing::info!(
        "Fee structure {} {} transport={} set to {} by {}",
        structure.grade_level,
        structure.boarding_status.as_str(),
        structure.has_transport,
        structure.total_calculated,
        user.email
    );
    Ok(Json(structure))
}

pub async fn calculate_fees(
    State(pool): State<SqlitePool>,
    AuthUser(_user): AuthUser,
    Json(query): Json<FeeQuery>,
) -> BackendResult<Json<FeeBreakdown>> {
    Ok(Json(calculator::calculate_fees(&pool, &query).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeadlineParams {
    #[serde(default)]
    pub upcoming: bool,
    pub grade_level: Option<String>,
}

pub async fn list_fee_deadlines(
    State(pool): State<SqlitePool>,
    AuthUser(_user): AuthUser,
    Query(params): Query<DeadlineParams>,
) -> BackendResult<Json<Vec<FeeDeadline>>> {
    let from = params.upcoming.then(|| Utc::now().date_naive());
    Ok(Json(db::list_deadlines(&pool, params.grade_level.as_deref(), from).await?))
}
