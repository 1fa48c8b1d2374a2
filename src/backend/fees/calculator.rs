//! Fee calculator
//!
//! Lookup order for a query:
//!
//! 1. The exact (grade, boarding status, transport) structure.
//! 2. Boarding students with transport only: the boarding structure without
//!    transport. No route surcharge is added and the breakdown is flagged
//!    with `fallback_used`.
//!
//! Anything else is a `FeeStructureNotFound` error.

use sqlx::SqlitePool;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::fees::db::find_structure;
use crate::shared::fees::normalize_grade;
use crate::shared::{BoardingStatus, FeeBreakdown, FeeQuery, FeeStructure, Student};

fn describe(query: &FeeQuery) -> String {
    format!(
        "{} ({}, {})",
        normalize_grade(&query.grade_level),
        query.boarding_status.as_str(),
        if query.has_transport { "with transport" } else { "no transport" }
    )
}

/// Route surcharge for a transport structure.
/// A structure without any routes carries transport in its components.
fn route_surcharge(structure: &FeeStructure, query: &FeeQuery) -> BackendResult<f64> {
    if structure.transport_routes.is_empty() {
        return Ok(0.0);
    }
    let route = query
        .transport_route
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| BackendError::validation("transport_route", "Transport route is required"))?;

    structure.route_surcharge(route).ok_or_else(|| {
        tracing::warn!("No surcharge configured for route '{}' on {}", route, describe(query));
        BackendError::FeeStructureNotFound {
            description: format!("route '{}' on {}", route, describe(query)),
        }
    })
}

/// Compute the fee total for a grade/boarding/transport combination
pub async fn calculate_fees(pool: &SqlitePool, query: &FeeQuery) -> BackendResult<FeeBreakdown> {
    if normalize_grade(&query.grade_level).is_empty() {
        return Err(BackendError::validation("grade_level", "Grade level is required"));
    }

    if let Some(structure) =
        find_structure(pool, &query.grade_level, query.boarding_status, query.has_transport).await?
    {
        let transport_surcharge = if query.has_transport {
            route_surcharge(&structure, query)?
        } else {
            0.0
        };
        return Ok(FeeBreakdown {
            structure_id: structure.id,
            base_total: structure.total_calculated,
            transport_surcharge,
            total: structure.total_calculated + transport_surcharge,
            fallback_used: false,
        });
    }

    if query.boarding_status == BoardingStatus::Boarding && query.has_transport {
        if let Some(structure) = find_structure(pool, &query.grade_level, BoardingStatus::Boarding, false).await? {
            tracing::warn!(
                "No transport structure for {}; using boarding structure without transport",
                describe(query)
            );
            return Ok(FeeBreakdown {
                structure_id: structure.id,
                base_total: structure.total_calculated,
                transport_surcharge: 0.0,
                total: structure.total_calculated,
                fallback_used: true,
            });
        }
    }

    tracing::warn!("No fee structure configured for {}", describe(query));
    Err(BackendError::FeeStructureNotFound {
        description: describe(query),
    })
}

/// Fee total to initialise a student's balance with, or `None` when the
/// student's total is already set and no lookup is needed
pub async fn initial_fee_total(pool: &SqlitePool, student: &Student) -> BackendResult<Option<f64>> {
    if student.fee_details.is_initialized() {
        return Ok(None);
    }
    let breakdown = calculate_fees(pool, &student.fee_query()).await?;
    Ok(Some(breakdown.total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;
    use crate::backend::fees::db::upsert_structure;
    use crate::shared::fees::UpsertFeeStructureRequest;
    use crate::shared::FeeComponent;
    use axum::http::StatusCode;
    use std::collections::BTreeMap;

    async fn seed(pool: &SqlitePool, status: BoardingStatus, transport: bool, total: f64, routes: &[(&str, f64)]) {
        let request = UpsertFeeStructureRequest {
            grade_level: "Grade 3".to_string(),
            boarding_status: status,
            has_transport: transport,
            components: vec![FeeComponent { name: "Tuition".to_string(), amount: total }],
            transport_routes: routes.iter().map(|(r, a)| (r.to_string(), *a)).collect::<BTreeMap<_, _>>(),
            academic_year: None,
        };
        upsert_structure(pool, &request).await.unwrap();
    }

    fn query(status: BoardingStatus, transport: bool, route: Option<&str>) -> FeeQuery {
        FeeQuery {
            grade_level: "Grade 3".to_string(),
            boarding_status: status,
            has_transport: transport,
            transport_route: route.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_day_without_transport_returns_structure_total() {
        let pool = memory_pool().await.unwrap();
        seed(&pool, BoardingStatus::Day, false, 15000.0, &[]).await;

        let breakdown = calculate_fees(&pool, &query(BoardingStatus::Day, false, None)).await.unwrap();
        assert_eq!(breakdown.total, 15000.0);
        assert_eq!(breakdown.transport_surcharge, 0.0);
        assert!(!breakdown.fallback_used);
    }

    #[tokio::test]
    async fn test_transport_route_surcharge_is_case_insensitive() {
        let pool = memory_pool().await.unwrap();
        seed(&pool, BoardingStatus::Day, true, 15000.0, &[("Kericho", 3500.0), ("Litein", 4000.0)]).await;

        let breakdown = calculate_fees(&pool, &query(BoardingStatus::Day, true, Some("KERICHO")))
            .await
            .unwrap();
        assert_eq!(breakdown.base_total, 15000.0);
        assert_eq!(breakdown.transport_surcharge, 3500.0);
        assert_eq!(breakdown.total, 18500.0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_an_error() {
        let pool = memory_pool().await.unwrap();
        seed(&pool, BoardingStatus::Day, true, 15000.0, &[("Kericho", 3500.0)]).await;

        let err = calculate_fees(&pool, &query(BoardingStatus::Day, true, Some("Bomet")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = calculate_fees(&pool, &query(BoardingStatus::Day, true, None)).await.unwrap_err();
        assert_eq!(err.field(), Some("transport_route"));
    }

    #[tokio::test]
    async fn test_boarding_transport_falls_back_to_boarding() {
        let pool = memory_pool().await.unwrap();
        seed(&pool, BoardingStatus::Boarding, false, 42000.0, &[]).await;

        let breakdown = calculate_fees(&pool, &query(BoardingStatus::Boarding, true, Some("Kericho")))
            .await
            .unwrap();
        assert_eq!(breakdown.total, 42000.0);
        assert!(breakdown.fallback_used);
    }

    #[tokio::test]
    async fn test_day_transport_has_no_fallback() {
        let pool = memory_pool().await.unwrap();
        seed(&pool, BoardingStatus::Day, false, 15000.0, &[]).await;

        let err = calculate_fees(&pool, &query(BoardingStatus::Day, true, Some("Kericho")))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::FeeStructureNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_structure_is_explicit_error() {
        let pool = memory_pool().await.unwrap();
        let err = calculate_fees(&pool, &query(BoardingStatus::Day, false, None)).await.unwrap_err();
        assert!(matches!(err, BackendError::FeeStructureNotFound { .. }));
    }
}
