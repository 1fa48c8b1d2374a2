//! Database test fixtures and utilities

use std::collections::BTreeMap;

use feedesk::backend::db;
use feedesk::backend::fees::db::upsert_structure;
use feedesk::backend::students::db::insert_student;
use feedesk::shared::fees::UpsertFeeStructureRequest;
use feedesk::shared::student::CreateStudentRequest;
use feedesk::shared::{BoardingStatus, FeeComponent, Student};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create an in-memory test database with the schema applied
pub async fn create_test_pool() -> SqlitePool {
    db::memory_pool().await.expect("Failed to create test database pool")
}

/// File-backed database for tests that need several connections
///
/// Keep the returned directory alive for as long as the pool is used.
pub async fn create_file_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("feedesk-test.db").display());
    let pool = db::connect(&url).await.expect("Failed to open file database");
    (dir, pool)
}

/// Grade 3 day scholar: 15,000 without transport, 18,000 plus a route
/// surcharge with transport (Kericho 2,500, Litein 3,000)
pub async fn seed_grade3_structures(pool: &SqlitePool) {
    upsert_structure(
        pool,
        &UpsertFeeStructureRequest {
            grade_level: "Grade 3".to_string(),
            boarding_status: BoardingStatus::Day,
            has_transport: false,
            components: vec![
                FeeComponent { name: "Tuition".to_string(), amount: 12000.0 },
                FeeComponent { name: "Activity".to_string(), amount: 3000.0 },
            ],
            transport_routes: BTreeMap::new(),
            academic_year: Some("2025".to_string()),
        },
    )
    .await
    .expect("Failed to seed day structure");

    upsert_structure(
        pool,
        &UpsertFeeStructureRequest {
            grade_level: "Grade 3".to_string(),
            boarding_status: BoardingStatus::Day,
            has_transport: true,
            components: vec![
                FeeComponent { name: "Tuition".to_string(), amount: 12000.0 },
                FeeComponent { name: "Activity".to_string(), amount: 3000.0 },
                FeeComponent { name: "Transport".to_string(), amount: 3000.0 },
            ],
            transport_routes: BTreeMap::from([
                ("Kericho".to_string(), 2500.0),
                ("Litein".to_string(), 3000.0),
            ]),
            academic_year: Some("2025".to_string()),
        },
    )
    .await
    .expect("Failed to seed transport structure");
}

pub fn student_request(admission_number: &str, parent_phone: &str) -> CreateStudentRequest {
    CreateStudentRequest {
        admission_number: admission_number.to_string(),
        name: "Achieng Otieno".to_string(),
        grade_level: "Grade 3".to_string(),
        boarding_status: BoardingStatus::Day,
        has_transport: false,
        transport_route: None,
        parent_name: "Mary Otieno".to_string(),
        parent_phone: parent_phone.to_string(),
        parent_email: Some("mary@example.com".to_string()),
    }
}

/// Insert a Grade 3 day student with the given fee total
pub async fn create_test_student(pool: &SqlitePool, admission_number: &str, total: Option<f64>) -> Student {
    insert_student(pool, &student_request(admission_number, "0712345678"), total)
        .await
        .expect("Failed to insert test student")
}
