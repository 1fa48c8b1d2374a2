/**
 * Student Database Operations
 *
 * Parent phone numbers are stored in international format so that parent
 * signup and USSD lookups can compare them directly.
 *
 * `apply_payment` is the only code path that changes `fees_paid`,
 * `remaining_balance` or `total_fees`. It runs inside the caller's
 * transaction and expresses every change relative to the stored row, so
 * concurrent payments for one student cannot overwrite each other.
 */

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::notifications::sms::normalize_msisdn;
use crate::shared::fees::normalize_grade;
use crate::shared::student::CreateStudentRequest;
use crate::shared::{BoardingStatus, FeeDetails, Student};

pub(crate) const STUDENT_COLUMNS: &str = "id, admission_number, name, grade_level, boarding_status, \
     has_transport, transport_route, parent_name, parent_phone, parent_email, parent_user_id, \
     total_fees, fees_paid, remaining_balance, created_at, updated_at";

pub(crate) fn student_from_row(row: &SqliteRow) -> Result<Student, sqlx::Error> {
    let status: String = row.try_get("boarding_status")?;
    Ok(Student {
        id: row.try_get("id")?,
        admission_number: row.try_get("admission_number")?,
        name: row.try_get("name")?,
        grade_level: row.try_get("grade_level")?,
        boarding_status: BoardingStatus::from_str(&status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown boarding status '{}'", status).into()))?,
        has_transport: row.try_get("has_transport")?,
        transport_route: row.try_get("transport_route")?,
        parent_name: row.try_get("parent_name")?,
        parent_phone: row.try_get("parent_phone")?,
        parent_email: row.try_get("parent_email")?,
        parent_user_id: row.try_get("parent_user_id")?,
        fee_details: FeeDetails {
            total_fees: row.try_get("total_fees")?,
            fees_paid: row.try_get("fees_paid")?,
            remaining_balance: row.try_get("remaining_balance")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Filters for the student list
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub grade_level: Option<String>,
    /// Matches name or admission number
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Insert a student, optionally with an initial fee total
pub async fn insert_student(
    pool: &SqlitePool,
    request: &CreateStudentRequest,
    initial_total: Option<f64>,
) -> Result<Student, BackendError> {
    request.validate()?;
    let now = Utc::now();
    let total = initial_total.unwrap_or(0.0);
    let route = request
        .has_transport
        .then(|| request.transport_route.as_deref().map(str::trim))
        .flatten();

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO students
            (id, admission_number, name, grade_level, boarding_status, has_transport, transport_route,
             parent_name, parent_phone, parent_email, total_fees, fees_paid, remaining_balance,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        RETURNING {STUDENT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(request.admission_number.trim().to_uppercase())
    .bind(request.name.trim())
    .bind(normalize_grade(&request.grade_level))
    .bind(request.boarding_status.as_str())
    .bind(request.has_transport)
    .bind(route)
    .bind(request.parent_name.trim())
    .bind(normalize_msisdn(&request.parent_phone))
    .bind(request.parent_email.as_deref().map(|e| e.trim().to_lowercase()))
    .bind(total)
    .bind(total)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if crate::backend::error::is_unique_violation(&e) {
            BackendError::conflict(format!(
                "Admission number {} already exists",
                request.admission_number.trim().to_uppercase()
            ))
        } else {
            e.into()
        }
    })?;

    Ok(student_from_row(&row)?)
}

pub async fn get_student_by_admission(
    pool: &SqlitePool,
    admission_number: &str,
) -> Result<Option<Student>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE admission_number = ?"))
        .bind(admission_number.trim())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(student_from_row).transpose()
}

pub async fn get_student_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Student>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(student_from_row).transpose()
}

/// Load a student or fail with 404
pub async fn require_student(pool: &SqlitePool, admission_number: &str) -> Result<Student, BackendError> {
    get_student_by_admission(pool, admission_number)
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Student {} not found", admission_number.trim())))
}

pub async fn list_students(pool: &SqlitePool, filter: &StudentFilter) -> Result<Vec<Student>, sqlx::Error> {
    let grade = filter.grade_level.as_deref().map(normalize_grade);
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let rows = sqlx::query(&format!(
        r#"
        SELECT {STUDENT_COLUMNS} FROM students
        WHERE (? IS NULL OR grade_level = ?)
          AND (? IS NULL OR name LIKE ? OR admission_number LIKE ?)
        ORDER BY grade_level, name
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(grade.as_deref())
    .bind(grade.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

/// Persist profile fields; fee details are left untouched
pub async fn update_student_profile(pool: &SqlitePool, student: &Student) -> Result<Student, BackendError> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE students SET
            name = ?, grade_level = ?, boarding_status = ?, has_transport = ?, transport_route = ?,
            parent_name = ?, parent_phone = ?, parent_email = ?, updated_at = ?
        WHERE id = ?
        RETURNING {STUDENT_COLUMNS}
        "#
    ))
    .bind(&student.name)
    .bind(normalize_grade(&student.grade_level))
    .bind(student.boarding_status.as_str())
    .bind(student.has_transport)
    .bind(student.transport_route.as_deref())
    .bind(&student.parent_name)
    .bind(normalize_msisdn(&student.parent_phone))
    .bind(student.parent_email.as_deref())
    .bind(Utc::now())
    .bind(student.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| BackendError::not_found(format!("Student {} not found", student.admission_number)))?;

    Ok(student_from_row(&row)?)
}

pub async fn count_payments(pool: &SqlitePool, student_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM payments WHERE student_id = ?")
        .bind(student_id)
        .fetch_one(pool)
        .await?;
    row.try_get("n")
}

/// Delete a student that has no payment history
pub async fn delete_student(pool: &SqlitePool, student: &Student) -> Result<(), BackendError> {
    if count_payments(pool, student.id).await? > 0 {
        return Err(BackendError::conflict(format!(
            "Student {} has payment history and cannot be deleted",
            student.admission_number
        )));
    }
    sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(student.id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Students whose parent contact matches a phone number or email
pub async fn find_students_by_parent_contact(
    pool: &SqlitePool,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<Vec<Student>, sqlx::Error> {
    let phone = phone.map(normalize_msisdn);
    let email = email.map(|e| e.trim().to_lowercase());

    let rows = sqlx::query(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students \
         WHERE (? IS NOT NULL AND parent_phone = ?) OR (? IS NOT NULL AND parent_email = ?) \
         ORDER BY name"
    ))
    .bind(phone.as_deref())
    .bind(phone.as_deref())
    .bind(email.as_deref())
    .bind(email.as_deref())
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

pub async fn link_parent(pool: &SqlitePool, student_id: Uuid, parent_user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE students SET parent_user_id = ?, updated_at = ? WHERE id = ?")
        .bind(parent_user_id)
        .bind(Utc::now())
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_students_for_parent(pool: &SqlitePool, parent_user_id: Uuid) -> Result<Vec<Student>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE parent_user_id = ? ORDER BY name"
    ))
    .bind(parent_user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

/// Apply a payment to a student's fee details inside a transaction
///
/// When the stored total is unset it becomes `fee_total` and the balance is
/// recomputed from it; otherwise the balance is only decremented. `fees_paid`
/// always grows by `amount`. All expressions read the row's pre-update values.
pub async fn apply_payment(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    amount: f64,
    fee_total: Option<f64>,
) -> Result<FeeDetails, BackendError> {
    let fee_total = fee_total.unwrap_or(0.0);

    let row = sqlx::query(
        r#"
        UPDATE students SET
            fees_paid = fees_paid + ?,
            remaining_balance = CASE
                WHEN total_fees > 0 THEN remaining_balance - ?
                ELSE ? - fees_paid - ?
            END,
            total_fees = CASE WHEN total_fees > 0 THEN total_fees ELSE ? END,
            updated_at = ?
        WHERE id = ?
        RETURNING total_fees, fees_paid, remaining_balance
        "#,
    )
    .bind(amount)
    .bind(amount)
    .bind(fee_total)
    .bind(amount)
    .bind(fee_total)
    .bind(Utc::now())
    .bind(student_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| BackendError::not_found("Student not found"))?;

    Ok(FeeDetails {
        total_fees: row.try_get("total_fees")?,
        fees_paid: row.try_get("fees_paid")?,
        remaining_balance: row.try_get("remaining_balance")?,
    })
}
