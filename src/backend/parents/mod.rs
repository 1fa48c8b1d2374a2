/**
 * Parent Portal
 *
 * Parents see only the students linked to their account.
 *
 * - `GET /api/parents/students`
 * - `GET /api/parents/students/{admission_number}/fees`
 * - `GET /api/parents/students/{admission_number}/payments`
 */

use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::{AuthUser, AuthenticatedUser};
use crate::backend::payments::db::list_payments_for_student;
use crate::backend::students::db::list_students_for_parent;
use crate::backend::students::require_student;
use crate::shared::{FeeDetails, Payment, Student};

/// Staff see every student; parents only their own
pub fn ensure_can_view(user: &AuthenticatedUser, student: &Student) -> Result<(), BackendError> {
    if user.role.is_staff() || student.parent_user_id == Some(user.user_id) {
        return Ok(());
    }
    tracing::warn!("{} denied access to student {}", user.email, student.admission_number);
    Err(BackendError::forbidden("You do not have access to this student"))
}

async fn visible_student(pool: &SqlitePool, user: &AuthenticatedUser, admission_number: &str) -> BackendResult<Student> {
    let student = require_student(pool, admission_number).await?;
    ensure_can_view(user, &student)?;
    Ok(student)
}

pub async fn my_students(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
) -> BackendResult<Json<Vec<Student>>> {
    Ok(Json(list_students_for_parent(&pool, user.user_id).await?))
}

pub async fn student_fees(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(admission_number): Path<String>,
) -> BackendResult<Json<FeeDetails>> {
    let student = visible_student(&pool, &user, &admission_number).await?;
    Ok(Json(student.fee_details))
}

pub async fn student_payments(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(admission_number): Path<String>,
) -> BackendResult<Json<Vec<Payment>>> {
    let student = visible_student(&pool, &user, &admission_number).await?;
    Ok(Json(list_payments_for_student(&pool, student.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{BoardingStatus, UserRole};
    use axum::http::StatusCode;
    use chrono::Utc;
    use uuid::Uuid;

    fn student(parent: Option<Uuid>) -> Student {
        let now = Utc::now();
        Student {
            id: Uuid::new_v4(),
            admission_number: "ADM001".to_string(),
            name: "Achieng Otieno".to_string(),
            grade_level: "Grade 3".to_string(),
            boarding_status: BoardingStatus::Day,
            has_transport: false,
            transport_route: None,
            parent_name: "Mary Otieno".to_string(),
            parent_phone: "+254712345678".to_string(),
            parent_email: None,
            parent_user_id: parent,
            fee_details: FeeDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_visibility_rules() {
        let staff = user(UserRole::Staff);
        let parent = user(UserRole::Parent);
        let other_parent = user(UserRole::Parent);
        let record = student(Some(parent.user_id));

        assert!(ensure_can_view(&staff, &record).is_ok());
        assert!(ensure_can_view(&parent, &record).is_ok());
        assert_eq!(
            ensure_can_view(&other_parent, &record).unwrap_err().status_code(),
            StatusCode::FORBIDDEN
        );
        assert!(ensure_can_view(&parent, &student(None)).is_err());
    }
}
