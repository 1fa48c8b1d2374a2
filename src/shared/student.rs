//! Student Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::fees::{normalize_grade, BoardingStatus, FeeDetails, FeeQuery};

/// Student record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub admission_number: String,
    pub name: String,
    pub grade_level: String,
    pub boarding_status: BoardingStatus,
    pub has_transport: bool,
    pub transport_route: Option<String>,
    pub parent_name: String,
    pub parent_phone: String,
    pub parent_email: Option<String>,
    /// Parent account linked through parent signup
    pub parent_user_id: Option<Uuid>,
    pub fee_details: FeeDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Fee calculator input for this student
    pub fn fee_query(&self) -> FeeQuery {
        FeeQuery {
            grade_level: self.grade_level.clone(),
            boarding_status: self.boarding_status,
            has_transport: self.has_transport,
            transport_route: self.transport_route.clone(),
        }
    }
}

/// Request to create a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudentRequest {
    pub admission_number: String,
    pub name: String,
    pub grade_level: String,
    #[serde(default)]
    pub boarding_status: BoardingStatus,
    #[serde(default)]
    pub has_transport: bool,
    #[serde(default)]
    pub transport_route: Option<String>,
    pub parent_name: String,
    pub parent_phone: String,
    #[serde(default)]
    pub parent_email: Option<String>,
}

impl CreateStudentRequest {
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.admission_number.trim().is_empty() {
            return Err(SharedError::validation("admission_number", "Admission number is required"));
        }
        if self.name.trim().is_empty() {
            return Err(SharedError::validation("name", "Student name is required"));
        }
        if normalize_grade(&self.grade_level).is_empty() {
            return Err(SharedError::validation("grade_level", "Grade level is required"));
        }
        validate_transport(self.has_transport, self.transport_route.as_deref())?;
        if self.parent_name.trim().is_empty() {
            return Err(SharedError::validation("parent_name", "Parent name is required"));
        }
        validate_phone(&self.parent_phone)?;
        if let Some(email) = &self.parent_email {
            validate_email("parent_email", email)?;
        }
        Ok(())
    }
}

/// Partial update of a student; absent fields are left unchanged
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub grade_level: Option<String>,
    pub boarding_status: Option<BoardingStatus>,
    pub has_transport: Option<bool>,
    pub transport_route: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub parent_email: Option<String>,
}

impl UpdateStudentRequest {
    /// Apply the update to an existing record, validating the result
    pub fn apply(&self, student: &mut Student) -> Result<(), SharedError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(SharedError::validation("name", "Student name is required"));
            }
            student.name = name.trim().to_string();
        }
        if let Some(grade) = &self.grade_level {
            let grade = normalize_grade(grade);
            if grade.is_empty() {
                return Err(SharedError::validation("grade_level", "Grade level is required"));
            }
            student.grade_level = grade;
        }
        if let Some(status) = self.boarding_status {
            student.boarding_status = status;
        }
        if let Some(has_transport) = self.has_transport {
            student.has_transport = has_transport;
            if !has_transport {
                student.transport_route = None;
            }
        }
        if let Some(route) = &self.transport_route {
            student.transport_route = Some(route.trim().to_string());
        }
        validate_transport(student.has_transport, student.transport_route.as_deref())?;
        if let Some(parent_name) = &self.parent_name {
            student.parent_name = parent_name.trim().to_string();
        }
        if let Some(phone) = &self.parent_phone {
            validate_phone(phone)?;
            student.parent_phone = phone.trim().to_string();
        }
        if let Some(email) = &self.parent_email {
            validate_email("parent_email", email)?;
            student.parent_email = Some(email.trim().to_lowercase());
        }
        Ok(())
    }
}

fn validate_transport(has_transport: bool, route: Option<&str>) -> Result<(), SharedError> {
    if has_transport && route.map(str::trim).unwrap_or_default().is_empty() {
        return Err(SharedError::validation(
            "transport_route",
            "Transport route is required when transport is enabled",
        ));
    }
    Ok(())
}

/// Phone numbers are accepted as digits with an optional leading '+'
pub fn validate_phone(phone: &str) -> Result<(), SharedError> {
    let phone = phone.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.len() < 9 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SharedError::validation("parent_phone", "Invalid phone number"));
    }
    Ok(())
}

pub fn validate_email(field: &str, email: &str) -> Result<(), SharedError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(SharedError::validation(field, "Invalid email format")),
    }
}
