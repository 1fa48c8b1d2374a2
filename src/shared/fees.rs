//! Fee Structure Data Structures
//!
//! Fee structures are reference data keyed by grade level, boarding status and
//! whether the student uses school transport. Each structure carries its line
//! items, a precomputed total and, for transport structures, a surcharge per
//! route.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Whether a student boards or attends as a day scholar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoardingStatus {
    #[default]
    Day,
    Boarding,
}

impl BoardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardingStatus::Day => "day",
            BoardingStatus::Boarding => "boarding",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" => Some(BoardingStatus::Day),
            "boarding" | "boarder" => Some(BoardingStatus::Boarding),
            _ => None,
        }
    }
}

/// A single line item of a fee structure (tuition, meals, activity...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeComponent {
    pub name: String,
    pub amount: f64,
}

/// Fee structure row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeStructure {
    pub id: Uuid,
    pub grade_level: String,
    pub boarding_status: BoardingStatus,
    pub has_transport: bool,
    pub components: Vec<FeeComponent>,
    /// Sum of `components`, stored so lookups never recompute it
    pub total_calculated: f64,
    /// Lower-cased route name to surcharge
    #[serde(default)]
    pub transport_routes: BTreeMap<String, f64>,
    pub academic_year: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeeStructure {
    /// Surcharge for a route, matched case-insensitively
    pub fn route_surcharge(&self, route: &str) -> Option<f64> {
        self.transport_routes.get(&normalize_route(route)).copied()
    }
}

/// Canonical form of a route name as used for `transport_routes` keys
pub fn normalize_route(route: &str) -> String {
    route.trim().to_lowercase()
}

/// Grade label with surrounding and repeated whitespace removed.
/// Grade comparisons in the database are case-insensitive.
pub fn normalize_grade(grade: &str) -> String {
    grade.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shilling amount with thousands separators, e.g. `KES 15,000.00`.
/// Negative balances (credit) keep their sign.
pub fn format_kes(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("KES {}{}.{:02}", sign, grouped, cents % 100)
}

/// Request to create or replace a fee structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertFeeStructureRequest {
    pub grade_level: String,
    pub boarding_status: BoardingStatus,
    #[serde(default)]
    pub has_transport: bool,
    pub components: Vec<FeeComponent>,
    #[serde(default)]
    pub transport_routes: BTreeMap<String, f64>,
    #[serde(default)]
    pub academic_year: Option<String>,
}

impl UpsertFeeStructureRequest {
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.grade_level.trim().is_empty() {
            return Err(SharedError::validation("grade_level", "Grade level is required"));
        }
        if self.components.is_empty() {
            return Err(SharedError::validation("components", "At least one fee component is required"));
        }
        for component in &self.components {
            if component.name.trim().is_empty() {
                return Err(SharedError::validation("components", "Component name is required"));
            }
            if !component.amount.is_finite() || component.amount < 0.0 {
                return Err(SharedError::validation(
                    "components",
                    format!("Amount for '{}' must be zero or positive", component.name),
                ));
            }
        }
        if !self.has_transport && !self.transport_routes.is_empty() {
            return Err(SharedError::validation(
                "transport_routes",
                "Transport routes only apply to transport structures",
            ));
        }
        for (route, surcharge) in &self.transport_routes {
            if route.trim().is_empty() || !surcharge.is_finite() || *surcharge < 0.0 {
                return Err(SharedError::validation(
                    "transport_routes",
                    format!("Invalid surcharge for route '{}'", route),
                ));
            }
        }
        Ok(())
    }

    /// Sum of the component amounts
    pub fn total(&self) -> f64 {
        self.components.iter().map(|c| c.amount).sum()
    }

    /// Route map with canonical keys
    pub fn normalized_routes(&self) -> BTreeMap<String, f64> {
        self.transport_routes
            .iter()
            .map(|(route, amount)| (normalize_route(route), *amount))
            .collect()
    }
}

/// Input to the fee calculator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeQuery {
    pub grade_level: String,
    pub boarding_status: BoardingStatus,
    #[serde(default)]
    pub has_transport: bool,
    #[serde(default)]
    pub transport_route: Option<String>,
}

/// Result of a fee calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeBreakdown {
    pub structure_id: Uuid,
    pub base_total: f64,
    pub transport_surcharge: f64,
    pub total: f64,
    /// True when a fallback structure was used instead of the exact match
    pub fallback_used: bool,
}

/// Denormalised balance summary stored on the student
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct FeeDetails {
    pub total_fees: f64,
    pub fees_paid: f64,
    pub remaining_balance: f64,
}

impl FeeDetails {
    /// Whether the fee total has been initialised from a fee structure
    pub fn is_initialized(&self) -> bool {
        self.total_fees > 0.0
    }
}

/// Payment deadline (reference data)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeDeadline {
    pub id: Uuid,
    pub label: String,
    /// `None` applies to every grade
    pub grade_level: Option<String>,
    pub due_date: NaiveDate,
    /// Share of the total fees expected to be paid by the due date
    pub minimum_percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boarding_status_parsing() {
        assert_eq!(BoardingStatus::from_str("Day"), Some(BoardingStatus::Day));
        assert_eq!(BoardingStatus::from_str(" boarding "), Some(BoardingStatus::Boarding));
        assert_eq!(BoardingStatus::from_str("weekly"), None);
        assert_eq!(BoardingStatus::Boarding.as_str(), "boarding");
    }

    #[test]
    fn test_normalize_grade() {
        assert_eq!(normalize_grade("  Grade   3 "), "Grade 3");
        assert_eq!(normalize_grade("PP1"), "PP1");
        assert_eq!(normalize_grade(""), "");
    }

    #[test]
    fn test_format_kes() {
        assert_eq!(format_kes(15000.0), "KES 15,000.00");
        assert_eq!(format_kes(999.5), "KES 999.50");
        assert_eq!(format_kes(1234567.891), "KES 1,234,567.89");
        assert_eq!(format_kes(-2500.0), "KES -2,500.00");
        assert_eq!(format_kes(0.0), "KES 0.00");
    }

    #[test]
    fn test_upsert_validation() {
        let mut request = UpsertFeeStructureRequest {
            grade_level: "Grade 3".to_string(),
            boarding_status: BoardingStatus::Day,
            has_transport: false,
            components: vec![FeeComponent { name: "Tuition".to_string(), amount: 12000.0 }],
            transport_routes: BTreeMap::new(),
            academic_year: None,
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.total(), 12000.0);

        request.transport_routes.insert("Kericho".to_string(), 3000.0);
        let err = request.validate().unwrap_err();
        assert_eq!(err.field(), Some("transport_routes"));

        request.has_transport = true;
        assert!(request.validate().is_ok());
        assert_eq!(request.normalized_routes().get("kericho"), Some(&3000.0));

        request.components[0].amount = -1.0;
        assert_eq!(request.validate().unwrap_err().field(), Some("components"));
    }

    #[test]
    fn test_fee_details_initialized() {
        assert!(!FeeDetails::default().is_initialized());
        let details = FeeDetails { total_fees: 100.0, fees_paid: 0.0, remaining_balance: 100.0 };
        assert!(details.is_initialized());
    }
}
