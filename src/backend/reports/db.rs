/**
 * Reporting Queries
 *
 * Read-only aggregations over students and payments. Each report is a single
 * query; nothing here writes.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub student_count: i64,
    pub total_expected: f64,
    pub total_collected: f64,
    pub total_outstanding: f64,
    /// Percentage of expected fees collected
    pub collection_rate: f64,
    pub collected_today: f64,
    pub payments_today: i64,
    pub pending_gateway_payments: i64,
    pub defaulter_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodTotal {
    pub method: String,
    pub payment_count: i64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeSummary {
    pub grade_level: String,
    pub student_count: i64,
    pub expected: f64,
    pub collected: f64,
    pub outstanding: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Defaulter {
    pub admission_number: String,
    pub name: String,
    pub grade_level: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub total_fees: f64,
    pub fees_paid: f64,
    pub remaining_balance: f64,
}

impl Defaulter {
    pub fn percent_paid(&self) -> f64 {
        if self.total_fees > 0.0 {
            (self.fees_paid / self.total_fees * 100.0).min(100.0)
        } else {
            0.0
        }
    }
}

pub async fn dashboard_summary(pool: &SqlitePool, day_start: DateTime<Utc>) -> Result<DashboardSummary, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM students) AS student_count,
            (SELECT COALESCE(SUM(total_fees), 0.0) FROM students) AS total_expected,
            (SELECT COALESCE(SUM(fees_paid), 0.0) FROM students) AS total_collected,
            (SELECT COALESCE(SUM(MAX(remaining_balance, 0.0)), 0.0) FROM students) AS total_outstanding,
            (SELECT COALESCE(SUM(amount), 0.0) FROM payments WHERE paid_at >= ?) AS collected_today,
            (SELECT COUNT(*) FROM payments WHERE paid_at >= ?) AS payments_today,
            (SELECT COUNT(*) FROM pending_payments WHERE status = 'pending') AS pending_gateway_payments,
            (SELECT COUNT(*) FROM students WHERE remaining_balance > 0) AS defaulter_count
        "#,
    )
    .bind(day_start)
    .bind(day_start)
    .fetch_one(pool)
    .await?;

    let total_expected: f64 = row.try_get("total_expected")?;
    let total_collected: f64 = row.try_get("total_collected")?;
    let collection_rate = if total_expected > 0.0 {
        (total_collected / total_expected * 1000.0).round() / 10.0
    } else {
        0.0
    };

    Ok(DashboardSummary {
        student_count: row.try_get("student_count")?,
        total_expected,
        total_collected,
        total_outstanding: row.try_get("total_outstanding")?,
        collection_rate,
        collected_today: row.try_get("collected_today")?,
        payments_today: row.try_get("payments_today")?,
        pending_gateway_payments: row.try_get("pending_gateway_payments")?,
        defaulter_count: row.try_get("defaulter_count")?,
    })
}

pub async fn collections_by_method(
    pool: &SqlitePool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<MethodTotal>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT method, COUNT(*) AS payment_count, SUM(amount) AS total
        FROM payments
        WHERE (? IS NULL OR paid_at >= ?) AND (? IS NULL OR paid_at < ?)
        GROUP BY method
        ORDER BY total DESC
        "#,
    )
    .bind(from)
    .bind(from)
    .bind(to)
    .bind(to)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(MethodTotal {
                method: row.try_get("method")?,
                payment_count: row.try_get("payment_count")?,
                total: row.try_get("total")?,
            })
        })
        .collect()
}

pub async fn collections_by_grade(pool: &SqlitePool) -> Result<Vec<GradeSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT grade_level,
               COUNT(*) AS student_count,
               SUM(total_fees) AS expected,
               SUM(fees_paid) AS collected,
               SUM(MAX(remaining_balance, 0.0)) AS outstanding
        FROM students
        GROUP BY grade_level
        ORDER BY grade_level
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(GradeSummary {
                grade_level: row.try_get("grade_level")?,
                student_count: row.try_get("student_count")?,
                expected: row.try_get("expected")?,
                collected: row.try_get("collected")?,
                outstanding: row.try_get("outstanding")?,
            })
        })
        .collect()
}

/// Students whose remaining balance exceeds `min_balance`, largest first
pub async fn defaulters(
    pool: &SqlitePool,
    grade_level: Option<&str>,
    min_balance: f64,
) -> Result<Vec<Defaulter>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT admission_number, name, grade_level, parent_name, parent_phone,
               total_fees, fees_paid, remaining_balance
        FROM students
        WHERE remaining_balance > ?
          AND (? IS NULL OR grade_level = ?)
        ORDER BY remaining_balance DESC, name
        "#,
    )
    .bind(min_balance)
    .bind(grade_level)
    .bind(grade_level)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Defaulter {
                admission_number: row.try_get("admission_number")?,
                name: row.try_get("name")?,
                grade_level: row.try_get("grade_level")?,
                parent_name: row.try_get("parent_name")?,
                parent_phone: row.try_get("parent_phone")?,
                total_fees: row.try_get("total_fees")?,
                fees_paid: row.try_get("fees_paid")?,
                remaining_balance: row.try_get("remaining_balance")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;
    use crate::backend::payments::recorder::record_payment;
    use crate::backend::students::db::insert_student;
    use crate::shared::student::CreateStudentRequest;
    use crate::shared::{BoardingStatus, PaymentMethod, RecordPaymentRequest};
    use chrono::Duration;

    async fn student(pool: &SqlitePool, admission: &str, grade: &str, total: f64) {
        insert_student(
            pool,
            &CreateStudentRequest {
                admission_number: admission.to_string(),
                name: format!("Student {}", admission),
                grade_level: grade.to_string(),
                boarding_status: BoardingStatus::Day,
                has_transport: false,
                transport_route: None,
                parent_name: "Parent".to_string(),
                parent_phone: "0712345678".to_string(),
                parent_email: None,
            },
            Some(total),
        )
        .await
        .unwrap();
    }

    async fn pay(pool: &SqlitePool, admission: &str, amount: f64, method: PaymentMethod, reference: Option<&str>) {
        record_payment(
            pool,
            &RecordPaymentRequest {
                admission_number: admission.to_string(),
                amount,
                method,
                reference: reference.map(str::to_string),
                in_kind: None,
                notes: None,
                paid_at: None,
            },
            None,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_reports_over_seeded_data() {
        let pool = memory_pool().await.unwrap();
        student(&pool, "ADM001", "Grade 3", 10000.0).await;
        student(&pool, "ADM002", "Grade 3", 10000.0).await;
        student(&pool, "ADM003", "Grade 4", 20000.0).await;
        pay(&pool, "ADM001", 10000.0, PaymentMethod::Cash, None).await;
        pay(&pool, "ADM002", 4000.0, PaymentMethod::Mpesa, Some("QA1")).await;
        pay(&pool, "ADM003", 1000.0, PaymentMethod::Mpesa, Some("QA2")).await;

        let summary = dashboard_summary(&pool, Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(summary.student_count, 3);
        assert_eq!(summary.total_expected, 40000.0);
        assert_eq!(summary.total_collected, 15000.0);
        assert_eq!(summary.total_outstanding, 25000.0);
        assert_eq!(summary.collection_rate, 37.5);
        assert_eq!(summary.payments_today, 3);
        assert_eq!(summary.defaulter_count, 2);

        let methods = collections_by_method(&pool, None, None).await.unwrap();
        assert_eq!(methods[0].method, "cash");
        assert_eq!(methods[1].payment_count, 2);

        let grades = collections_by_grade(&pool).await.unwrap();
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].collected, 14000.0);

        let owing = defaulters(&pool, None, 0.0).await.unwrap();
        assert_eq!(owing.len(), 2);
        assert_eq!(owing[0].admission_number, "ADM003");
        assert_eq!(owing[1].percent_paid(), 40.0);

        let grade3 = defaulters(&pool, Some("grade 3"), 0.0).await.unwrap();
        assert_eq!(grade3.len(), 1);
    }

    #[tokio::test]
    async fn test_credit_balances_do_not_count_as_outstanding() {
        let pool = memory_pool().await.unwrap();
        student(&pool, "ADM001", "Grade 3", 1000.0).await;
        pay(&pool, "ADM001", 1500.0, PaymentMethod::Cash, None).await;

        let summary = dashboard_summary(&pool, Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(summary.total_outstanding, 0.0);
        assert_eq!(summary.total_collected, 1500.0);
        assert_eq!(summary.defaulter_count, 0);

        let grades = collections_by_grade(&pool).await.unwrap();
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].outstanding, 0.0);
        assert_eq!(grades[0].collected, 1500.0);
    }
}
