/**
 * API Route Handlers
 *
 * This module defines the authenticated API. Every route registered here
 * sits behind `auth_middleware`; handlers narrow access further with the
 * `StaffUser` and `AdminUser` extractors.
 *
 * # Routes
 *
 * ## Accounts
 * - `GET /api/auth/me` - Current user
 * - `POST /api/auth/staff` - Create a staff account (admin)
 *
 * ## Students
 * - `GET|POST /api/students` - List / register students
 * - `GET|PUT|DELETE /api/students/{admission_number}` - Read / edit / delete
 * - `GET /api/students/{admission_number}/payments` - Payment history
 *
 * ## Fees
 * - `GET|PUT /api/fee-structures` - List / upsert fee structures
 * - `POST /api/fees/calculate` - Price a grade, boarding status and route
 * - `GET /api/fee-deadlines` - Payment deadlines
 *
 * ## Payments
 * - `GET|POST /api/payments` - List / record payments
 * - `GET /api/payments/{id}` - Single payment
 * - `GET /api/payments/{id}/receipt` - PDF receipt
 *
 * ## Pending gateway payments
 * - `GET /api/pending-payments` - Review queue
 * - `POST /api/pending-payments/{id}/link|confirm|reject`
 *
 * ## Reports and exports
 * - `GET /api/reports/...` - Dashboard, collections, defaulters, statements
 * - `GET /api/exports/payments.csv`, `GET /api/exports/defaulters.csv`
 *
 * ## Parents
 * - `GET /api/parents/students` and per-student fees and payments
 *
 * ## Messaging
 * - `POST /api/sms/send`, `POST /api/sms/reminders`
 */

use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::auth::{create_staff, get_me};
use crate::backend::{fees, notifications, parents, payments, reports, students, webhooks};
use crate::backend::server::state::AppState;

/// Configure authenticated API routes
///
/// The caller is expected to wrap the returned router with
/// `auth_middleware` via `route_layer`, so the layer applies only to the
/// routes added here.
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    let router = router
        .route("/api/auth/me", get(get_me))
        .route("/api/auth/staff", post(create_staff));

    let router = router
        .route(
            "/api/students",
            get(students::handlers::list_students).post(students::handlers::create_student),
        )
        .route(
            "/api/students/{admission_number}",
            get(students::handlers::get_student)
                .put(students::handlers::update_student)
                .delete(students::handlers::delete_student),
        )
        .route(
            "/api/students/{admission_number}/payments",
            get(payments::handlers::student_payments),
        );

    let router = router
        .route(
            "/api/fee-structures",
            get(fees::handlers::list_fee_structures).put(fees::handlers::upsert_fee_structure),
        )
        .route("/api/fees/calculate", post(fees::handlers::calculate_fees))
        .route("/api/fee-deadlines", get(fees::handlers::list_fee_deadlines));

    let router = router
        .route(
            "/api/payments",
            get(payments::handlers::list_payments).post(payments::handlers::record_payment),
        )
        .route("/api/payments/{id}", get(payments::handlers::get_payment))
        .route("/api/payments/{id}/receipt", get(payments::handlers::download_receipt));

    let router = router
        .route("/api/pending-payments", get(webhooks::handlers::list_pending))
        .route("/api/pending-payments/{id}/link", post(webhooks::handlers::link_pending))
        .route("/api/pending-payments/{id}/confirm", post(webhooks::handlers::confirm_pending))
        .route("/api/pending-payments/{id}/reject", post(webhooks::handlers::reject_pending));

    let router = router
        .route("/api/reports/dashboard", get(reports::handlers::dashboard))
        .route("/api/reports/by-method", get(reports::handlers::by_method))
        .route("/api/reports/by-grade", get(reports::handlers::by_grade))
        .route("/api/reports/defaulters", get(reports::handlers::defaulters))
        .route("/api/reports/recent-payments", get(reports::handlers::recent_payments))
        .route(
            "/api/reports/students/{admission_number}/statement",
            get(reports::handlers::student_statement),
        )
        .route("/api/exports/payments.csv", get(reports::handlers::export_payments))
        .route("/api/exports/defaulters.csv", get(reports::handlers::export_defaulters));

    router
        .route("/api/parents/students", get(parents::my_students))
        .route("/api/parents/students/{admission_number}/fees", get(parents::student_fees))
        .route(
            "/api/parents/students/{admission_number}/payments",
            get(parents::student_payments),
        )
        .route("/api/sms/send", post(notifications::handlers::send_sms))
        .route("/api/sms/reminders", post(notifications::handlers::send_reminders))
}
