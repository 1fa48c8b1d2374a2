//! Shared Module
//!
//! Domain types shared by the backend and API clients: students, fee
//! structures, payments, pending gateway payments, user roles, configuration
//! and the errors raised while validating them. Nothing here touches the
//! database or the network.

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Fee structures, fee details and deadlines
pub mod fees;

/// Student records
pub mod student;

/// Payment records and submissions
pub mod payment;

/// Gateway payments awaiting confirmation
pub mod pending;

/// User roles
pub mod user;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError, SmsConfig, SmtpConfig, DEFAULT_DATABASE_URL, DEFAULT_PORT};
pub use fees::{BoardingStatus, FeeBreakdown, FeeComponent, FeeDeadline, FeeDetails, FeeQuery, FeeStructure};
pub use student::Student;
pub use payment::{Payment, PaymentMethod, RecordPaymentRequest};
pub use pending::{PendingPayment, PendingPaymentStatus};
pub use user::UserRole;
