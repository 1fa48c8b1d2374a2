//! Fees Module
//!
//! Fee structure reference data, payment deadlines and the fee calculator.
//!
//! ```text
//! fees/
//! ├── mod.rs         - Module exports
//! ├── db.rs          - Structure and deadline persistence
//! ├── calculator.rs  - Fee lookup with the boarding fallback
//! └── handlers.rs    - HTTP handlers
//! ```

pub mod calculator;
pub mod db;
pub mod handlers;

pub use calculator::{calculate_fees, initial_fee_total};
