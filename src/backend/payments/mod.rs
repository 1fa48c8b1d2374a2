//! Payments
//!
//! Recording, listing and receipts. The balance update shared with the
//! webhook reconciler lives in `recorder::post_payment`.

pub mod db;
pub mod handlers;
pub mod receipt;
pub mod recorder;

pub use recorder::{post_payment, record_payment, PostedPayment};
