//! Students Module
//!
//! Student records and the balance update shared by every payment path.

pub mod db;
pub mod handlers;

pub use db::{apply_payment, require_student};
