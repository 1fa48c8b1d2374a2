//! Reporting
//!
//! Dashboard aggregations, defaulter lists, statements and CSV exports.

pub mod db;
pub mod export;
pub mod handlers;
