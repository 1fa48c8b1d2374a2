//! Payment Gateway Webhooks
//!
//! # Module Structure
//!
//! ```text
//! webhooks/
//! ├── signature.rs  - HMAC-SHA512 body signatures
//! ├── db.rs         - Pending payment persistence
//! ├── reconciler.rs - Staging, linking, confirmation and rejection
//! └── handlers.rs   - HTTP endpoints
//! ```

pub mod db;
pub mod handlers;
pub mod reconciler;
pub mod signature;
