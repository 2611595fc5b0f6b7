//! Activity Adapters - Audit Trail Storage
//!
//! Implements the `ActivityLog` port:
//! - `RamActivityLog`: synchronous in-memory append
//! - `JsonlActivityLog`: append-only JSONL file fed by a background writer

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlActivityLog;
pub use memory::RamActivityLog;
