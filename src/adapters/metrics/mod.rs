//! Metrics Adapters - Prometheus Export and Health Checks
//!
//! - `MetricsRegistry`: Prometheus counters/gauges served on `/metrics`
//! - `MeteredActivityLog`: counts operations as they are audited
//! - `HealthServer`: `/live` and `/ready` probes

pub mod health;
pub mod metered;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use metered::MeteredActivityLog;
pub use prometheus::MetricsRegistry;
