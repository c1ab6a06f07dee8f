//! # easyconnect-observability
//!
//! Observability-Crate fuer EasyConnect:
//! - Prometheus-kompatible Metriken des Coordinators (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthKennzahlen, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, CoordinatorMetrics};
pub use middleware::{request_timing_layer, timing_middleware};
