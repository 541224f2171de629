//! Port for structured forecast event logging.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics,
//! this port records machine-readable events (research finished,
//! prediction failed, report saved) for later inspection.

use serde_json::Value;

/// A structured forecast event
pub struct ForecastEvent {
    /// Event type identifier (e.g., "research_complete", "report_saved").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ForecastEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for forecast events
///
/// `log` is synchronous and non-fallible; write failures are dropped by
/// the implementation.
pub trait ForecastEventLogger: Send + Sync {
    fn log(&self, event: ForecastEvent);
}

/// No-op implementation for tests and when event logging is disabled.
pub struct NoEventLogger;

impl ForecastEventLogger for NoEventLogger {
    fn log(&self, _event: ForecastEvent) {}
}
