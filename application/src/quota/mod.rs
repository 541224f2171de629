//! Per-model quota gates
//!
//! Every provider call passes through the gate of the model it is
//! accounted against. See [`QuotaGate`] for the admission rules and
//! [`QuotaRegistry`] for how gates are shared.

mod gate;
mod registry;

pub use gate::{QuotaError, QuotaGate, QuotaPermit, QuotaSnapshot};
pub use registry::QuotaRegistry;
