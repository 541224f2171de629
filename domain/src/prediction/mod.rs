//! Predictions produced by prediction units
//!
//! - [`value::PredictionValue`]: the forecast itself, shaped by the question type
//! - [`reasoned::ReasonedPrediction`]: a value together with its rationale

pub mod reasoned;
pub mod value;
