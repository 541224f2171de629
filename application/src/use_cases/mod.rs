//! Use cases (application services)

pub mod forecast_question;
pub mod forecast_questions;
pub mod prediction_unit;
pub mod research_unit;

#[cfg(test)]
pub(crate) mod test_support;
