//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: provider model identities and their published quotas
//! - [`question::Question`]: a forecasting question and its resolution fields
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
pub mod question;
pub mod string;
