//! Error types

mod form;
mod validation;

pub use form::*;
pub use validation::*;
