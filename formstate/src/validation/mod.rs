//! Validator pipeline.
//!
//! Validators are plain closures over a value. A [`Validator`] either answers
//! right away or hands back a future; [`pipeline::run`] evaluates a list of
//! them strictly in order and stops at the first message.
//!
//! # Example
//!
//! ```
//! use formstate::validation::{rules, Validator};
//!
//! let validators: Vec<Validator<String>> = vec![
//!     rules::required("Username is required"),
//!     rules::min_length(3, "Username must be at least 3 characters"),
//!     Validator::new(|v: &String| (v == "root").then(|| "Reserved name".to_string())),
//! ];
//! assert_eq!(validators.len(), 3);
//! ```

pub mod pipeline;
pub mod rules;

mod result;
mod validator;

pub use result::ValidationResult;
pub use validator::{Check, Validator};
