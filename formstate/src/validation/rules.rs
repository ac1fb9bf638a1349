//! Built-in rules.
//!
//! Each rule takes the failure message up front and returns a synchronous
//! [`Validator`]. Rules that only make sense for present values (length
//! limits, patterns, email) let `None` pass; combine them with [`required`]
//! to demand a value.

use std::sync::Arc;

use regex::Regex;

use super::Validator;

/// Error returned by [`pattern`] for an invalid regular expression.
pub type PatternError = regex::Error;

/// Values that can be empty.
pub trait Blank {
    /// Returns `true` if the value counts as "not filled in".
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for bool {
    fn is_blank(&self) -> bool {
        !*self
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Blank> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().is_none_or(Blank::is_blank)
    }
}

impl Blank for serde_json::Value {
    fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Number(n) => n.as_f64() == Some(0.0),
            Self::String(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
        }
    }
}

macro_rules! impl_blank_for_numbers {
    ($($ty:ty),*) => {
        $(
            impl Blank for $ty {
                fn is_blank(&self) -> bool {
                    *self == (0 as $ty)
                }
            }
        )*
    };
}

impl_blank_for_numbers!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

/// Values with a length.
pub trait Measure {
    /// Length in characters or elements; `None` when there is nothing to measure.
    fn measure(&self) -> Option<usize>;
}

impl Measure for String {
    fn measure(&self) -> Option<usize> {
        Some(self.chars().count())
    }
}

impl<T> Measure for Vec<T> {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T: Measure> Measure for Option<T> {
    fn measure(&self) -> Option<usize> {
        self.as_ref().and_then(Measure::measure)
    }
}

/// Values that may carry text.
pub trait AsText {
    /// The text, if any.
    fn as_text(&self) -> Option<&str>;
}

impl AsText for String {
    fn as_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: AsText> AsText for Option<T> {
    fn as_text(&self) -> Option<&str> {
        self.as_ref().and_then(AsText::as_text)
    }
}

fn failing_when<V: 'static, F>(message: impl Into<String>, fails: F) -> Validator<V>
where
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    let message: Arc<str> = message.into().into();
    Validator::new(move |value| fails(value).then(|| message.to_string()))
}

/// Require a non-blank value.
pub fn required<V: Blank + 'static>(message: impl Into<String>) -> Validator<V> {
    failing_when(message, |v: &V| v.is_blank())
}

/// Require text that is not empty once spaces are removed.
pub fn not_blank<V: AsText + 'static>(message: impl Into<String>) -> Validator<V> {
    failing_when(message, |v: &V| {
        v.as_text().is_none_or(|text| text.trim().is_empty())
    })
}

/// Require at least `min` characters or elements.
pub fn min_length<V: Measure + 'static>(min: usize, message: impl Into<String>) -> Validator<V> {
    failing_when(message, move |v: &V| v.measure().is_some_and(|len| len < min))
}

/// Require at most `max` characters or elements.
pub fn max_length<V: Measure + 'static>(max: usize, message: impl Into<String>) -> Validator<V> {
    failing_when(message, move |v: &V| v.measure().is_some_and(|len| len > max))
}

/// Require exactly `len` characters or elements. A missing value fails.
pub fn exact_length<V: Measure + 'static>(len: usize, message: impl Into<String>) -> Validator<V> {
    failing_when(message, move |v: &V| v.measure() != Some(len))
}

/// Require the text to match a regex pattern.
pub fn pattern<V: AsText + 'static>(pattern: &str, message: impl Into<String>) -> Result<Validator<V>, PatternError> {
    let re = Regex::new(pattern)?;
    Ok(failing_when(message, move |v: &V| {
        v.as_text().is_some_and(|text| !re.is_match(text))
    }))
}

/// Require a valid email address. Empty text passes; use [`required`] for non-empty.
pub fn email<V: AsText + 'static>(message: impl Into<String>) -> Validator<V> {
    failing_when(message, |v: &V| {
        v.as_text()
            .is_some_and(|text| !text.is_empty() && !email_address::EmailAddress::is_valid(text))
    })
}

/// Require a value of at least `limit`.
pub fn min<V>(limit: V, message: impl Into<String>) -> Validator<V>
where
    V: PartialOrd + Send + Sync + 'static,
{
    failing_when(message, move |v: &V| *v < limit)
}

/// Require a value of at most `limit`.
pub fn max<V>(limit: V, message: impl Into<String>) -> Validator<V>
where
    V: PartialOrd + Send + Sync + 'static,
{
    failing_when(message, move |v: &V| *v > limit)
}

/// Require a value within `low..=high`.
pub fn range<V>(low: V, high: V, message: impl Into<String>) -> Validator<V>
where
    V: PartialOrd + Send + Sync + 'static,
{
    failing_when(message, move |v: &V| *v < low || *v > high)
}

/// Require the value to be one of `options`.
pub fn one_of<V, I>(options: I, message: impl Into<String>) -> Validator<V>
where
    V: PartialEq + Send + Sync + 'static,
    I: IntoIterator<Item = V>,
{
    let options: Vec<V> = options.into_iter().collect();
    failing_when(message, move |v: &V| !options.contains(v))
}
