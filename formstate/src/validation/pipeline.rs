//! Sequential first-error evaluation.

use super::{Check, Validator};
use crate::error::ValidationError;

/// Runs `validators` against `value` in order.
///
/// Returns the message of the first validator that fails; validators after it
/// are never invoked. Validator N+1 only starts once validator N has resolved.
/// Resolves `Ok(None)` when every validator passes, including for an empty
/// list. A faulting asynchronous validator ends the run with
/// [`ValidationError::Fault`].
pub async fn run<V>(value: &V, validators: &[Validator<V>]) -> Result<Option<String>, ValidationError> {
    for (index, validator) in validators.iter().enumerate() {
        let message = match validator.check(value) {
            Check::Ready(message) => message,
            Check::Pending(pending) => pending
                .await
                .map_err(|source| ValidationError::fault(index, source))?,
        };

        if let Some(message) = message.filter(|m| !m.is_empty()) {
            log::trace!("validator #{} failed: {}", index, message);
            return Ok(Some(message));
        }
    }

    Ok(None)
}
