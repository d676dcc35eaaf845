//! Best-effort execution for secondary side effects.
//!
//! Rank recalculation, reviewer bonuses and boss damage run after the
//! primary transaction commits. Their failures are logged and swallowed;
//! the user-visible state is already correct by the time they run.

use tracing::warn;

/// Unwrap a secondary-effect result, logging any failure at `warn!` and
/// discarding it. Returns `None` on failure.
pub(crate) fn best_effort<T>(effect: &str, result: crate::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(effect, error = %e, "secondary effect failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_best_effort_passes_value() {
        assert_eq!(best_effort("rank", Ok(7)), Some(7));
    }

    #[test]
    fn test_best_effort_swallows_error() {
        let result: crate::Result<i32> = Err(Error::NotFound("gone".into()));
        assert_eq!(best_effort("rank", result), None);
    }
}
