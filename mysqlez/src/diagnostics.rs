//! Optional sink for operational errors.
//!
//! A [`Client`](crate::Client) returns every error to its caller and keeps no
//! error history itself. Callers that want a running log attach a
//! [`Diagnostics`] implementation; [`ErrorLog`] is the in-memory one.

use std::sync::{Mutex, PoisonError};

use crate::error::DbError;

/// Receives every operational error a client reports, including the
/// non-fatal charset failure on connect.
pub trait Diagnostics: Send + Sync {
    /// Records one error.
    fn record(&self, error: &DbError);
}

/// Collects reported errors in memory, oldest first.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Mutex<Vec<DbError>>,
}

impl ErrorLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded error.
    #[must_use]
    pub fn entries(&self) -> Vec<DbError> {
        self.lock().clone()
    }

    /// Returns the most recent error.
    #[must_use]
    pub fn last(&self) -> Option<DbError> {
        self.lock().last().cloned()
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes and returns every recorded error.
    pub fn drain(&self) -> Vec<DbError> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DbError>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Diagnostics for ErrorLog {
    fn record(&self, error: &DbError) {
        self.lock().push(error.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;

    #[test]
    fn keeps_errors_in_order_until_drained() {
        let log = ErrorLog::new();
        assert!(log.is_empty());
        log.record(&DbError::new(Operation::Prepare, "first"));
        log.record(&DbError::new(Operation::Execute, "second"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.last().map(|e| e.message), Some("second".to_string()));

        let drained = log.drain();
        assert_eq!(drained[0].operation, Operation::Prepare);
        assert!(log.is_empty());
    }
}
