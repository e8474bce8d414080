//! # Error Classifier
//!
//! The one path by which a failed ledger call becomes visible session state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chainbrawler_shared::UNKNOWN_ERROR_CODE;

use crate::codes;
use crate::error::{ClassifiedError, LedgerError};
use crate::store::SessionStore;

/// Turns ledger failures into [`ClassifiedError`]s and publishes them.
#[derive(Clone)]
pub struct ErrorClassifier {
    store: Arc<dyn SessionStore>,
}

impl ErrorClassifier {
    /// Creates a classifier publishing into `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Builds the classified form of `failure` without side effects.
    ///
    /// A failure without a recognizable code is classified under the unknown
    /// sentinel.
    #[must_use]
    pub fn build(failure: Option<LedgerError>, context: &[(&str, String)]) -> ClassifiedError {
        let code = failure
            .as_ref()
            .and_then(codes::extract_code)
            .unwrap_or(UNKNOWN_ERROR_CODE);

        ClassifiedError {
            category: codes::categorize(code),
            code,
            message: codes::message(code).into_owned(),
            retryable: codes::is_retryable(code),
            context: context
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect::<BTreeMap<_, _>>(),
            cause: failure,
        }
    }

    /// Classifies `failure`, sets it as the session's current error and
    /// status line, and emits a diagnostic event.
    pub fn classify(&self, failure: LedgerError, context: &[(&str, String)]) -> ClassifiedError {
        let classified = Self::build(Some(failure), context);
        self.publish(&classified);
        classified
    }

    /// Publishes an already classified error.
    pub fn publish(&self, classified: &ClassifiedError) {
        self.store.set_error(Some(classified.message.clone()));
        self.store
            .set_status_message(format!("Error: {}", classified.message));

        tracing::error!(
            code = classified.code,
            message = %classified.message,
            category = %classified.category,
            retryable = classified.retryable,
            context = ?classified.context,
            "Contract error occurred"
        );
    }

    /// Classifies `failure` for a lookup whose failure degrades to a default.
    ///
    /// Nothing is published; the session keeps whatever error state it had.
    #[must_use]
    pub fn classify_silent(&self, failure: LedgerError, context: &[(&str, String)]) -> ClassifiedError {
        let classified = Self::build(Some(failure), context);
        tracing::debug!(
            code = classified.code,
            message = %classified.message,
            context = ?classified.context,
            "Degraded ledger lookup"
        );
        classified
    }
}
