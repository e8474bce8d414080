//! # Operation Lifecycle Controller
//!
//! Tracks the one in-flight operation of a session and is the boundary at
//! which ledger failures are turned into classified errors.
//!
//! ```text
//!   empty ──start──▶ pending ──update──▶ processing ──complete──▶ completed
//!                       │                    │                       │
//!                       └──────fail──────────┴──▶ error ──clear──▶ empty
//! ```
//!
//! A start request while another operation is active, the session is
//! loading, or an error is pending is refused, never queued.

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use chainbrawler_shared::{Operation, OperationStatus, OperationType, OperationUpdate};

use crate::classifier::ErrorClassifier;
use crate::clock::Clock;
use crate::error::{ClassifiedError, CoreError, CoreResult, LedgerError};
use crate::retry::{self, RetryPolicy};
use crate::store::SessionStore;

/// Status line after an error is acknowledged.
pub const READY_STATUS: &str = "Ready for action";

/// Single-flight operation guard for one session.
#[derive(Clone)]
pub struct OperationController {
    store: Arc<dyn SessionStore>,
    classifier: ErrorClassifier,
    clock: Arc<dyn Clock>,
}

impl OperationController {
    /// Creates a controller over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            classifier: ErrorClassifier::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    /// The session store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// The classifier publishing into this session.
    #[must_use]
    pub const fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Current wall time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Whether a new operation may start.
    ///
    /// Advisory: callers are expected to check before [`Self::start`];
    /// [`Self::try_begin`] does both.
    #[must_use]
    pub fn can_start(&self, operation_type: OperationType) -> bool {
        let active = self
            .store
            .operation()
            .is_some_and(|op| op.is_active && !op.is_finished());
        let allowed = !active && !self.store.is_loading() && self.store.error().is_none();
        if !allowed {
            tracing::debug!(operation = %operation_type, active, "Operation refused");
        }
        allowed
    }

    /// Publishes a fresh pending operation, merged with `extra`.
    pub fn start(&self, operation_type: OperationType, extra: OperationUpdate) {
        let mut operation = Operation::started(operation_type, self.now());
        extra.apply_to(&mut operation);
        self.store.update_operation(Some(operation));
        tracing::info!(operation = %operation_type, "Operation started");
    }

    /// Checks [`Self::can_start`] and starts the operation.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationRefused`] when the guard refuses.
    pub fn try_begin(&self, operation_type: OperationType) -> CoreResult<()> {
        if !self.can_start(operation_type) {
            return Err(CoreError::OperationRefused(operation_type));
        }
        self.start(operation_type, OperationUpdate::default());
        Ok(())
    }

    /// Sets the status of the current operation. No-op when the slot is empty.
    pub fn update_status(&self, status: OperationStatus, extra: OperationUpdate) {
        if let Some(mut operation) = self.store.operation() {
            operation.status = status;
            extra.apply_to(&mut operation);
            self.store.update_operation(Some(operation));
        }
    }

    /// Marks the operation completed and merges `result` (typically a
    /// transaction hash).
    pub fn complete(&self, result: OperationUpdate) {
        let mut operation = self.finished(OperationStatus::Completed, Operation::COMPLETED);
        let finished = operation.operation_type.take();
        result.apply_to(&mut operation);
        self.store.update_operation(Some(operation));
        tracing::info!(operation = ?finished, "Operation completed");
    }

    /// Marks the operation failed with `message`.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        let mut operation = self.finished(OperationStatus::Error, Operation::FAILED);
        let failed = operation.operation_type.take();
        tracing::warn!(operation = ?failed, error = %message, "Operation failed");
        operation.error = Some(message);
        self.store.update_operation(Some(operation));
    }

    /// Empties the operation slot.
    pub fn clear(&self) {
        self.store.update_operation(None);
    }

    /// Acknowledges the current error so new operations may start.
    pub fn clear_error(&self) {
        self.store.set_error(None);
        self.store.set_status_message(READY_STATUS.to_string());
    }

    /// Terminal form of the current operation, keeping its start time and
    /// write flag.
    fn finished(&self, status: OperationStatus, progress: &str) -> Operation {
        let current = self.store.operation();
        Operation {
            operation_type: current.as_ref().and_then(|op| op.operation_type),
            status,
            is_active: false,
            is_write_operation: current.as_ref().is_some_and(|op| op.is_write_operation),
            start_time: current.map_or_else(|| self.now(), |op| op.start_time),
            progress: progress.to_string(),
            error: None,
            hash: None,
        }
    }

    /// Runs `body` as a guarded operation.
    ///
    /// Starts `operation_type`, sets `status` as the status line, moves to
    /// processing, and completes or fails according to the outcome. `body`
    /// is not polled if the guard refuses.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationRefused`], or whatever `body` fails with.
    pub async fn run<T, Fut>(
        &self,
        operation_type: OperationType,
        status: &str,
        body: Fut,
    ) -> CoreResult<T>
    where
        Fut: Future<Output = CoreResult<(T, OperationUpdate)>>,
    {
        self.try_begin(operation_type)?;
        self.store.set_status_message(status.to_string());
        self.update_status(OperationStatus::Processing, OperationUpdate::default());

        match body.await {
            Ok((value, result)) => {
                self.complete(result);
                Ok(value)
            }
            Err(err) => {
                self.fail(err.to_string());
                Err(err)
            }
        }
    }

    // =========================================================================
    // LEDGER CALL BOUNDARY
    // =========================================================================

    /// Awaits a ledger call; a failure is classified and published.
    ///
    /// # Errors
    ///
    /// The classified failure.
    pub async fn call<T, Fut>(&self, label: &str, call: Fut) -> Result<T, ClassifiedError>
    where
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        call.await.map_err(|failure| {
            let classified = self
                .classifier
                .classify(failure, &[("call", label.to_string())]);
            tracing::error!(call = label, code = classified.code, "Ledger call failed");
            classified
        })
    }

    /// Awaits a ledger call whose failure degrades to a default.
    ///
    /// The failure is classified for diagnostics but not published, so it
    /// never blocks later operations.
    ///
    /// # Errors
    ///
    /// The classified failure.
    pub async fn call_silent<T, Fut>(&self, label: &str, call: Fut) -> Result<T, ClassifiedError>
    where
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        call.await.map_err(|failure| {
            self.classifier
                .classify_silent(failure, &[("call", label.to_string())])
        })
    }

    /// Like [`Self::call_silent`], substituting `T::default()` on failure.
    pub async fn call_or_default<T, Fut>(&self, label: &str, call: Fut) -> T
    where
        T: Default,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        self.call_silent(label, call).await.unwrap_or_default()
    }

    /// Runs `operation` under `policy` through this session's classifier.
    ///
    /// Failed attempts publish their error as they happen; once an attempt
    /// succeeds the session error is restored to what it was before the
    /// first attempt.
    ///
    /// # Errors
    ///
    /// See [`retry::retry`].
    pub async fn retry<T, F, Fut>(
        &self,
        policy: RetryPolicy,
        operation: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let previous = self.store.error();
        let value = retry::retry(&self.classifier, policy, operation).await?;
        if self.store.error() != previous {
            tracing::debug!("Retried call recovered, clearing transient error");
            self.store.set_error(previous);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::InMemoryStore;
    use alloy_primitives::B256;

    fn controller() -> (Arc<InMemoryStore>, OperationController) {
        let store = Arc::new(InMemoryStore::default());
        let controller = OperationController::new(store.clone(), Arc::new(FixedClock::at_unix(1_000)));
        (store, controller)
    }

    #[test]
    fn test_can_start_when_idle() {
        let (_, controller) = controller();
        assert!(controller.can_start(OperationType::LoadPools));
    }

    #[test]
    fn test_finished_operation_does_not_block() {
        let (store, controller) = controller();
        let mut operation = Operation::started(OperationType::ClaimPrize, controller.now());
        operation.status = OperationStatus::Completed;
        store.update_operation(Some(operation));

        assert!(controller.can_start(OperationType::LoadPools));
    }

    #[test]
    fn test_guard_conditions() {
        let (store, controller) = controller();

        controller.start(OperationType::LoadClaims, OperationUpdate::default());
        assert!(!controller.can_start(OperationType::LoadPools));
        controller.clear();
        assert!(controller.can_start(OperationType::LoadPools));

        store.set_loading(true);
        assert!(!controller.can_start(OperationType::LoadPools));
        store.set_loading(false);

        store.set_error(Some("pending".to_string()));
        assert!(!controller.can_start(OperationType::LoadPools));
        controller.clear_error();
        assert!(controller.can_start(OperationType::LoadPools));
        assert_eq!(store.status_message(), READY_STATUS);
    }

    #[test]
    fn test_start_publishes_pending_operation() {
        let (store, controller) = controller();
        controller.start(OperationType::ClaimPrize, OperationUpdate::progress("Claiming"));

        let op = store.operation().unwrap();
        assert_eq!(op.operation_type, Some(OperationType::ClaimPrize));
        assert_eq!(op.status, OperationStatus::Pending);
        assert!(op.is_active);
        assert!(op.is_write_operation);
        assert_eq!(op.progress, "Claiming");
        assert_eq!(op.start_time, FixedClock::at_unix(1_000).now());
    }

    #[test]
    fn test_try_begin_refuses_second_operation() {
        let (_, controller) = controller();
        controller.try_begin(OperationType::LoadLeaderboard).unwrap();
        assert_eq!(
            controller.try_begin(OperationType::LoadPools),
            Err(CoreError::OperationRefused(OperationType::LoadPools))
        );
    }

    #[test]
    fn test_complete_and_fail() {
        let (store, controller) = controller();

        controller.start(OperationType::ClaimPrize, OperationUpdate::default());
        controller.complete(OperationUpdate::hash(B256::repeat_byte(1)));
        let op = store.operation().unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(!op.is_active);
        assert!(op.operation_type.is_none());
        assert_eq!(op.progress, "Operation completed");
        assert_eq!(op.hash, Some(B256::repeat_byte(1)));

        controller.start(OperationType::LoadPools, OperationUpdate::default());
        controller.fail("boom");
        let op = store.operation().unwrap();
        assert_eq!(op.status, OperationStatus::Error);
        assert!(!op.is_active);
        assert_eq!(op.error.as_deref(), Some("boom"));
        assert_eq!(op.progress, "Operation failed");
    }

    #[test]
    fn test_update_status_without_operation_is_noop() {
        let (store, controller) = controller();
        controller.update_status(OperationStatus::Processing, OperationUpdate::default());
        assert!(store.operation().is_none());
    }

    #[tokio::test]
    async fn test_call_classifies_failure() {
        let (store, controller) = controller();
        let result: Result<u64, _> = controller
            .call("getCurrentEpoch", async { Err(LedgerError::Code(1701)) })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, 1701);
        assert_eq!(err.context["call"], "getCurrentEpoch");
        assert_eq!(store.error().as_deref(), Some("Invalid epoch"));
    }

    #[tokio::test]
    async fn test_call_or_default_stays_silent() {
        let (store, controller) = controller();
        let value: u64 = controller
            .call_or_default("getEpochScore", async { Err(LedgerError::Code(1201)) })
            .await;
        assert_eq!(value, 0);
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_run_refused_does_not_poll_body() {
        let (_, controller) = controller();
        controller.start(OperationType::LoadClaims, OperationUpdate::default());

        let polled = std::sync::atomic::AtomicBool::new(false);
        let result = controller
            .run(OperationType::LoadPools, "Loading pools data...", async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(((), OperationUpdate::default()))
            })
            .await;

        assert!(matches!(result, Err(CoreError::OperationRefused(_))));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_failure_fails_operation() {
        let (store, controller) = controller();
        let result: CoreResult<()> = controller
            .run(OperationType::LoadPools, "Loading pools data...", async {
                Err(CoreError::InvalidConfig("nope".to_string()))
            })
            .await;

        assert!(result.is_err());
        let op = store.operation().unwrap();
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.error.as_deref(), Some("invalid configuration: nope"));
    }
}
