//! Integration tests for the session lifecycle: guard, store notifications,
//! classification and retry.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, U256};
use chainbrawler_core::codes;
use chainbrawler_core::{
    ChainBrawlerClient, CoreConfig, CoreError, ErrorCategory, ErrorClassifier, FixedClock,
    InMemoryLedger, InMemoryStore, LedgerError, LedgerMethod, SessionStore, StoreEvent,
};
use chainbrawler_shared::{OperationStatus, OperationType, OperationUpdate, UNKNOWN_ERROR_CODE};

fn session(config: CoreConfig) -> (Arc<InMemoryLedger>, Arc<InMemoryStore>, ChainBrawlerClient) {
    let ledger = Arc::new(InMemoryLedger::new());
    let store = Arc::new(InMemoryStore::new(64));
    let client = ChainBrawlerClient::with_store(
        ledger.clone(),
        store.clone(),
        Arc::new(FixedClock::at_unix(5_000)),
        config,
    )
    .unwrap();
    (ledger, store, client)
}

fn drain(events: &crossbeam_channel::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    events.try_iter().collect()
}

#[test]
fn test_code_table_properties() {
    assert_eq!(codes::message(1201), "Character does not exist");
    assert_eq!(codes::message(4242), "Unknown error: 4242");
    assert_eq!(codes::extract_code(&LedgerError::nested(1503, "reverted")), Some(1503));
    assert_eq!(
        codes::extract_code(&LedgerError::message("Execution reverted, Error Code: 1718")),
        Some(1718)
    );
    assert_eq!(codes::extract_code(&LedgerError::message("")), None);
    assert!(codes::is_retryable(1704));
    assert!(!codes::is_retryable(1201));
    assert!(!codes::is_retryable(UNKNOWN_ERROR_CODE));
    assert_eq!(codes::categorize(UNKNOWN_ERROR_CODE), ErrorCategory::Unknown);
    assert_eq!(codes::categorize(2105), ErrorCategory::Contract);
}

#[tokio::test]
async fn test_load_emits_lifecycle_events() {
    let (_, store, client) = session(CoreConfig::default());
    let events = store.subscribe();

    client.pools().load_pools().await.unwrap();

    assert_eq!(
        drain(&events),
        vec![
            StoreEvent::OperationChanged(Some(OperationStatus::Pending)),
            StoreEvent::StatusMessage("Loading pools data...".to_string()),
            StoreEvent::OperationChanged(Some(OperationStatus::Processing)),
            StoreEvent::PoolsPublished,
            StoreEvent::OperationChanged(Some(OperationStatus::Completed)),
            StoreEvent::StatusMessage("Pools data loaded successfully".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failure_events_and_recovery() {
    let (ledger, store, client) = session(CoreConfig::default());
    ledger.fail_next(LedgerMethod::CurrentEpoch, LedgerError::Code(1701));
    let events = store.subscribe();

    let err = client
        .leaderboard()
        .load_leaderboard(Address::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(1701));

    let seen = drain(&events);
    assert!(seen.contains(&StoreEvent::ErrorChanged(Some("Invalid epoch".to_string()))));
    assert!(seen.contains(&StoreEvent::StatusMessage("Error: Invalid epoch".to_string())));
    assert_eq!(
        seen.last(),
        Some(&StoreEvent::OperationChanged(Some(OperationStatus::Error)))
    );

    // The pending error blocks every engine until acknowledged.
    assert!(matches!(
        client.pools().load_pools().await,
        Err(CoreError::OperationRefused(OperationType::LoadPools))
    ));
    client.clear_error();
    assert_eq!(store.status_message(), "Ready for action");
    assert!(client.pools().load_pools().await.is_ok());
}

#[tokio::test]
async fn test_loading_flag_blocks_operations() {
    let (ledger, store, client) = session(CoreConfig::default());
    store.set_loading(true);

    assert!(client.claims().load_claims(Address::ZERO).await.is_err());
    assert_eq!(ledger.calls(LedgerMethod::CurrentEpoch), 0);

    store.set_loading(false);
    assert!(client.claims().load_claims(Address::ZERO).await.is_ok());
}

#[tokio::test]
async fn test_start_while_active_is_refused() {
    let (_, store, client) = session(CoreConfig::default());
    client
        .controller()
        .start(OperationType::FightEnemy, OperationUpdate::progress("Fighting"));

    assert!(client.claims().load_claims(Address::ZERO).await.is_err());
    let op = store.operation().unwrap();
    assert_eq!(op.operation_type, Some(OperationType::FightEnemy));
    assert!(op.is_write_operation);

    client.controller().complete(OperationUpdate::default());
    client.controller().clear();
    assert!(store.operation().is_none());
    assert!(client.claims().load_claims(Address::ZERO).await.is_ok());
}

#[tokio::test]
async fn test_retry_law_transient() {
    let config = CoreConfig::from_toml_str("[retry]\nmax_attempts = 3\nbase_delay_ms = 100\n").unwrap();
    let (_, store, client) = session(config);
    let calls = AtomicU32::new(0);

    let started = Instant::now();
    let value = client
        .retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LedgerError::Code(1704))
                } else {
                    Ok(U256::from(7))
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, U256::from(7));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(store.error().is_none());
    assert!(client.controller().can_start(OperationType::LoadPools));
}

#[tokio::test]
async fn test_retry_law_permanent() {
    let (_, store, client) = session(CoreConfig::default());
    let calls = AtomicU32::new(0);

    let started = Instant::now();
    let err = client
        .retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(LedgerError::Code(1201)) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.category, ErrorCategory::Character);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(store.error().as_deref(), Some("Character does not exist"));
}

#[test]
fn test_classifier_context_is_kept() {
    let classified = ErrorClassifier::build(
        Some(LedgerError::Rpc {
            code: Some(1206),
            message: "reverted".to_string(),
            inner: None,
        }),
        &[("operation", "createCharacter".to_string())],
    );
    assert_eq!(classified.code, 1206);
    assert_eq!(classified.to_string(), "Character already exists");
    assert_eq!(classified.context.get("operation").map(String::as_str), Some("createCharacter"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let ledger = Arc::new(InMemoryLedger::new());
    let mut config = CoreConfig::default();
    config.leaderboard.cohort_batch_size = 0;
    assert!(matches!(
        ChainBrawlerClient::new(ledger, config),
        Err(CoreError::InvalidConfig(_))
    ));
}
