//! Contract Test: Session Lifecycle
//!
//! Constraints verified:
//! - Every attempt gets a fresh integration instance
//! - release() tears the session down exactly once
//! - An attempt dropped without release still gets cleaned up
//! - A released attempt refuses further calls

mod common;

use common::*;
use relocate_core::error::Error;
use relocate_core::registry::ServiceRegistry;
use std::time::Duration;

fn registry() -> (ServiceRegistry, CallCounters) {
    let registry = ServiceRegistry::new();
    let counters = CallCounters::new();
    registry
        .register_service(mock_factory("p1", MockBehavior::default(), &counters))
        .unwrap();
    (registry, counters)
}

#[tokio::test]
async fn release_is_idempotent() {
    let (registry, counters) = registry();

    let mut attempt = registry
        .initialize_service("p1", &credentials())
        .await
        .expect("initialize succeeds");
    assert!(attempt.validate_credentials().await.unwrap());

    attempt.release().await;
    attempt.release().await;
    drop(attempt);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(counters.cleanup(), 1);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn released_attempt_refuses_calls() {
    let (registry, _counters) = registry();

    let mut attempt = registry.initialize_service("p1", &credentials()).await.unwrap();
    attempt.release().await;

    assert!(attempt.is_released());
    let result = attempt
        .update_address(&old_address(), &new_address())
        .await;
    assert!(matches!(result, Err(Error::Infrastructure(_))));
}

#[tokio::test]
async fn dropped_attempt_is_cleaned_up() {
    let (registry, counters) = registry();

    {
        let mut attempt = registry.initialize_service("p1", &credentials()).await.unwrap();
        let _ = attempt.validate_credentials().await;
        // Early return without release
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(counters.released(), 1, "drop guard must schedule cleanup");
}

#[tokio::test]
async fn each_attempt_gets_its_own_instance() {
    let (registry, counters) = registry();
    let baseline = counters.created();

    let mut first = registry.initialize_service("p1", &credentials()).await.unwrap();
    let mut second = registry.initialize_service("p1", &credentials()).await.unwrap();

    assert_eq!(counters.created() - baseline, 2);

    // Releasing one leaves the other usable
    first.release().await;
    assert!(second.validate_credentials().await.unwrap());
    second.release().await;

    assert_eq!(counters.released(), 2);
}
