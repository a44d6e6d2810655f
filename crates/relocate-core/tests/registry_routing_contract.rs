//! Contract Test: Registry Routing
//!
//! Constraints verified:
//! - Unknown ids fail with ServiceNotFound before anything is created
//! - Missing credentials fail with Validation before any session exists
//! - Full-cycle operations release the session on every exit path
//! - Registered integrations are isolated from each other's failures

mod common;

use common::*;
use relocate_core::error::Error;
use relocate_core::forms::FormData;
use relocate_core::model::{Address, ServiceCredentials};
use relocate_core::registry::ServiceRegistry;
use relocate_core::traits::IntegrationType;

fn registry_with(id: &'static str, behavior: MockBehavior) -> (ServiceRegistry, CallCounters) {
    let registry = ServiceRegistry::new();
    let counters = CallCounters::new();
    registry
        .register_service(mock_factory(id, behavior, &counters))
        .expect("mock registers");
    (registry, counters)
}

#[tokio::test]
async fn unknown_service_is_rejected_without_side_effects() {
    let (registry, counters) = registry_with("p1", MockBehavior::default());
    let created_at_registration = counters.created();

    let result = registry
        .update_address(
            "not-a-real-provider",
            &credentials(),
            &old_address(),
            &new_address(),
        )
        .await;

    assert!(
        matches!(&result, Err(Error::ServiceNotFound(id)) if id == "not-a-real-provider"),
        "expected ServiceNotFound, got {:?}",
        result
    );
    assert_eq!(counters.created(), created_at_registration);
    assert_eq!(counters.initialize(), 0);

    // The registered provider still works
    let ok = registry
        .update_address("p1", &credentials(), &old_address(), &new_address())
        .await
        .expect("p1 update succeeds");
    assert!(ok.success);
}

#[tokio::test]
async fn missing_credentials_fail_before_any_session() {
    let (registry, counters) = registry_with("p1", MockBehavior::default());
    let created_at_registration = counters.created();
    let partial = ServiceCredentials::new().with("username", "jane@example.com");

    let err = registry
        .initialize_service("p1", &partial)
        .await
        .expect_err("password is missing");

    match err {
        Error::Validation { service, missing } => {
            assert_eq!(service, "p1");
            assert_eq!(missing, vec!["password".to_string()]);
        }
        other => panic!("expected Validation, got {:?}", other),
    }
    assert_eq!(counters.created(), created_at_registration);
    assert_eq!(counters.initialize(), 0);
}

#[tokio::test]
async fn empty_credential_values_count_as_missing() {
    let (registry, _counters) = registry_with("p1", MockBehavior::default());
    let blank = credentials().with("password", "");

    let result = registry.validate_service_credentials("p1", &blank).await;

    assert!(matches!(result, Err(Error::Validation { .. })));
}

#[tokio::test]
async fn full_cycle_update_releases_session_once() {
    let (registry, counters) = registry_with("p1", MockBehavior::default());

    let result = registry
        .update_address("p1", &credentials(), &old_address(), &new_address())
        .await
        .expect("update succeeds");

    assert!(result.success);
    assert_eq!(result.reference.as_deref(), Some("p1-ref"));
    assert_eq!(counters.validate(), 1);
    assert_eq!(counters.update(), 1);
    assert_eq!(counters.cleanup(), 1);
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn rejected_credentials_surface_as_authentication_error() {
    let behavior = MockBehavior {
        valid_credentials: false,
        ..MockBehavior::default()
    };
    let (registry, counters) = registry_with("p1", behavior);

    let result = registry
        .update_address("p1", &credentials(), &old_address(), &new_address())
        .await;

    assert!(matches!(result, Err(Error::Authentication(_))));
    assert_eq!(counters.update(), 0, "update must not run after a failed login");
    assert_eq!(counters.released(), 1);

    // validate_service_credentials reports the same thing as data
    let valid = registry
        .validate_service_credentials("p1", &credentials())
        .await
        .expect("validation call succeeds");
    assert!(!valid);
    assert_eq!(counters.released(), 2);
}

#[tokio::test]
async fn provider_rejection_is_a_result_not_an_error() {
    let (registry, counters) = registry_with("p1", MockBehavior::updating(UpdateBehavior::Reject));

    let result = registry
        .update_address("p1", &credentials(), &old_address(), &new_address())
        .await
        .expect("rejection is data");

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("unsupported postcode"));
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn infrastructure_failure_still_releases_session() {
    let (registry, counters) = registry_with(
        "p1",
        MockBehavior::updating(UpdateBehavior::Infrastructure),
    );

    let result = registry
        .update_address("p1", &credentials(), &old_address(), &new_address())
        .await;

    assert!(matches!(result, Err(Error::Infrastructure(_))));
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn failed_initialize_is_cleaned_up() {
    let behavior = MockBehavior {
        fail_initialize: true,
        ..MockBehavior::default()
    };
    let (registry, counters) = registry_with("p1", behavior);

    let result = registry.initialize_service("p1", &credentials()).await;

    assert!(matches!(result, Err(Error::Initialization(_))));
    assert_eq!(counters.cleanup(), 1, "cleanup runs after a failed initialize");
    assert_eq!(counters.released(), 0, "nothing was acquired");
}

#[tokio::test]
async fn invalid_new_address_is_rejected_before_initialize() {
    let (registry, counters) = registry_with("p1", MockBehavior::default());
    let blank_postcode = Address::new("22 New Road", "Leeds", " ");

    let result = registry
        .update_address("p1", &credentials(), &old_address(), &blank_postcode)
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(counters.initialize(), 0);
}

#[tokio::test]
async fn verification_requires_form_capability() {
    let (registry, counters) = registry_with("p1", MockBehavior::default());
    let mut data = FormData::new();
    data.insert("confirmed".into(), "true".into());

    let result = registry
        .confirm_verification("p1", &credentials(), &data)
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(counters.released(), 1);
}

#[tokio::test]
async fn status_checks_route_to_fresh_instances() {
    let (registry, counters) = registry_with(
        "p1",
        MockBehavior::default().with_status_script([StatusAnswer::Pending, StatusAnswer::Completed]),
    );
    let before = counters.created();

    let first = registry
        .check_update_status("p1", &credentials(), "p1-ref")
        .await
        .unwrap();
    let second = registry
        .check_update_status("p1", &credentials(), "p1-ref")
        .await
        .unwrap();

    assert!(first.pending);
    assert!(second.success && !second.pending);
    assert_eq!(counters.created() - before, 2);
    assert_eq!(counters.released(), 2);
}

#[test]
fn listing_is_sorted_and_describes_each_service() {
    let registry = ServiceRegistry::new();
    let counters = CallCounters::new();
    registry
        .register_service(mock_factory("zeta", MockBehavior::default(), &counters))
        .unwrap();
    registry
        .register_service(mock_factory("alpha", MockBehavior::default(), &counters))
        .unwrap();

    assert_eq!(registry.list_services(), vec!["alpha", "zeta"]);
    assert!(registry.has_service("zeta"));
    assert!(!registry.has_service("beta"));

    let listing = registry.get_available_services();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].id, "alpha");
    assert_eq!(listing[0].integration_type, IntegrationType::Api);
    assert_eq!(
        registry.get_required_credentials("zeta").unwrap(),
        vec!["username", "password"]
    );
}
