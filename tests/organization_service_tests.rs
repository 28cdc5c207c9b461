//! Organization service integration tests
//!
//! Sandbox ids, registered-organization fan-out and transactional saves
//! against a real SQLite database.

mod common;

use std::sync::atomic::Ordering;

use common::{ApiCall, PortalOptions, TestPortal, endpoint_params, organization_params};
use dpc_portal::config::DeployEnvironment;
use dpc_portal::errors::PortalError;
use dpc_portal::services::sandbox_id::is_valid_sandbox_id;
use dpc_portal::storage::{ApiEnvironment, OrganizationKind};

async fn prod_sbx_portal() -> TestPortal {
    TestPortal::with_options(PortalOptions {
        deploy: DeployEnvironment::ProdSbx,
        ..Default::default()
    })
    .await
}

// =============================================================================
// Sandbox ids
// =============================================================================

#[tokio::test]
async fn test_prod_sbx_assigns_unique_sandbox_ids() {
    let portal = prod_sbx_portal().await;

    let mut seen = std::collections::HashSet::new();
    for i in 0..5 {
        let profile = portal
            .create_organization(&format!("Clinic {}", i), None)
            .await;
        let sandbox_id = profile.organization.sandbox_id.expect("sandbox id assigned");
        assert!(is_valid_sandbox_id(&sandbox_id), "invalid id {}", sandbox_id);
        assert!(seen.insert(sandbox_id));
    }
}

#[tokio::test]
async fn test_sandbox_id_survives_update() {
    let portal = prod_sbx_portal().await;
    let created = portal.create_organization("Reef Clinic", None).await;
    let original = created.organization.sandbox_id.clone();

    let updated = portal
        .context
        .organization_service
        .update(
            created.organization.id,
            organization_params("Reef Clinic East", None),
        )
        .await
        .unwrap();

    assert_eq!(updated.organization.name, "Reef Clinic East");
    assert_eq!(updated.organization.sandbox_id, original);
}

#[tokio::test]
async fn test_no_sandbox_id_outside_prod_sbx() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;
    assert!(profile.organization.sandbox_id.is_none());
}

#[tokio::test]
async fn test_prod_sbx_sends_sandbox_id_as_identifier() {
    let portal = prod_sbx_portal().await;
    let profile = portal
        .create_organization("Reef Clinic", Some("1234567893"))
        .await;
    portal
        .register(profile.organization.id, ApiEnvironment::Sandbox)
        .await;

    let sent = portal.api.calls().into_iter().find_map(|c| match c {
        ApiCall::CreateOrganization { identifier, .. } => identifier,
        _ => None,
    });
    assert_eq!(sent, profile.organization.sandbox_id);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let portal = TestPortal::new().await;
    portal.create_organization("Reef Clinic", None).await;

    let err = portal
        .context
        .organization_service
        .create(organization_params("Reef Clinic", None))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(m) if m.contains("Name has already been taken")));
}

#[tokio::test]
async fn test_every_rule_is_reported() {
    let portal = TestPortal::new().await;
    let mut params = organization_params(" ", None);
    params.organization_type = "spaceship".to_string();

    let err = portal
        .context
        .organization_service
        .create(params)
        .await
        .unwrap_err();
    let PortalError::Validation(message) = err else {
        panic!("expected validation error");
    };
    assert!(message.contains("Name can't be blank"));
    assert!(message.contains("Organization type is not included in the list"));
}

#[tokio::test]
async fn test_list_by_kind() {
    let portal = TestPortal::new().await;
    portal.create_organization("Reef Clinic", None).await;
    let mut vendor = organization_params("Anemone Health IT", None);
    vendor.organization_type = "health_it_vendor".to_string();
    portal
        .context
        .organization_service
        .create(vendor)
        .await
        .unwrap();

    let service = &portal.context.organization_service;
    assert_eq!(service.list(None).await.unwrap().len(), 2);

    let vendors = service.list(Some(OrganizationKind::Vendor)).await.unwrap();
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0].name, "Anemone Health IT");
}

// =============================================================================
// Registered organization fan-out
// =============================================================================

#[tokio::test]
async fn test_update_with_npi_notifies_every_registration() {
    let portal = TestPortal::new().await;
    let profile = portal
        .create_organization("Reef Clinic", Some("1234567893"))
        .await;
    let id = profile.organization.id;
    portal.register(id, ApiEnvironment::Sandbox).await;
    portal.register(id, ApiEnvironment::Production).await;
    portal.api.clear();

    portal
        .context
        .organization_service
        .update(id, organization_params("Reef Clinic", Some("1234567893")))
        .await
        .unwrap();

    let updates = portal.api.update_calls();
    assert_eq!(updates.len(), 2);
    let envs: Vec<ApiEnvironment> = updates
        .iter()
        .map(|c| match c {
            ApiCall::UpdateOrganization { env, .. } => *env,
            _ => unreachable!(),
        })
        .collect();
    assert!(envs.contains(&ApiEnvironment::Sandbox));
    assert!(envs.contains(&ApiEnvironment::Production));
}

#[tokio::test]
async fn test_update_without_npi_skips_api() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;
    let id = profile.organization.id;
    portal.register(id, ApiEnvironment::Sandbox).await;
    portal.api.clear();

    portal
        .context
        .organization_service
        .update(id, organization_params("Reef Clinic North", Some("  ")))
        .await
        .unwrap();

    assert!(portal.api.update_calls().is_empty());
}

#[tokio::test]
async fn test_failed_fan_out_rolls_back_update() {
    let portal = TestPortal::new().await;
    let profile = portal
        .create_organization("Reef Clinic", Some("1234567893"))
        .await;
    let id = profile.organization.id;
    portal.register(id, ApiEnvironment::Sandbox).await;
    portal.api.fail_updates.store(true, Ordering::SeqCst);

    let err = portal
        .context
        .organization_service
        .update(id, organization_params("Renamed Clinic", Some("1234567893")))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::ExternalService(_)));

    let stored = portal.context.organization_service.get(id).await.unwrap();
    assert_eq!(stored.name, "Reef Clinic");
}

// =============================================================================
// Registration lifecycle
// =============================================================================

#[tokio::test]
async fn test_register_twice_in_same_environment_fails() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;
    let id = profile.organization.id;
    portal.register(id, ApiEnvironment::Sandbox).await;

    let err = portal
        .context
        .registered_organization_service
        .register(id, ApiEnvironment::Sandbox, &endpoint_params())
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
}

#[tokio::test]
async fn test_unregister_deletes_remote_and_local() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;
    let id = profile.organization.id;
    let registered = portal.register(id, ApiEnvironment::Sandbox).await;

    portal
        .context
        .registered_organization_service
        .unregister(id, ApiEnvironment::Sandbox)
        .await
        .unwrap();

    assert!(portal.api.calls().contains(&ApiCall::DeleteOrganization {
        env: ApiEnvironment::Sandbox,
        api_id: registered.api_id,
    }));
    let profile = portal.context.organization_service.profile(id).await.unwrap();
    assert!(!profile.api_credentialable());
}

#[tokio::test]
async fn test_delete_organization_is_local_only() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;
    let id = profile.organization.id;
    portal.register(id, ApiEnvironment::Sandbox).await;
    portal.api.clear();

    portal.context.organization_service.delete(id).await.unwrap();

    assert!(portal.api.calls().is_empty());
    let err = portal.context.organization_service.get(id).await.unwrap_err();
    assert!(matches!(err, PortalError::NotFound(_)));
}

// =============================================================================
// User assignment
// =============================================================================

#[tokio::test]
async fn test_assign_and_unassign_user() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;
    let id = profile.organization.id;
    let user = portal.create_user("marlin@example.com").await;

    portal.assign(id, "MARLIN@example.com").await;
    let assigned = portal.context.organization_service.assigned_users(id).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, user.id);

    portal
        .context
        .organization_service
        .unassign_user(id, user.id)
        .await
        .unwrap();
    assert!(
        portal
            .context
            .organization_service
            .assigned_users(id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_assign_unknown_email() {
    let portal = TestPortal::new().await;
    let profile = portal.create_organization("Reef Clinic", None).await;

    let err = portal
        .context
        .organization_service
        .assign_user(profile.organization.id, "nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
}
