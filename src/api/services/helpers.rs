//! Handler 公共工具

use serde_json::{Value, json};

use crate::api::middleware::SessionSubject;
use crate::api::views::display_timestamp;
use crate::errors::{PortalError, Result};
use crate::services::{EnvironmentTokens, InternalAuthService, UserService};
use crate::storage::{ApiEnvironment, InternalUser, OrganizationProfile, User};

pub fn environment_label(env: ApiEnvironment) -> &'static str {
    match env {
        ApiEnvironment::Sandbox => "Sandbox",
        ApiEnvironment::Production => "Production",
    }
}

/// User behind a guarded request; a deleted account counts as signed out
pub async fn signed_in_user(users: &UserService, subject: &SessionSubject) -> Result<User> {
    users
        .find(subject.id)
        .await?
        .ok_or_else(|| PortalError::unauthorized("Please sign in to continue"))
}

pub async fn signed_in_internal_user(
    auth: &InternalAuthService,
    subject: &SessionSubject,
) -> Result<InternalUser> {
    auth.find_user(subject.id)
        .await?
        .ok_or_else(|| PortalError::unauthorized("Please sign in to continue"))
}

/// Organization summary used by the dashboard and internal pages
pub fn organization_summary(profile: &OrganizationProfile) -> Value {
    let organization = &profile.organization;
    json!({
        "id": organization.id,
        "name": organization.name,
        "organization_type": organization.organization_type.as_ref(),
        "type_label": organization.organization_type.label(),
        "kind": organization.kind().as_ref(),
        "npi": organization.npi,
        "sandbox_id": organization.sandbox_id,
        "api_credentialable": profile.api_credentialable(),
        "sandbox_enabled": profile.sandbox_enabled(),
        "production_enabled": profile.production_enabled(),
        "registered_api_envs": profile
            .registered_api_envs()
            .into_iter()
            .map(environment_label)
            .collect::<Vec<_>>(),
    })
}

/// Token metadata per environment; raw token values are never part of this
pub fn token_listing(environments: &[EnvironmentTokens]) -> Value {
    environments
        .iter()
        .map(|env| {
            json!({
                "api_environment": env.registered_organization.api_env.as_ref(),
                "environment_label": environment_label(env.registered_organization.api_env),
                "tokens": env
                    .tokens
                    .iter()
                    .map(|token| json!({
                        "label": token.label,
                        "created_on": display_timestamp(&token.created_at),
                    }))
                    .collect::<Vec<_>>(),
                "error": env.error,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ClientTokenMetadata;
    use crate::storage::{FhirEndpoint, FhirEndpointStatus, RegisteredOrganization};
    use chrono::Utc;

    #[test]
    fn test_token_listing_has_no_raw_value() {
        let registered = RegisteredOrganization {
            id: 1,
            organization_id: 1,
            api_env: ApiEnvironment::Sandbox,
            api_id: "b7b6f5b0".to_string(),
            fhir_endpoint: FhirEndpoint {
                name: "Test".to_string(),
                status: FhirEndpointStatus::Test,
                uri: "https://fhir.example.com".to_string(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let listing = token_listing(&[EnvironmentTokens {
            registered_organization: registered,
            tokens: vec![ClientTokenMetadata {
                id: "t-1".to_string(),
                token_type: Some("MACAROON".to_string()),
                label: "Sandbox Token 1".to_string(),
                created_at: "2019-11-07T17:15:22.781Z".to_string(),
                expires_at: None,
            }],
            error: None,
        }]);

        assert_eq!(listing[0]["environment_label"], "Sandbox");
        assert_eq!(listing[0]["tokens"][0]["label"], "Sandbox Token 1");
        assert_eq!(listing[0]["tokens"][0]["created_on"], "11/07/2019 at 5:15PM UTC");
        assert!(listing[0]["tokens"][0].get("token").is_none());
        assert!(listing[0]["error"].is_null());
    }
}
