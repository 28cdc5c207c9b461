//! Registration of organizations in API environments

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info};

use super::organization_service::api_organization;
use crate::clients::DpcApi;
use crate::config::DeployEnvironment;
use crate::errors::{PortalError, Result};
use crate::storage::backend::{addresses, organizations, registered_organizations};
use crate::storage::{
    ApiEnvironment, FhirEndpoint, FhirEndpointStatus, RegisteredOrganization, SeaOrmStorage,
};
use crate::utils::non_blank;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FhirEndpointParams {
    pub name: Option<String>,
    pub status: Option<String>,
    pub uri: Option<String>,
}

impl FhirEndpointParams {
    pub fn validate(&self) -> Result<FhirEndpoint> {
        let mut errors = Vec::new();

        let name = non_blank(self.name.as_deref());
        if name.is_none() {
            errors.push("Fhir endpoint name can't be blank");
        }

        let status = self
            .status
            .as_deref()
            .and_then(|s| s.trim().parse::<FhirEndpointStatus>().ok());
        if status.is_none() {
            errors.push("Fhir endpoint status is not included in the list");
        }

        let uri = non_blank(self.uri.as_deref());
        match uri.as_deref().map(url::Url::parse) {
            Some(Ok(parsed)) if matches!(parsed.scheme(), "http" | "https") => {}
            Some(_) => errors.push("Fhir endpoint uri is invalid"),
            None => errors.push("Fhir endpoint uri can't be blank"),
        }

        match (name, status, uri) {
            (Some(name), Some(status), Some(uri)) if errors.is_empty() => {
                Ok(FhirEndpoint { name, status, uri })
            }
            _ => Err(PortalError::validation(errors.join(", "))),
        }
    }
}

pub struct RegisteredOrganizationService {
    storage: Arc<SeaOrmStorage>,
    api: Arc<dyn DpcApi>,
    deploy: DeployEnvironment,
}

impl RegisteredOrganizationService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        api: Arc<dyn DpcApi>,
        deploy: DeployEnvironment,
    ) -> Self {
        Self {
            storage,
            api,
            deploy,
        }
    }

    /// Create the organization in the API and remember its remote id
    pub async fn register(
        &self,
        organization_id: i32,
        api_env: ApiEnvironment,
        endpoint: &FhirEndpointParams,
    ) -> Result<RegisteredOrganization> {
        let endpoint = endpoint.validate()?;
        let db = self.storage.get_db();

        let organization = organizations::get(db, organization_id).await?;
        if registered_organizations::find(db, organization_id, api_env)
            .await?
            .is_some()
        {
            return Err(PortalError::validation(format!(
                "Organization is already registered in {}",
                api_env
            )));
        }

        let address = addresses::find_for_organization(db, organization_id).await?;
        let payload = api_organization(&organization, address.as_ref(), &endpoint, self.deploy);
        let api_id = self.api.create_organization(api_env, &payload).await?;

        match registered_organizations::insert(db, organization_id, api_env, &api_id, &endpoint)
            .await
        {
            Ok(registered) => {
                info!(
                    "Organization {} registered in {} as {}",
                    organization_id, api_env, api_id
                );
                Ok(registered)
            }
            Err(e) => {
                // 本地保存失败时撤销远端创建
                error!(
                    "Saving registration of organization {} failed, removing {} from {}: {}",
                    organization_id, api_id, api_env, e
                );
                if let Err(cleanup) = self.api.delete_organization(api_env, &api_id).await {
                    error!("Removing {} from {} failed: {}", api_id, api_env, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Replace the FHIR endpoint; the API is told before the change is committed
    pub async fn update_endpoint(
        &self,
        organization_id: i32,
        api_env: ApiEnvironment,
        endpoint: &FhirEndpointParams,
    ) -> Result<RegisteredOrganization> {
        let endpoint = endpoint.validate()?;
        let txn = self.storage.begin().await?;

        let organization = organizations::get(&txn, organization_id).await?;
        let current = self.get(&txn, organization_id, api_env).await?;
        let updated = registered_organizations::update_endpoint(&txn, current.id, &endpoint).await?;

        let address = addresses::find_for_organization(&txn, organization_id).await?;
        let payload = api_organization(&organization, address.as_ref(), &endpoint, self.deploy);
        self.api
            .update_organization(api_env, &updated.api_id, &payload)
            .await?;

        txn.commit().await?;
        info!(
            "FHIR endpoint of organization {} in {} updated",
            organization_id, api_env
        );
        Ok(updated)
    }

    pub async fn unregister(&self, organization_id: i32, api_env: ApiEnvironment) -> Result<()> {
        let db = self.storage.get_db();
        let current = self.get(db, organization_id, api_env).await?;

        self.api
            .delete_organization(api_env, &current.api_id)
            .await?;
        registered_organizations::delete(db, current.id).await?;

        info!(
            "Organization {} unregistered from {}",
            organization_id, api_env
        );
        Ok(())
    }

    async fn get<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        organization_id: i32,
        api_env: ApiEnvironment,
    ) -> Result<RegisteredOrganization> {
        registered_organizations::find(db, organization_id, api_env)
            .await?
            .ok_or_else(|| {
                PortalError::not_found(format!(
                    "Organization {} is not registered in {}",
                    organization_id, api_env
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(name: &str, status: &str, uri: &str) -> FhirEndpointParams {
        FhirEndpointParams {
            name: Some(name.to_string()),
            status: Some(status.to_string()),
            uri: Some(uri.to_string()),
        }
    }

    #[test]
    fn test_valid_endpoint() {
        let endpoint = params("Acme FHIR", "test", "https://fhir.acme.example.com/r4")
            .validate()
            .unwrap();
        assert_eq!(endpoint.status, FhirEndpointStatus::Test);
    }

    #[test]
    fn test_invalid_endpoint_lists_every_problem() {
        let err = params(" ", "unknown", "ftp://fhir.example.com")
            .validate()
            .unwrap_err();
        let PortalError::Validation(message) = err else {
            panic!("expected validation error");
        };
        assert!(message.contains("Fhir endpoint name can't be blank"));
        assert!(message.contains("Fhir endpoint status is not included in the list"));
        assert!(message.contains("Fhir endpoint uri is invalid"));
    }

    #[test]
    fn test_missing_uri() {
        let err = FhirEndpointParams {
            name: Some("Acme".to_string()),
            status: Some("active".to_string()),
            uri: None,
        }
        .validate()
        .unwrap_err();
        assert!(
            matches!(err, PortalError::Validation(m) if m == "Fhir endpoint uri can't be blank")
        );
    }
}
