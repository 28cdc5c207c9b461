//! Organization management service
//!
//! Saves run as an explicit pipeline inside one transaction:
//! validate → assign sandbox id → persist (+ nested address) →
//! push the change to every registered organization. Any failure drops the
//! transaction, so nothing is written unless the whole pipeline succeeds.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::sandbox_id;
use crate::clients::{ApiOrganization, DpcApi};
use crate::config::DeployEnvironment;
use crate::errors::{PortalError, Result};
use crate::storage::backend::{
    addresses, assignments, organizations, organizations::OrganizationRow,
    registered_organizations, users,
};
use crate::storage::{
    Address, AddressType, AddressUse, FhirEndpoint, Organization, OrganizationKind,
    OrganizationProfile, OrganizationType, SeaOrmStorage, User,
};
use crate::utils::non_blank;

// ============ Request DTOs ============

/// Nested address fields as submitted; all blank means "no address"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressParams {
    pub street: Option<String>,
    pub street_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub address_type: Option<String>,
    pub address_use: Option<String>,
}

impl AddressParams {
    pub fn is_all_blank(&self) -> bool {
        [
            &self.street,
            &self.street_2,
            &self.city,
            &self.state,
            &self.zip,
            &self.address_type,
            &self.address_use,
        ]
        .iter()
        .all(|v| non_blank(v.as_deref()).is_none())
    }

    /// `Ok(None)` when all blank; otherwise every required field must be present
    fn to_address(&self, errors: &mut Vec<String>) -> Option<Address> {
        if self.is_all_blank() {
            return None;
        }

        let mut required = |value: &Option<String>, label: &str| {
            non_blank(value.as_deref()).unwrap_or_else(|| {
                errors.push(format!("Address {} can't be blank", label));
                String::new()
            })
        };
        let street = required(&self.street, "street");
        let city = required(&self.city, "city");
        let state = required(&self.state, "state");
        let zip = required(&self.zip, "zip");

        let address_type = parse_choice::<AddressType>(&self.address_type, "Address type", errors);
        let address_use = parse_choice::<AddressUse>(&self.address_use, "Address use", errors);

        Some(Address {
            street,
            street_2: non_blank(self.street_2.as_deref()),
            city,
            state,
            zip,
            address_type: address_type?,
            address_use: address_use?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationParams {
    pub name: String,
    pub organization_type: String,
    #[serde(default)]
    pub npi: Option<String>,
    #[serde(default)]
    pub address: AddressParams,
}

fn parse_choice<T: FromStr>(
    value: &Option<String>,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<T> {
    match value.as_deref().map(str::trim).map(T::from_str) {
        Some(Ok(parsed)) => Some(parsed),
        _ => {
            errors.push(format!("{} is not included in the list", label));
            None
        }
    }
}

/// Payload the API receives for an organization in one environment
pub(crate) fn api_organization(
    organization: &Organization,
    address: Option<&Address>,
    endpoint: &FhirEndpoint,
    deploy: DeployEnvironment,
) -> ApiOrganization {
    ApiOrganization {
        name: organization.name.clone(),
        identifier: organization
            .external_identifier(deploy)
            .map(str::to_string),
        address: address.cloned(),
        endpoint: endpoint.clone(),
    }
}

// ============ OrganizationService Implementation ============

pub struct OrganizationService {
    storage: Arc<SeaOrmStorage>,
    api: Arc<dyn DpcApi>,
    deploy: DeployEnvironment,
}

impl OrganizationService {
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

    pub fn deploy_environment(&self) -> DeployEnvironment {
        self.deploy
    }

    /// Collects every failed rule, then fails once with all messages
    async fn validate<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        params: &OrganizationParams,
        except_id: Option<i32>,
    ) -> Result<(OrganizationRow, Option<Address>)> {
        let mut errors = Vec::new();

        let name = params.name.trim().to_string();
        if name.is_empty() {
            errors.push("Name can't be blank".to_string());
        } else if organizations::name_taken(db, &name, except_id).await? {
            errors.push("Name has already been taken".to_string());
        }

        let organization_type = parse_choice::<OrganizationType>(
            &Some(params.organization_type.clone()),
            "Organization type",
            &mut errors,
        );

        let npi = non_blank(params.npi.as_deref());
        if let Some(npi) = &npi
            && organizations::npi_taken(db, npi, except_id).await?
        {
            errors.push("Npi has already been taken".to_string());
        }

        let address = params.address.to_address(&mut errors);

        match organization_type {
            Some(organization_type) if errors.is_empty() => Ok((
                OrganizationRow {
                    name,
                    organization_type,
                    npi,
                    sandbox_id: None,
                },
                address,
            )),
            _ => Err(PortalError::validation(errors.join(", "))),
        }
    }

    /// Keeps an existing sandbox id; generates one only in prod-sbx
    pub async fn assign_id<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        current: Option<String>,
    ) -> Result<Option<String>> {
        if current.is_some() || !self.deploy.is_prod_sbx() {
            return Ok(current);
        }
        let id = sandbox_id::generate_unique(|candidate| async move {
            organizations::sandbox_id_exists(db, &candidate).await
        })
        .await?;
        Ok(Some(id))
    }

    /// Push the organization to the API for every environment it is registered in.
    /// Nothing is sent while the NPI is blank. Returns the number of calls made.
    pub async fn update_registered_organizations<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        organization: &Organization,
    ) -> Result<usize> {
        if non_blank(organization.npi.as_deref()).is_none() {
            return Ok(0);
        }

        let registered =
            registered_organizations::list_for_organization(db, organization.id).await?;
        let address = addresses::find_for_organization(db, organization.id).await?;

        for reg in &registered {
            let payload =
                api_organization(organization, address.as_ref(), &reg.fhir_endpoint, self.deploy);
            self.api
                .update_organization(reg.api_env, &reg.api_id, &payload)
                .await
                .inspect_err(|e| {
                    warn!(
                        "Updating {} organization {} failed: {}",
                        reg.api_env, reg.api_id, e
                    )
                })?;
        }
        Ok(registered.len())
    }

    // ============ CRUD Operations ============

    pub async fn create(&self, params: OrganizationParams) -> Result<OrganizationProfile> {
        let txn = self.storage.begin().await?;

        let (mut row, address) = self.validate(&txn, &params, None).await?;
        row.sandbox_id = self.assign_id(&txn, None).await?;

        let organization = organizations::insert(&txn, &row).await?;
        if let Some(address) = &address {
            addresses::upsert(&txn, organization.id, address).await?;
        }

        txn.commit().await?;
        info!(
            "OrganizationService: created organization {} '{}'",
            organization.id, organization.name
        );

        Ok(OrganizationProfile {
            organization,
            address,
            registered_organizations: Vec::new(),
        })
    }

    pub async fn update(&self, id: i32, params: OrganizationParams) -> Result<OrganizationProfile> {
        let txn = self.storage.begin().await?;

        let existing = organizations::get(&txn, id).await?;
        let (mut row, address) = self.validate(&txn, &params, Some(id)).await?;
        row.sandbox_id = self.assign_id(&txn, existing.sandbox_id).await?;

        let organization = organizations::update(&txn, id, &row).await?;
        if let Some(address) = &address {
            addresses::upsert(&txn, id, address).await?;
        }

        let notified = self
            .update_registered_organizations(&txn, &organization)
            .await?;

        txn.commit().await?;
        info!(
            "OrganizationService: updated organization {} ({} registered organizations notified)",
            id, notified
        );

        self.profile(id).await
    }

    /// Removes the organization with its address, registrations and assignments
    pub async fn delete(&self, id: i32) -> Result<()> {
        let txn = self.storage.begin().await?;

        organizations::get(&txn, id).await?;
        addresses::delete_for_organization(&txn, id).await?;
        registered_organizations::delete_for_organization(&txn, id).await?;
        assignments::delete_for_organization(&txn, id).await?;
        organizations::delete(&txn, id).await?;

        txn.commit().await?;
        info!("OrganizationService: deleted organization {}", id);
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<Organization> {
        organizations::get(self.storage.get_db(), id).await
    }

    pub async fn list(&self, kind: Option<OrganizationKind>) -> Result<Vec<Organization>> {
        organizations::list(self.storage.get_db(), kind).await
    }

    pub async fn profile(&self, id: i32) -> Result<OrganizationProfile> {
        let db = self.storage.get_db();
        let organization = organizations::get(db, id).await?;
        Ok(OrganizationProfile {
            address: addresses::find_for_organization(db, id).await?,
            registered_organizations: registered_organizations::list_for_organization(db, id)
                .await?,
            organization,
        })
    }

    pub async fn profiles(&self, ids: &[i32]) -> Result<Vec<OrganizationProfile>> {
        let db = self.storage.get_db();
        let mut profiles = Vec::with_capacity(ids.len());
        for organization in organizations::find_many(db, ids).await? {
            let id = organization.id;
            profiles.push(OrganizationProfile {
                address: addresses::find_for_organization(db, id).await?,
                registered_organizations: registered_organizations::list_for_organization(db, id)
                    .await?,
                organization,
            });
        }
        Ok(profiles)
    }

    // ============ User Assignment ============

    pub async fn assign_user(&self, organization_id: i32, email: &str) -> Result<User> {
        let db = self.storage.get_db();
        organizations::get(db, organization_id).await?;

        let user = users::find_by_email(db, email)
            .await?
            .ok_or_else(|| {
                PortalError::validation(format!("No user found with email {}", email.trim()))
            })?;
        assignments::assign(db, organization_id, user.id).await?;

        info!(
            "OrganizationService: assigned user {} to organization {}",
            user.id, organization_id
        );
        Ok(user)
    }

    pub async fn unassign_user(&self, organization_id: i32, user_id: i32) -> Result<()> {
        if !assignments::unassign(self.storage.get_db(), organization_id, user_id).await? {
            return Err(PortalError::not_found(format!(
                "User {} is not assigned to organization {}",
                user_id, organization_id
            )));
        }
        info!(
            "OrganizationService: unassigned user {} from organization {}",
            user_id, organization_id
        );
        Ok(())
    }

    pub async fn assigned_users(&self, organization_id: i32) -> Result<Vec<User>> {
        let db = self.storage.get_db();
        let ids = assignments::user_ids_for_organization(db, organization_id).await?;
        users::find_many(db, &ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_blank_address_is_ignored() {
        let params = AddressParams {
            street: Some("  ".to_string()),
            city: Some(String::new()),
            ..Default::default()
        };
        assert!(params.is_all_blank());

        let mut errors = Vec::new();
        assert!(params.to_address(&mut errors).is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_partial_address_reports_missing_fields() {
        let params = AddressParams {
            street: Some("1 Main St".to_string()),
            address_type: Some("mailbox".to_string()),
            address_use: Some("work".to_string()),
            ..Default::default()
        };

        let mut errors = Vec::new();
        assert!(params.to_address(&mut errors).is_none());
        assert!(errors.contains(&"Address city can't be blank".to_string()));
        assert!(errors.contains(&"Address zip can't be blank".to_string()));
        assert!(errors.contains(&"Address type is not included in the list".to_string()));
        assert!(!errors.iter().any(|e| e.starts_with("Address use")));
    }

    #[test]
    fn test_complete_address() {
        let params = AddressParams {
            street: Some("1 Main St".to_string()),
            street_2: Some(" ".to_string()),
            city: Some("Baltimore".to_string()),
            state: Some("MD".to_string()),
            zip: Some("21224".to_string()),
            address_type: Some("both".to_string()),
            address_use: Some("work".to_string()),
        };

        let mut errors = Vec::new();
        let address = params.to_address(&mut errors).unwrap();
        assert!(errors.is_empty());
        assert_eq!(address.street_2, None);
        assert_eq!(address.address_type, AddressType::Both);
    }
}
