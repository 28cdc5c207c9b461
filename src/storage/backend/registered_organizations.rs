use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};

use super::converters::model_to_registered_organization;
use super::unique_violation;
use crate::errors::{PortalError, Result};
use crate::storage::models::{ApiEnvironment, FhirEndpoint, RegisteredOrganization};
use migration::entities::registered_organization;

pub async fn list_for_organization<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
) -> Result<Vec<RegisteredOrganization>> {
    registered_organization::Entity::find()
        .filter(registered_organization::Column::OrganizationId.eq(organization_id))
        .order_by_asc(registered_organization::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(model_to_registered_organization)
        .collect()
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    api_env: ApiEnvironment,
) -> Result<Option<RegisteredOrganization>> {
    registered_organization::Entity::find()
        .filter(registered_organization::Column::OrganizationId.eq(organization_id))
        .filter(registered_organization::Column::ApiEnv.eq(api_env.to_string()))
        .one(db)
        .await?
        .map(model_to_registered_organization)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    api_env: ApiEnvironment,
    api_id: &str,
    endpoint: &FhirEndpoint,
) -> Result<RegisteredOrganization> {
    use sea_orm::ActiveValue::*;

    let now = Utc::now();
    let model = registered_organization::ActiveModel {
        id: NotSet,
        organization_id: Set(organization_id),
        api_env: Set(api_env.to_string()),
        api_id: Set(api_id.to_string()),
        fhir_endpoint_name: Set(endpoint.name.clone()),
        fhir_endpoint_status: Set(endpoint.status.to_string()),
        fhir_endpoint_uri: Set(endpoint.uri.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(|e| {
        unique_violation(e, &format!("Organization is already registered in {}", api_env))
    })?;

    model_to_registered_organization(model)
}

pub async fn update_endpoint<C: ConnectionTrait>(
    db: &C,
    id: i32,
    endpoint: &FhirEndpoint,
) -> Result<RegisteredOrganization> {
    use sea_orm::ActiveValue::*;

    let model = registered_organization::ActiveModel {
        id: Unchanged(id),
        fhir_endpoint_name: Set(endpoint.name.clone()),
        fhir_endpoint_status: Set(endpoint.status.to_string()),
        fhir_endpoint_uri: Set(endpoint.uri.clone()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(|e| match e {
        sea_orm::DbErr::RecordNotUpdated => {
            PortalError::not_found(format!("Registered organization {} not found", id))
        }
        other => other.into(),
    })?;

    model_to_registered_organization(model)
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    registered_organization::Entity::delete_by_id(id)
        .exec(db)
        .await?;
    Ok(())
}

pub async fn delete_for_organization<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
) -> Result<()> {
    registered_organization::Entity::delete_many()
        .filter(registered_organization::Column::OrganizationId.eq(organization_id))
        .exec(db)
        .await?;
    Ok(())
}
