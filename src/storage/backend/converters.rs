use std::str::FromStr;

use crate::errors::{PortalError, Result};
use crate::storage::models::{
    Address, FhirEndpoint, InternalUser, Organization, RegisteredOrganization, User,
};
use migration::entities::{address, internal_user, organization, registered_organization, user};

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        PortalError::database_operation(format!("Unexpected {} in storage: '{}'", column, value))
    })
}

pub fn model_to_organization(model: organization::Model) -> Result<Organization> {
    Ok(Organization {
        id: model.id,
        name: model.name,
        organization_type: parse_column("organization_type", &model.organization_type)?,
        npi: model.npi,
        sandbox_id: model.sandbox_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub fn model_to_address(model: address::Model) -> Result<Address> {
    Ok(Address {
        street: model.street,
        street_2: model.street_2,
        city: model.city,
        state: model.state,
        zip: model.zip,
        address_type: parse_column("address_type", &model.address_type)?,
        address_use: parse_column("address_use", &model.address_use)?,
    })
}

pub fn model_to_registered_organization(
    model: registered_organization::Model,
) -> Result<RegisteredOrganization> {
    Ok(RegisteredOrganization {
        id: model.id,
        organization_id: model.organization_id,
        api_env: parse_column("api_env", &model.api_env)?,
        api_id: model.api_id,
        fhir_endpoint: FhirEndpoint {
            name: model.fhir_endpoint_name,
            status: parse_column("fhir_endpoint_status", &model.fhir_endpoint_status)?,
            uri: model.fhir_endpoint_uri,
        },
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub fn model_to_user(model: user::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
        password_hash: model.password_hash,
        created_at: model.created_at,
    }
}

pub fn model_to_internal_user(model: internal_user::Model) -> InternalUser {
    InternalUser {
        id: model.id,
        provider: model.provider,
        uid: model.uid,
        email: model.email,
        name: model.name,
        created_at: model.created_at,
        last_sign_in_at: model.last_sign_in_at,
    }
}

/// 将 Address 转换为 ActiveModel（id 由调用方决定是否设置）
pub fn address_to_active_model(organization_id: i32, address: &Address) -> address::ActiveModel {
    use sea_orm::ActiveValue::*;

    address::ActiveModel {
        id: NotSet,
        organization_id: Set(organization_id),
        street: Set(address.street.clone()),
        street_2: Set(address.street_2.clone()),
        city: Set(address.city.clone()),
        state: Set(address.state.clone()),
        zip: Set(address.zip.clone()),
        address_type: Set(address.address_type.to_string()),
        address_use: Set(address.address_use.to_string()),
    }
}
