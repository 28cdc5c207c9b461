//! Organization queries

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

use super::converters::model_to_organization;
use super::unique_violation;
use crate::errors::{PortalError, Result};
use crate::storage::models::{Organization, OrganizationKind, OrganizationType};
use migration::entities::organization;

/// Column values written on insert/update
#[derive(Debug, Clone)]
pub struct OrganizationRow {
    pub name: String,
    pub organization_type: OrganizationType,
    pub npi: Option<String>,
    pub sandbox_id: Option<String>,
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Organization>> {
    organization::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(model_to_organization)
        .transpose()
}

pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<Organization> {
    find(db, id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Organization {} not found", id)))
}

pub async fn find_many<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<Vec<Organization>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    organization::Entity::find()
        .filter(organization::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(organization::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(model_to_organization)
        .collect()
}

/// 按名称排序；`kind` 对应 vendor / provider 范围
pub async fn list<C: ConnectionTrait>(
    db: &C,
    kind: Option<OrganizationKind>,
) -> Result<Vec<Organization>> {
    let vendor = OrganizationType::HealthItVendor.to_string();
    let mut query = organization::Entity::find();
    query = match kind {
        Some(OrganizationKind::Vendor) => {
            query.filter(organization::Column::OrganizationType.eq(vendor))
        }
        Some(OrganizationKind::Provider) => {
            query.filter(organization::Column::OrganizationType.ne(vendor))
        }
        None => query,
    };

    query
        .order_by_asc(organization::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(model_to_organization)
        .collect()
}

async fn column_taken<C: ConnectionTrait>(
    db: &C,
    column: organization::Column,
    value: &str,
    except_id: Option<i32>,
) -> Result<bool> {
    let mut query = organization::Entity::find().filter(column.eq(value));
    if let Some(id) = except_id {
        query = query.filter(organization::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

pub async fn name_taken<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except_id: Option<i32>,
) -> Result<bool> {
    column_taken(db, organization::Column::Name, name, except_id).await
}

pub async fn npi_taken<C: ConnectionTrait>(
    db: &C,
    npi: &str,
    except_id: Option<i32>,
) -> Result<bool> {
    column_taken(db, organization::Column::Npi, npi, except_id).await
}

pub async fn sandbox_id_exists<C: ConnectionTrait>(db: &C, sandbox_id: &str) -> Result<bool> {
    column_taken(db, organization::Column::SandboxId, sandbox_id, None).await
}

pub async fn insert<C: ConnectionTrait>(db: &C, row: &OrganizationRow) -> Result<Organization> {
    use sea_orm::ActiveValue::*;

    let now = Utc::now();
    let model = organization::ActiveModel {
        id: NotSet,
        name: Set(row.name.clone()),
        organization_type: Set(row.organization_type.to_string()),
        npi: Set(row.npi.clone()),
        sandbox_id: Set(row.sandbox_id.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(|e| unique_violation(e, "Organization violates a uniqueness constraint"))?;

    model_to_organization(model)
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: i32,
    row: &OrganizationRow,
) -> Result<Organization> {
    use sea_orm::ActiveValue::*;

    let model = organization::ActiveModel {
        id: Unchanged(id),
        name: Set(row.name.clone()),
        organization_type: Set(row.organization_type.to_string()),
        npi: Set(row.npi.clone()),
        sandbox_id: Set(row.sandbox_id.clone()),
        created_at: NotSet,
        updated_at: Set(Utc::now()),
    }
    .update(db)
    .await
    .map_err(|e| match e {
        sea_orm::DbErr::RecordNotUpdated => {
            PortalError::not_found(format!("Organization {} not found", id))
        }
        other => unique_violation(other, "Organization violates a uniqueness constraint"),
    })?;

    model_to_organization(model)
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let result = organization::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(PortalError::not_found(format!(
            "Organization {} not found",
            id
        )));
    }
    Ok(())
}
