use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use super::converters::{address_to_active_model, model_to_address};
use crate::errors::Result;
use crate::storage::models::Address;
use migration::entities::address;

pub async fn find_for_organization<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
) -> Result<Option<Address>> {
    address::Entity::find()
        .filter(address::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .map(model_to_address)
        .transpose()
}

/// 每个组织最多一个地址：存在则更新，否则插入
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    value: &Address,
) -> Result<()> {
    use sea_orm::ActiveValue::Unchanged;

    let existing = address::Entity::find()
        .filter(address::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?;

    let mut active = address_to_active_model(organization_id, value);
    match existing {
        Some(current) => {
            active.id = Unchanged(current.id);
            active.update(db).await?;
        }
        None => {
            active.insert(db).await?;
        }
    }
    Ok(())
}

pub async fn delete_for_organization<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
) -> Result<()> {
    address::Entity::delete_many()
        .filter(address::Column::OrganizationId.eq(organization_id))
        .exec(db)
        .await?;
    Ok(())
}
