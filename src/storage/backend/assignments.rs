use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::errors::Result;
use migration::entities::organization_user_assignment as assignment;

pub async fn is_assigned<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    user_id: i32,
) -> Result<bool> {
    let count = assignment::Entity::find()
        .filter(assignment::Column::OrganizationId.eq(organization_id))
        .filter(assignment::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// 已分配时不重复插入
pub async fn assign<C: ConnectionTrait>(db: &C, organization_id: i32, user_id: i32) -> Result<()> {
    use sea_orm::ActiveValue::*;

    if is_assigned(db, organization_id, user_id).await? {
        return Ok(());
    }
    assignment::ActiveModel {
        id: NotSet,
        organization_id: Set(organization_id),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    Ok(())
}

pub async fn unassign<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
    user_id: i32,
) -> Result<bool> {
    let result = assignment::Entity::delete_many()
        .filter(assignment::Column::OrganizationId.eq(organization_id))
        .filter(assignment::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn user_ids_for_organization<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
) -> Result<Vec<i32>> {
    Ok(assignment::Entity::find()
        .filter(assignment::Column::OrganizationId.eq(organization_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect())
}

pub async fn organization_ids_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<i32>> {
    Ok(assignment::Entity::find()
        .filter(assignment::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.organization_id)
        .collect())
}

pub async fn delete_for_organization<C: ConnectionTrait>(
    db: &C,
    organization_id: i32,
) -> Result<()> {
    assignment::Entity::delete_many()
        .filter(assignment::Column::OrganizationId.eq(organization_id))
        .exec(db)
        .await?;
    Ok(())
}
