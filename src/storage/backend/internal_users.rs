use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use super::converters::model_to_internal_user;
use crate::errors::Result;
use crate::storage::models::InternalUser;
use migration::entities::internal_user;

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<InternalUser>> {
    Ok(internal_user::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(model_to_internal_user))
}

pub async fn find_by_uid<C: ConnectionTrait>(
    db: &C,
    provider: &str,
    uid: &str,
) -> Result<Option<InternalUser>> {
    Ok(internal_user::Entity::find()
        .filter(internal_user::Column::Provider.eq(provider))
        .filter(internal_user::Column::Uid.eq(uid))
        .one(db)
        .await?
        .map(model_to_internal_user))
}

/// 按 (provider, uid) 查找或创建；已存在时刷新 email/name 与登录时间
pub async fn upsert_from_profile<C: ConnectionTrait>(
    db: &C,
    provider: &str,
    uid: &str,
    email: &str,
    name: Option<&str>,
) -> Result<InternalUser> {
    use sea_orm::ActiveValue::*;

    let now = Utc::now();
    let existing = internal_user::Entity::find()
        .filter(internal_user::Column::Provider.eq(provider))
        .filter(internal_user::Column::Uid.eq(uid))
        .one(db)
        .await?;

    let model = match existing {
        Some(current) => {
            let mut active: internal_user::ActiveModel = current.into();
            if !email.is_empty() {
                active.email = Set(email.to_string());
            }
            if let Some(name) = name {
                active.name = Set(Some(name.to_string()));
            }
            active.last_sign_in_at = Set(now);
            active.update(db).await?
        }
        None => {
            internal_user::ActiveModel {
                id: NotSet,
                provider: Set(provider.to_string()),
                uid: Set(uid.to_string()),
                email: Set(email.to_string()),
                name: Set(name.map(str::to_string)),
                created_at: Set(now),
                last_sign_in_at: Set(now),
            }
            .insert(db)
            .await?
        }
    };

    Ok(model_to_internal_user(model))
}
