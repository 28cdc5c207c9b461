use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use super::converters::model_to_user;
use super::unique_violation;
use crate::errors::Result;
use crate::storage::models::User;
use migration::entities::user;

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<User>> {
    Ok(user::Entity::find_by_id(id).one(db).await?.map(model_to_user))
}

/// Emails are compared lower-cased
pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<User>> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .map(model_to_user))
}

pub async fn find_many<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(user::Column::Email)
        .all(db)
        .await?
        .into_iter()
        .map(model_to_user)
        .collect())
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    email: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
) -> Result<User> {
    use sea_orm::ActiveValue::*;

    let model = user::ActiveModel {
        id: NotSet,
        email: Set(email.trim().to_lowercase()),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        password_hash: Set(password_hash.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(|e| unique_violation(e, "Email has already been taken"))?;

    Ok(model_to_user(model))
}
