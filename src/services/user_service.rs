//! Organization user accounts (email + password)

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::errors::{PortalError, Result};
use crate::storage::backend::{assignments, users};
use crate::storage::{SeaOrmStorage, User};
use crate::utils::password::{hash_password, verify_password};
use crate::utils::{is_valid_email, non_blank};

pub const MIN_PASSWORD_LENGTH: usize = 8;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpParams {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

pub struct UserService {
    storage: Arc<SeaOrmStorage>,
}

impl UserService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn sign_up(&self, params: SignUpParams) -> Result<User> {
        let db = self.storage.get_db();
        let mut errors = Vec::new();

        let email = params.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            errors.push("Email is invalid".to_string());
        } else if users::find_by_email(db, &email).await?.is_some() {
            errors.push("Email has already been taken".to_string());
        }
        let first_name = non_blank(Some(params.first_name.as_str()));
        if first_name.is_none() {
            errors.push("First name can't be blank".to_string());
        }
        let last_name = non_blank(Some(params.last_name.as_str()));
        if last_name.is_none() {
            errors.push("Last name can't be blank".to_string());
        }
        if params.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(format!(
                "Password is too short (minimum is {} characters)",
                MIN_PASSWORD_LENGTH
            ));
        }
        if params.password != params.password_confirmation {
            errors.push("Password confirmation doesn't match Password".to_string());
        }

        if !errors.is_empty() {
            return Err(PortalError::validation(errors.join(", ")));
        }

        let hash = hash_password(&params.password)?;
        let user = users::insert(
            db,
            &email,
            first_name.as_deref().unwrap_or_default(),
            last_name.as_deref().unwrap_or_default(),
            &hash,
        )
        .await?;

        info!("UserService: user {} signed up", user.id);
        Ok(user)
    }

    /// The same message is returned for unknown emails and wrong passwords
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = users::find_by_email(self.storage.get_db(), email)
            .await?
            .ok_or_else(|| PortalError::unauthorized(INVALID_CREDENTIALS))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(PortalError::unauthorized(INVALID_CREDENTIALS));
        }
        Ok(user)
    }

    pub async fn find(&self, id: i32) -> Result<Option<User>> {
        users::find(self.storage.get_db(), id).await
    }

    pub async fn organization_ids(&self, user_id: i32) -> Result<Vec<i32>> {
        assignments::organization_ids_for_user(self.storage.get_db(), user_id).await
    }

    pub async fn is_assigned(&self, user_id: i32, organization_id: i32) -> Result<bool> {
        assignments::is_assigned(self.storage.get_db(), organization_id, user_id).await
    }
}
