//! Internal staff sign-in
//!
//! Exactly one provider is active, chosen by `internal_auth.provider`.
//! Failures never raise: they come back as [`AuthFailure`] so the handler
//! can send the browser back to the sign-in form without a session.

mod github;
mod okta;

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{GithubApi, OktaApi};
use crate::config::{InternalAuthConfig, InternalAuthProvider};
use crate::errors::Result;
use crate::storage::backend::internal_users;
use crate::storage::{InternalUser, SeaOrmStorage};

/// Identity returned by a provider once authorization checks pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Token exchange or profile fetch failed
    Provider(String),
    StateMismatch,
    NoTeams,
    NotTeamMember,
    MissingAdminRole,
    Storage(String),
}

impl AuthFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthFailure::MissingAdminRole => "Must have admin role",
            AuthFailure::NoTeams | AuthFailure::NotTeamMember => {
                "Must be a member of the authorized GitHub team"
            }
            AuthFailure::Provider(_) | AuthFailure::StateMismatch => {
                "Could not authenticate you"
            }
            AuthFailure::Storage(_) => "Something went wrong. Please try again later.",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::Provider(reason) => write!(f, "provider error: {}", reason),
            AuthFailure::StateMismatch => write!(f, "oauth state mismatch"),
            AuthFailure::NoTeams => write!(f, "user has no GitHub teams"),
            AuthFailure::NotTeamMember => write!(f, "user is not in the authorized team"),
            AuthFailure::MissingAdminRole => write!(f, "user lacks the admin role"),
            AuthFailure::Storage(reason) => write!(f, "storage error: {}", reason),
        }
    }
}

pub struct InternalAuthService {
    storage: Arc<SeaOrmStorage>,
    config: InternalAuthConfig,
    github: Arc<dyn GithubApi>,
    okta: Arc<dyn OktaApi>,
}

impl InternalAuthService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        config: &InternalAuthConfig,
        github: Arc<dyn GithubApi>,
        okta: Arc<dyn OktaApi>,
    ) -> Self {
        Self {
            storage,
            config: config.clone(),
            github,
            okta,
        }
    }

    pub fn provider(&self) -> InternalAuthProvider {
        self.config.provider
    }

    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        match self.config.provider {
            InternalAuthProvider::Github => self.github.authorize_url(redirect_uri, state),
            InternalAuthProvider::Okta => self.okta.authorize_url(redirect_uri, state),
        }
    }

    /// Run the provider checks, then find or create the internal user
    pub async fn authenticate(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> std::result::Result<InternalUser, AuthFailure> {
        let provider = self.config.provider;
        let outcome = match provider {
            InternalAuthProvider::Github => {
                github::authorize(
                    self.github.as_ref(),
                    &self.config.github.team_id,
                    code,
                    redirect_uri,
                )
                .await
            }
            InternalAuthProvider::Okta => {
                okta::authorize(
                    self.okta.as_ref(),
                    &self.config.okta.admin_role,
                    &self.config.okta.roles_claim,
                    code,
                    redirect_uri,
                )
                .await
            }
        };

        let profile = outcome.inspect_err(|failure| {
            warn!("Internal sign-in via {} refused: {}", provider, failure)
        })?;

        let user = internal_users::upsert_from_profile(
            self.storage.get_db(),
            provider.as_ref(),
            &profile.uid,
            &profile.email,
            profile.name.as_deref(),
        )
        .await
        .map_err(|e| AuthFailure::Storage(e.to_string()))?;

        info!(
            "Internal user {} signed in via {}",
            user.id, provider
        );
        Ok(user)
    }

    pub async fn find_user(&self, id: i32) -> Result<Option<InternalUser>> {
        internal_users::find(self.storage.get_db(), id).await
    }
}
