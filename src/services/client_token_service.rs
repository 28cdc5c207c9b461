//! Client tokens live in the API; only the registered organization is stored locally

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{ClientTokenMetadata, CreatedClientToken, DpcApi};
use crate::errors::{PortalError, Result};
use crate::storage::backend::registered_organizations;
use crate::storage::{ApiEnvironment, RegisteredOrganization, SeaOrmStorage};
use crate::utils::non_blank;

/// Tokens of one registered organization
///
/// `error` is set when the token service could not be reached for this
/// environment; `tokens` is then empty.
#[derive(Debug, Clone)]
pub struct EnvironmentTokens {
    pub registered_organization: RegisteredOrganization,
    pub tokens: Vec<ClientTokenMetadata>,
    pub error: Option<String>,
}

pub struct ClientTokenService {
    storage: Arc<SeaOrmStorage>,
    api: Arc<dyn DpcApi>,
}

impl ClientTokenService {
    pub fn new(storage: Arc<SeaOrmStorage>, api: Arc<dyn DpcApi>) -> Self {
        Self { storage, api }
    }

    pub async fn create(
        &self,
        organization_id: i32,
        api_env: ApiEnvironment,
        label: &str,
    ) -> Result<CreatedClientToken> {
        let label =
            non_blank(Some(label)).ok_or_else(|| PortalError::validation("Label can't be blank"))?;

        let registered =
            registered_organizations::find(self.storage.get_db(), organization_id, api_env)
                .await?
                .ok_or_else(|| {
                    PortalError::validation(format!(
                        "Organization is not registered in {}",
                        api_env
                    ))
                })?;

        let token = self
            .api
            .create_client_token(api_env, &registered.api_id, &label)
            .await?;

        info!(
            "Client token '{}' created for organization {} in {}",
            token.label, organization_id, api_env
        );
        Ok(token)
    }

    /// Metadata only; the raw token value is never returned by the API again
    ///
    /// A failing environment is reported in its own entry and does not hide
    /// the others.
    pub async fn list(
        &self,
        registered: &[RegisteredOrganization],
    ) -> Result<Vec<EnvironmentTokens>> {
        let mut result = Vec::with_capacity(registered.len());
        for reg in registered {
            let (tokens, error) = match self.api.get_client_tokens(reg.api_env, &reg.api_id).await
            {
                Ok(tokens) => (tokens, None),
                Err(PortalError::ExternalService(message) | PortalError::Config(message)) => {
                    warn!(
                        "Listing client tokens for {} in {} failed: {}",
                        reg.api_id, reg.api_env, message
                    );
                    (Vec::new(), Some(message))
                }
                Err(e) => return Err(e),
            };
            result.push(EnvironmentTokens {
                registered_organization: reg.clone(),
                tokens,
                error,
            });
        }
        Ok(result)
    }
}
