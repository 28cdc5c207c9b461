//! Token and organization API client
//!
//! One base URL and shared secret per [`ApiEnvironment`]; the secret is sent
//! as `Authorization: Bearer <secret>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use ureq::Agent;

use super::http::{build_agent, decode_error, id_string, join_url, request_error, run_blocking};
use crate::config::{ApiConfig, ApiEndpointConfig};
use crate::errors::{PortalError, Result};
use crate::storage::{Address, ApiEnvironment, FhirEndpoint};

const NPI_SYSTEM: &str = "http://hl7.org/fhir/sid/us-npi";
const CONNECTION_TYPE_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/endpoint-connection-type";
const PAYLOAD_TYPE_SYSTEM: &str = "http://hl7.org/fhir/endpoint-payload-type";

/// Response of `POST /Token/{api_id}`; the only time the raw token is visible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedClientToken {
    pub token: String,
    pub label: String,
    pub created_at: String,
}

/// Entry of `GET /Token/{api_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenMetadata {
    pub id: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub label: String,
    pub created_at: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// What the API needs to know about an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOrganization {
    pub name: String,
    /// NPI, or the sandbox id in prod-sbx
    pub identifier: Option<String>,
    pub address: Option<Address>,
    pub endpoint: FhirEndpoint,
}

impl ApiOrganization {
    /// FHIR `Organization` resource; `id` is set for updates
    pub fn to_fhir_organization(&self, id: Option<&str>) -> Value {
        let mut resource = json!({
            "resourceType": "Organization",
            "name": self.name,
            "identifier": self
                .identifier
                .iter()
                .map(|value| json!({ "system": NPI_SYSTEM, "value": value }))
                .collect::<Vec<_>>(),
        });

        if let Some(address) = &self.address {
            let mut line = vec![address.street.clone()];
            line.extend(address.street_2.iter().cloned());
            resource["address"] = json!([{
                "use": address.address_use.as_ref(),
                "type": address.address_type.as_ref(),
                "line": line,
                "city": address.city,
                "state": address.state,
                "postalCode": address.zip,
                "country": "US",
            }]);
        }
        if let Some(id) = id {
            resource["id"] = json!(id);
        }
        resource
    }

    pub fn to_fhir_endpoint(&self) -> Value {
        json!({
            "resourceType": "Endpoint",
            "status": self.endpoint.status.as_ref(),
            "name": self.endpoint.name,
            "address": self.endpoint.uri,
            "connectionType": { "system": CONNECTION_TYPE_SYSTEM, "code": "hl7-fhir-rest" },
            "payloadType": [{ "coding": [{ "system": PAYLOAD_TYPE_SYSTEM, "code": "any" }] }],
        })
    }

    /// Body of `POST /Organization/$submit`
    pub fn to_submit_parameters(&self) -> Value {
        json!({
            "resourceType": "Parameters",
            "parameter": [{
                "name": "resource",
                "resource": {
                    "resourceType": "Bundle",
                    "type": "collection",
                    "entry": [
                        { "resource": self.to_fhir_organization(None) },
                        { "resource": self.to_fhir_endpoint() },
                    ],
                },
            }],
        })
    }
}

#[async_trait]
pub trait DpcApi: Send + Sync {
    async fn create_client_token(
        &self,
        env: ApiEnvironment,
        api_id: &str,
        label: &str,
    ) -> Result<CreatedClientToken>;

    async fn get_client_tokens(
        &self,
        env: ApiEnvironment,
        api_id: &str,
    ) -> Result<Vec<ClientTokenMetadata>>;

    /// Returns the API's identifier for the new organization
    async fn create_organization(
        &self,
        env: ApiEnvironment,
        organization: &ApiOrganization,
    ) -> Result<String>;

    async fn update_organization(
        &self,
        env: ApiEnvironment,
        api_id: &str,
        organization: &ApiOrganization,
    ) -> Result<()>;

    async fn delete_organization(&self, env: ApiEnvironment, api_id: &str) -> Result<()>;
}

pub struct UreqDpcApi {
    agent: Agent,
    config: ApiConfig,
}

impl UreqDpcApi {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            agent: build_agent(config.timeout),
            config: config.clone(),
        }
    }

    fn endpoint(&self, env: ApiEnvironment) -> Result<ApiEndpointConfig> {
        let endpoint = self.config.endpoint(env);
        if endpoint.base_url.is_empty() {
            return Err(PortalError::config(format!(
                "api.{}.base_url is not configured",
                env
            )));
        }
        Ok(endpoint.clone())
    }
}

fn bearer(endpoint: &ApiEndpointConfig) -> String {
    format!("Bearer {}", endpoint.secret)
}

/// 兼容纯数组与 `{ "entities": [...] }` 两种响应格式
fn token_list(body: Value) -> Result<Vec<ClientTokenMetadata>> {
    let entries = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => map.remove("entities").unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    Ok(serde_json::from_value(entries)?)
}

#[async_trait]
impl DpcApi for UreqDpcApi {
    async fn create_client_token(
        &self,
        env: ApiEnvironment,
        api_id: &str,
        label: &str,
    ) -> Result<CreatedClientToken> {
        let endpoint = self.endpoint(env)?;
        let agent = self.agent.clone();
        let url = join_url(
            &endpoint.base_url,
            &format!("Token/{}", urlencoding::encode(api_id)),
        );
        let body = json!({ "label": label });

        debug!("POST {} ({})", url, env);
        let token = run_blocking("Create client token", move || {
            agent
                .post(&url)
                .header("Authorization", &bearer(&endpoint))
                .header("Accept", "application/json")
                .send_json(&body)
                .map_err(|e| request_error("Create client token", e))?
                .into_body()
                .read_json::<CreatedClientToken>()
                .map_err(|e| decode_error("Create client token", e))
        })
        .await?;

        info!("Client token '{}' created in {}", token.label, env);
        Ok(token)
    }

    async fn get_client_tokens(
        &self,
        env: ApiEnvironment,
        api_id: &str,
    ) -> Result<Vec<ClientTokenMetadata>> {
        let endpoint = self.endpoint(env)?;
        let agent = self.agent.clone();
        let url = join_url(
            &endpoint.base_url,
            &format!("Token/{}", urlencoding::encode(api_id)),
        );

        debug!("GET {} ({})", url, env);
        let body = run_blocking("List client tokens", move || {
            agent
                .get(&url)
                .header("Authorization", &bearer(&endpoint))
                .header("Accept", "application/json")
                .call()
                .map_err(|e| request_error("List client tokens", e))?
                .into_body()
                .read_json::<Value>()
                .map_err(|e| decode_error("List client tokens", e))
        })
        .await?;

        token_list(body)
    }

    async fn create_organization(
        &self,
        env: ApiEnvironment,
        organization: &ApiOrganization,
    ) -> Result<String> {
        let endpoint = self.endpoint(env)?;
        let agent = self.agent.clone();
        let url = join_url(&endpoint.base_url, "Organization/$submit");
        let body = organization.to_submit_parameters();

        debug!("POST {} ({})", url, env);
        let created = run_blocking("Register organization", move || {
            agent
                .post(&url)
                .header("Authorization", &bearer(&endpoint))
                .header("Accept", "application/fhir+json")
                .header("Content-Type", "application/fhir+json")
                .send(serde_json::to_vec(&body)?)
                .map_err(|e| request_error("Register organization", e))?
                .into_body()
                .read_json::<Value>()
                .map_err(|e| decode_error("Register organization", e))
        })
        .await?;

        let api_id = id_string(&created["id"]).ok_or_else(|| {
            PortalError::external_service("Register organization response has no id")
        })?;
        info!(
            "Organization '{}' registered in {} as {}",
            organization.name, env, api_id
        );
        Ok(api_id)
    }

    async fn update_organization(
        &self,
        env: ApiEnvironment,
        api_id: &str,
        organization: &ApiOrganization,
    ) -> Result<()> {
        let endpoint = self.endpoint(env)?;
        let agent = self.agent.clone();
        let url = join_url(
            &endpoint.base_url,
            &format!("Organization/{}", urlencoding::encode(api_id)),
        );
        let body = organization.to_fhir_organization(Some(api_id));

        debug!("PUT {} ({})", url, env);
        run_blocking("Update organization", move || {
            agent
                .put(&url)
                .header("Authorization", &bearer(&endpoint))
                .header("Content-Type", "application/fhir+json")
                .send(serde_json::to_vec(&body)?)
                .map_err(|e| request_error("Update organization", e))?;
            Ok(())
        })
        .await
    }

    async fn delete_organization(&self, env: ApiEnvironment, api_id: &str) -> Result<()> {
        let endpoint = self.endpoint(env)?;
        let agent = self.agent.clone();
        let url = join_url(
            &endpoint.base_url,
            &format!("Organization/{}", urlencoding::encode(api_id)),
        );

        debug!("DELETE {} ({})", url, env);
        run_blocking("Delete organization", move || {
            agent
                .delete(&url)
                .header("Authorization", &bearer(&endpoint))
                .call()
                .map_err(|e| request_error("Delete organization", e))?;
            Ok(())
        })
        .await
    }
}
