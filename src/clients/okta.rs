use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use ureq::Agent;
use url::Url;

use super::http::{build_agent, decode_error, join_url, request_error, run_blocking};
use crate::config::OktaAuthConfig;
use crate::errors::{PortalError, Result};

const OAUTH_SCOPE: &str = "openid profile email";

/// `GET {issuer}/v1/userinfo` response; custom claims are kept as-is
#[derive(Debug, Clone, Deserialize)]
pub struct OktaUserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl OktaUserInfo {
    /// Values of a role claim; a single string counts as one role
    pub fn roles(&self, claim: &str) -> Vec<String> {
        match self.claims.get(claim) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(role)) => vec![role.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
pub trait OktaApi: Send + Sync {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String>;

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String>;

    async fn fetch_userinfo(&self, access_token: &str) -> Result<OktaUserInfo>;
}

pub struct UreqOktaApi {
    agent: Agent,
    config: OktaAuthConfig,
}

impl UreqOktaApi {
    pub fn new(config: &OktaAuthConfig, timeout_secs: u64) -> Self {
        Self {
            agent: build_agent(timeout_secs),
            config: config.clone(),
        }
    }

    fn issuer(&self) -> Result<&str> {
        if self.config.issuer.is_empty() {
            return Err(PortalError::config("internal_auth.okta.issuer is not configured"));
        }
        Ok(&self.config.issuer)
    }
}

#[async_trait]
impl OktaApi for UreqOktaApi {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let base = join_url(self.issuer()?, "v1/authorize");
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPE),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )
        .map_err(|e| PortalError::config(format!("Invalid Okta issuer: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String> {
        let agent = self.agent.clone();
        let url = join_url(self.issuer()?, "v1/token");
        let form = [
            ("grant_type", "authorization_code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", self.config.client_secret.clone()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ];

        let response = run_blocking("Okta token exchange", move || {
            agent
                .post(&url)
                .header("Accept", "application/json")
                .send_form(form)
                .map_err(|e| request_error("Okta token exchange", e))?
                .into_body()
                .read_json::<TokenResponse>()
                .map_err(|e| decode_error("Okta token exchange", e))
        })
        .await?;

        Ok(response.access_token)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<OktaUserInfo> {
        let agent = self.agent.clone();
        let url = join_url(self.issuer()?, "v1/userinfo");
        let authorization = format!("Bearer {}", access_token);

        run_blocking("Okta userinfo", move || {
            agent
                .get(&url)
                .header("Authorization", &authorization)
                .header("Accept", "application/json")
                .call()
                .map_err(|e| request_error("Okta userinfo", e))?
                .into_body()
                .read_json::<OktaUserInfo>()
                .map_err(|e| decode_error("Okta userinfo", e))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roles_from_array_or_string() {
        let info: OktaUserInfo = serde_json::from_value(json!({
            "sub": "00u2ysph7s90zebsv333",
            "email": "nemo@example.com",
            "roles": ["DPC_AppRole_Admin", "Other"],
            "group": "DPC_AppRole_Admin"
        }))
        .unwrap();

        assert_eq!(info.roles("roles"), vec!["DPC_AppRole_Admin", "Other"]);
        assert_eq!(info.roles("group"), vec!["DPC_AppRole_Admin"]);
        assert!(info.roles("missing").is_empty());
    }

    #[test]
    fn test_authorize_url_requires_issuer() {
        let api = UreqOktaApi::new(&OktaAuthConfig::default(), 5);
        assert!(matches!(
            api.authorize_url("http://localhost/cb", "state"),
            Err(PortalError::Config(_))
        ));

        let config = OktaAuthConfig {
            issuer: "https://example.okta.com/oauth2/default".to_string(),
            client_id: "okta-client".to_string(),
            ..Default::default()
        };
        let url = UreqOktaApi::new(&config, 5)
            .authorize_url("http://localhost/cb", "state")
            .unwrap();
        assert!(url.starts_with("https://example.okta.com/oauth2/default/v1/authorize?"));
        assert!(url.contains("response_type=code"));
    }
}
