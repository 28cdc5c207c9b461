//! Shared fixtures for integration tests
//!
//! Every test gets its own SQLite file and in-process fakes for the
//! outbound clients, so nothing leaves the process.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::cookie::Cookie;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

use dpc_portal::api::jwt::SessionScope;
use dpc_portal::clients::{
    ApiOrganization, ClientTokenMetadata, CreatedClientToken, DpcApi, GithubApi, GithubTeam,
    GithubUser, OktaApi, OktaUserInfo,
};
use dpc_portal::config::{AppConfig, DatabaseConfig, DeployEnvironment, InternalAuthProvider};
use dpc_portal::errors::{PortalError, Result};
use dpc_portal::runtime::lifetime::{OutboundClients, StartupContext};
use dpc_portal::services::{FhirEndpointParams, OrganizationParams, SignUpParams};
use dpc_portal::storage::backend::internal_users;
use dpc_portal::storage::{
    ApiEnvironment, InternalUser, OrganizationProfile, RegisteredOrganization, StorageFactory, User,
};

/// Initialized actix service for a [`TestPortal`]
#[macro_export]
macro_rules! portal_app {
    ($portal:expr) => {{
        let context = $portal.context.clone();
        actix_web::test::init_service(
            actix_web::App::new().configure(move |cfg| context.configure(cfg)),
        )
        .await
    }};
}

pub const TEAM_ID: &str = "111222333";
pub const PASSWORD: &str = "3veryS3cret!";

// =============================================================================
// Fake token / organization API
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateToken { env: ApiEnvironment, api_id: String, label: String },
    ListTokens { env: ApiEnvironment, api_id: String },
    CreateOrganization { env: ApiEnvironment, name: String, identifier: Option<String> },
    UpdateOrganization { env: ApiEnvironment, api_id: String, name: String },
    DeleteOrganization { env: ApiEnvironment, api_id: String },
}

/// Records every call; tokens are kept per `api_id`
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<ApiCall>>,
    tokens: Mutex<HashMap<String, Vec<ClientTokenMetadata>>>,
    next_id: AtomicUsize,
    pub fail_updates: AtomicBool,
    pub fail_token_create: AtomicBool,
    pub fail_token_list: AtomicBool,
}

impl RecordingApi {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::UpdateOrganization { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn seed_token(&self, api_id: &str, label: &str, created_at: &str) {
        self.tokens
            .lock()
            .unwrap()
            .entry(api_id.to_string())
            .or_default()
            .push(ClientTokenMetadata {
                id: format!("token-{}", label.len()),
                token_type: Some("MACAROON".to_string()),
                label: label.to_string(),
                created_at: created_at.to_string(),
                expires_at: None,
            });
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DpcApi for RecordingApi {
    async fn create_client_token(
        &self,
        env: ApiEnvironment,
        api_id: &str,
        label: &str,
    ) -> Result<CreatedClientToken> {
        self.record(ApiCall::CreateToken {
            env,
            api_id: api_id.to_string(),
            label: label.to_string(),
        });
        if self.fail_token_create.load(Ordering::SeqCst) {
            return Err(PortalError::external_service("token service unavailable"));
        }

        let created_at = "2019-11-07T17:15:22.781Z".to_string();
        self.seed_token(api_id, label, &created_at);
        Ok(CreatedClientToken {
            token: "1234567890".to_string(),
            label: label.to_string(),
            created_at,
        })
    }

    async fn get_client_tokens(
        &self,
        env: ApiEnvironment,
        api_id: &str,
    ) -> Result<Vec<ClientTokenMetadata>> {
        self.record(ApiCall::ListTokens {
            env,
            api_id: api_id.to_string(),
        });
        if self.fail_token_list.load(Ordering::SeqCst) {
            return Err(PortalError::external_service("token service unavailable"));
        }
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .get(api_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_organization(
        &self,
        env: ApiEnvironment,
        organization: &ApiOrganization,
    ) -> Result<String> {
        self.record(ApiCall::CreateOrganization {
            env,
            name: organization.name.clone(),
            identifier: organization.identifier.clone(),
        });
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-org-{}", env, n))
    }

    async fn update_organization(
        &self,
        env: ApiEnvironment,
        api_id: &str,
        organization: &ApiOrganization,
    ) -> Result<()> {
        self.record(ApiCall::UpdateOrganization {
            env,
            api_id: api_id.to_string(),
            name: organization.name.clone(),
        });
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PortalError::external_service("organization update rejected"));
        }
        Ok(())
    }

    async fn delete_organization(&self, env: ApiEnvironment, api_id: &str) -> Result<()> {
        self.record(ApiCall::DeleteOrganization {
            env,
            api_id: api_id.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Fake identity providers
// =============================================================================

pub struct FakeGithub {
    pub teams: Vec<String>,
}

impl FakeGithub {
    pub fn with_teams(teams: &[&str]) -> Self {
        Self {
            teams: teams.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        Ok(format!(
            "https://github.com/login/oauth/authorize?redirect_uri={}&state={}",
            redirect_uri, state
        ))
    }

    async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<String> {
        if code == "bad-code" {
            return Err(PortalError::external_service("bad_verification_code"));
        }
        Ok("abcdefg".to_string())
    }

    async fn fetch_user(&self, _access_token: &str) -> Result<GithubUser> {
        Ok(GithubUser {
            uid: "123545".to_string(),
            login: "whereisnemo".to_string(),
            email: Some("nemo@example.com".to_string()),
            name: Some("Nemo".to_string()),
        })
    }

    async fn fetch_user_teams(&self, _access_token: &str) -> Result<Vec<GithubTeam>> {
        Ok(self
            .teams
            .iter()
            .map(|id| GithubTeam {
                id: id.clone(),
                name: format!("team {}", id),
                slug: format!("team-{}", id),
            })
            .collect())
    }
}

pub struct FakeOkta {
    pub roles: Vec<String>,
}

impl FakeOkta {
    pub fn with_roles(roles: &[&str]) -> Self {
        Self {
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[async_trait]
impl OktaApi for FakeOkta {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        Ok(format!(
            "https://okta.example.com/oauth2/default/v1/authorize?redirect_uri={}&state={}",
            redirect_uri, state
        ))
    }

    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<String> {
        Ok("okta-access-token".to_string())
    }

    async fn fetch_userinfo(&self, _access_token: &str) -> Result<OktaUserInfo> {
        let mut claims = Map::new();
        claims.insert("roles".to_string(), json!(self.roles));
        Ok(OktaUserInfo {
            sub: "00u1abcd".to_string(),
            email: Some("dory@example.com".to_string()),
            name: Some("Dory".to_string()),
            claims,
        })
    }
}

// =============================================================================
// Portal fixture
// =============================================================================

pub struct PortalOptions {
    pub deploy: DeployEnvironment,
    pub provider: InternalAuthProvider,
    pub github_teams: Vec<&'static str>,
    pub okta_roles: Vec<&'static str>,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            deploy: DeployEnvironment::Dev,
            provider: InternalAuthProvider::Github,
            github_teams: vec![TEAM_ID],
            okta_roles: vec!["DPC_AppRole_Admin"],
        }
    }
}

pub struct TestPortal {
    pub context: Arc<StartupContext>,
    pub api: Arc<RecordingApi>,
    _dir: TempDir,
}

impl TestPortal {
    pub async fn new() -> Self {
        Self::with_options(PortalOptions::default()).await
    }

    pub async fn with_options(options: PortalOptions) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("portal_test.db");

        let mut config = AppConfig::default();
        config.database = DatabaseConfig {
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            ..Default::default()
        };
        config.deploy.environment = options.deploy;
        config.session.jwt_secret = "integration-test-secret".to_string();
        config.internal_auth.provider = options.provider;
        config.internal_auth.github.team_id = TEAM_ID.to_string();

        let storage = StorageFactory::create(&config.database)
            .await
            .expect("Failed to create storage");

        let api = Arc::new(RecordingApi::default());
        let clients = OutboundClients {
            dpc_api: api.clone(),
            github: Arc::new(FakeGithub::with_teams(&options.github_teams)),
            okta: Arc::new(FakeOkta::with_roles(&options.okta_roles)),
        };

        let context = StartupContext::build(Arc::new(config), storage, clients)
            .expect("Failed to build startup context");

        Self {
            context: Arc::new(context),
            api,
            _dir: dir,
        }
    }

    pub fn user_cookie(&self, user_id: i32) -> Cookie<'static> {
        self.context
            .sessions
            .sign_in_cookie(SessionScope::User, user_id)
            .expect("Failed to sign session")
    }

    pub fn internal_cookie(&self, internal_user_id: i32) -> Cookie<'static> {
        self.context
            .sessions
            .sign_in_cookie(SessionScope::InternalUser, internal_user_id)
            .expect("Failed to sign session")
    }

    pub async fn create_organization(&self, name: &str, npi: Option<&str>) -> OrganizationProfile {
        self.context
            .organization_service
            .create(organization_params(name, npi))
            .await
            .expect("Failed to create organization")
    }

    pub async fn register(
        &self,
        organization_id: i32,
        env: ApiEnvironment,
    ) -> RegisteredOrganization {
        self.context
            .registered_organization_service
            .register(organization_id, env, &endpoint_params())
            .await
            .expect("Failed to register organization")
    }

    pub async fn create_user(&self, email: &str) -> User {
        self.context
            .user_service
            .sign_up(SignUpParams {
                email: email.to_string(),
                first_name: "Marlin".to_string(),
                last_name: "Clownfish".to_string(),
                password: PASSWORD.to_string(),
                password_confirmation: PASSWORD.to_string(),
            })
            .await
            .expect("Failed to sign up user")
    }

    pub async fn create_internal_user(&self) -> InternalUser {
        internal_users::upsert_from_profile(
            self.context.storage.get_db(),
            "github",
            "123545",
            "nemo@example.com",
            Some("Nemo"),
        )
        .await
        .expect("Failed to create internal user")
    }

    pub async fn assign(&self, organization_id: i32, email: &str) {
        self.context
            .organization_service
            .assign_user(organization_id, email)
            .await
            .expect("Failed to assign user");
    }
}

pub fn organization_params(name: &str, npi: Option<&str>) -> OrganizationParams {
    OrganizationParams {
        name: name.to_string(),
        organization_type: "primary_care_clinic".to_string(),
        npi: npi.map(str::to_string),
        ..Default::default()
    }
}

pub fn endpoint_params() -> FhirEndpointParams {
    FhirEndpointParams {
        name: Some("Acme FHIR".to_string()),
        status: Some("active".to_string()),
        uri: Some("https://fhir.acme.example.com/r4".to_string()),
    }
}

/// Value of a `Set-Cookie` header on the response, if any
pub fn response_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn body_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

pub fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}
