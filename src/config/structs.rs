use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::storage::ApiEnvironment;

/// Deployment environment the portal runs in
///
/// Only `prod-sbx` changes behaviour: organizations receive a synthetic
/// sandbox identifier and expose it instead of their NPI. Unrecognised
/// names load as [`DeployEnvironment::Local`], which is not sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsRefStr)]
#[serde(rename_all = "kebab-case", from = "String")]
#[strum(serialize_all = "kebab-case")]
pub enum DeployEnvironment {
    #[default]
    Local,
    Dev,
    Test,
    Impl,
    ProdSbx,
    Prod,
}

impl DeployEnvironment {
    pub fn is_prod_sbx(&self) -> bool {
        matches!(self, Self::ProdSbx)
    }

    /// Known name, `None` otherwise
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "local" | "development" => Some(Self::Local),
            "dev" => Some(Self::Dev),
            "test" => Some(Self::Test),
            "impl" => Some(Self::Impl),
            "prod-sbx" => Some(Self::ProdSbx),
            "prod" | "production" => Some(Self::Prod),
            _ => None,
        }
    }
}

impl From<String> for DeployEnvironment {
    fn from(name: String) -> Self {
        Self::from_name(&name).unwrap_or_else(|| {
            eprintln!(
                "[WARN] Unknown deploy environment '{}', treating it as local (not prod-sbx)",
                name
            );
            Self::Local
        })
    }
}

impl std::fmt::Display for DeployEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Which OAuth provider internal staff sign in with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsRefStr)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase")]
pub enum InternalAuthProvider {
    #[default]
    Github,
    Okta,
}

impl std::fmt::Display for InternalAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for InternalAuthProvider {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "okta" | "oktaoauth" => Ok(Self::Okta),
            _ => Err(format!(
                "Invalid internal auth provider: '{}'. Valid: github, okta",
                s
            )),
        }
    }
}

impl TryFrom<String> for InternalAuthProvider {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Cookie SameSite 策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

/// 应用配置（启动时构建一次，之后以 Arc 形式向下传递）
///
/// 加载优先级：ENV > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub internal_auth: InternalAuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// Public base URL, used to build OAuth redirect URIs
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    #[serde(default)]
    pub environment: DeployEnvironment,
}

/// Session cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HS256 secret; a random one is generated when empty
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_session_minutes")]
    pub session_minutes: u64,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default)]
    pub cookie_same_site: SameSitePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InternalAuthConfig {
    #[serde(default)]
    pub provider: InternalAuthProvider,
    #[serde(default)]
    pub github: GithubAuthConfig,
    #[serde(default)]
    pub okta: OktaAuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Team whose members may sign in
    #[serde(default)]
    pub team_id: String,
    #[serde(default = "default_github_oauth_url")]
    pub oauth_url: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OktaAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Authorization server, e.g. `https://example.okta.com/oauth2/default`
    #[serde(default)]
    pub issuer: String,
    #[serde(default = "default_okta_admin_role")]
    pub admin_role: String,
    /// Userinfo claim holding the role list
    #[serde(default = "default_okta_roles_claim")]
    pub roles_claim: String,
}

/// Token/organization API endpoints, one per environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub sandbox: ApiEndpointConfig,
    #[serde(default)]
    pub production: ApiEndpointConfig,
}

impl ApiConfig {
    pub fn endpoint(&self, env: ApiEnvironment) -> &ApiEndpointConfig {
        match env {
            ApiEnvironment::Sandbox => &self.sandbox,
            ApiEnvironment::Production => &self.production,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiEndpointConfig {
    #[serde(default)]
    pub base_url: String,
    /// Shared secret sent as a bearer credential
    #[serde(default)]
    pub secret: String,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite://portal.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_session_minutes() -> u64 {
    30
}

fn default_github_oauth_url() -> String {
    "https://github.com".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_okta_admin_role() -> String {
    "DPC_AppRole_Admin".to_string()
}

fn default_okta_roles_claim() -> String {
    "roles".to_string()
}

fn default_api_timeout() -> u64 {
    10
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            public_url: default_public_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_minutes: default_session_minutes(),
            cookie_secure: false,
            cookie_same_site: SameSitePolicy::default(),
        }
    }
}

impl Default for GithubAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            team_id: String::new(),
            oauth_url: default_github_oauth_url(),
            api_url: default_github_api_url(),
        }
    }
}

impl Default for OktaAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            issuer: String::new(),
            admin_role: default_okta_admin_role(),
            roles_claim: default_okta_roles_claim(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout: default_api_timeout(),
            sandbox: ApiEndpointConfig::default(),
            production: ApiEndpointConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy(name: &str) -> DeployEnvironment {
        serde_json::from_value(serde_json::json!(name)).unwrap()
    }

    #[test]
    fn test_deploy_environment_deserializes_through_one_parser() {
        assert_eq!(deploy("prod-sbx"), DeployEnvironment::ProdSbx);
        assert_eq!(deploy("PROD"), DeployEnvironment::Prod);
        assert_eq!(deploy("production"), DeployEnvironment::Prod);
        assert_eq!(deploy("development"), DeployEnvironment::Local);
        assert!(DeployEnvironment::ProdSbx.is_prod_sbx());
        assert!(!DeployEnvironment::Prod.is_prod_sbx());
        assert_eq!(DeployEnvironment::ProdSbx.to_string(), "prod-sbx");
    }

    #[test]
    fn test_unknown_deploy_environment_is_not_sandbox() {
        assert_eq!(DeployEnvironment::from_name("staging"), None);
        let env = deploy("staging");
        assert_eq!(env, DeployEnvironment::Local);
        assert!(!env.is_prod_sbx());
    }

    #[test]
    fn test_deploy_environment_serializes_kebab_case() {
        let value = serde_json::to_value(DeployEnvironment::ProdSbx).unwrap();
        assert_eq!(value, "prod-sbx");
        assert_eq!(deploy(value.as_str().unwrap()), DeployEnvironment::ProdSbx);
    }

    #[test]
    fn test_internal_auth_provider_accepts_legacy_okta_name() {
        assert_eq!(
            "oktaoauth".parse::<InternalAuthProvider>(),
            Ok(InternalAuthProvider::Okta)
        );
        let parsed: InternalAuthProvider = serde_json::from_str("\"OktaOAuth\"").unwrap();
        assert_eq!(parsed, InternalAuthProvider::Okta);
        assert!(serde_json::from_str::<InternalAuthProvider>("\"saml\"").is_err());
    }

    #[test]
    fn test_api_endpoint_selection() {
        let mut api = ApiConfig::default();
        api.sandbox.base_url = "http://sandbox.example.com".to_string();
        api.production.base_url = "http://prod.example.com".to_string();

        assert_eq!(
            api.endpoint(ApiEnvironment::Sandbox).base_url,
            "http://sandbox.example.com"
        );
        assert_eq!(
            api.endpoint(ApiEnvironment::Production).base_url,
            "http://prod.example.com"
        );
    }
}
