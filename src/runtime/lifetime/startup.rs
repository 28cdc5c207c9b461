use actix_web::web;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::services::{AppStartTime, configure_routes};
use crate::api::session::SessionManager;
use crate::api::views::Views;
use crate::clients::{DpcApi, GithubApi, OktaApi, UreqDpcApi, UreqGithubApi, UreqOktaApi};
use crate::config::AppConfig;
use crate::services::{
    ClientTokenService, InternalAuthService, OrganizationService, RegisteredOrganizationService,
    UserService,
};
use crate::storage::{ApiEnvironment, SeaOrmStorage, StorageFactory};

/// Outbound HTTP clients, swappable for in-process fakes
#[derive(Clone)]
pub struct OutboundClients {
    pub dpc_api: Arc<dyn DpcApi>,
    pub github: Arc<dyn GithubApi>,
    pub okta: Arc<dyn OktaApi>,
}

impl OutboundClients {
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = config.api.timeout;
        Self {
            dpc_api: Arc::new(UreqDpcApi::new(&config.api)),
            github: Arc::new(UreqGithubApi::new(&config.internal_auth.github, timeout)),
            okta: Arc::new(UreqOktaApi::new(&config.internal_auth.okta, timeout)),
        }
    }
}

/// Everything the HTTP workers share
pub struct StartupContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<SeaOrmStorage>,
    pub sessions: Arc<SessionManager>,
    pub views: Arc<Views>,
    pub organization_service: Arc<OrganizationService>,
    pub registered_organization_service: Arc<RegisteredOrganizationService>,
    pub client_token_service: Arc<ClientTokenService>,
    pub user_service: Arc<UserService>,
    pub internal_auth_service: Arc<InternalAuthService>,
    pub app_start_time: AppStartTime,
}

impl StartupContext {
    pub fn build(
        config: Arc<AppConfig>,
        storage: Arc<SeaOrmStorage>,
        clients: OutboundClients,
    ) -> Result<Self> {
        let deploy = config.deploy.environment;
        let views = Views::new().context("Failed to load templates")?;

        Ok(Self {
            sessions: Arc::new(SessionManager::from_config(&config.session)),
            views: Arc::new(views),
            organization_service: Arc::new(OrganizationService::new(
                storage.clone(),
                clients.dpc_api.clone(),
                deploy,
            )),
            registered_organization_service: Arc::new(RegisteredOrganizationService::new(
                storage.clone(),
                clients.dpc_api.clone(),
                deploy,
            )),
            client_token_service: Arc::new(ClientTokenService::new(
                storage.clone(),
                clients.dpc_api.clone(),
            )),
            user_service: Arc::new(UserService::new(storage.clone())),
            internal_auth_service: Arc::new(InternalAuthService::new(
                storage.clone(),
                &config.internal_auth,
                clients.github,
                clients.okta,
            )),
            app_start_time: AppStartTime {
                start_datetime: chrono::Utc::now(),
            },
            storage,
            config,
        })
    }

    /// Shared state and routes for one `App`
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::new(self.sessions.clone()))
            .app_data(web::Data::new(self.views.clone()))
            .app_data(web::Data::new(self.organization_service.clone()))
            .app_data(web::Data::new(self.registered_organization_service.clone()))
            .app_data(web::Data::new(self.client_token_service.clone()))
            .app_data(web::Data::new(self.user_service.clone()))
            .app_data(web::Data::new(self.internal_auth_service.clone()))
            .app_data(web::Data::new(self.app_start_time.clone()))
            .app_data(web::FormConfig::default().limit(64 * 1024))
            .configure(configure_routes);
    }
}

/// 检查启动前容易遗漏的配置
fn warn_on_incomplete_config(config: &AppConfig) {
    for env in [ApiEnvironment::Sandbox, ApiEnvironment::Production] {
        let endpoint = config.api.endpoint(env);
        if endpoint.base_url.is_empty() {
            warn!(
                "api.{}.base_url is not set; {} calls will fail",
                env, env
            );
        } else if endpoint.secret.is_empty() {
            warn!("api.{}.secret is not set", env);
        }
    }

    let auth = &config.internal_auth;
    match auth.provider {
        crate::config::InternalAuthProvider::Github if auth.github.team_id.is_empty() => {
            warn!("internal_auth.github.team_id is not set; no one can sign in internally");
        }
        crate::config::InternalAuthProvider::Okta if auth.okta.issuer.is_empty() => {
            warn!("internal_auth.okta.issuer is not set; internal sign-in will fail");
        }
        _ => {}
    }
}

/// 准备服务器启动的上下文
/// 包括存储（含迁移）、外部客户端与各业务 service
pub async fn prepare_server_startup(config: Arc<AppConfig>) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    warn_on_incomplete_config(&config);
    info!(
        "Deploy environment: {}, internal auth provider: {}",
        config.deploy.environment, config.internal_auth.provider
    );

    let clients = OutboundClients::from_config(&config);
    let context = StartupContext::build(config, storage, clients)?;

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}
