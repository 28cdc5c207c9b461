use std::path::Path;

use crate::errors::{PortalError, Result};

use super::AppConfig;

/// Environment variables the deployment scripts already set, mapped onto
/// configuration keys. They win over both the TOML file and `DPC__*`.
pub const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.database_url"),
    ("DEPLOY_ENV", "deploy.environment"),
    ("INTERNAL_AUTH_PROVIDER", "internal_auth.provider"),
    ("GITHUB_ORG_TEAM_ID", "internal_auth.github.team_id"),
    ("OKTA_ADMIN_ROLE", "internal_auth.okta.admin_role"),
    ("API_METADATA_URL_SANDBOX", "api.sandbox.base_url"),
    ("API_METADATA_URL_PRODUCTION", "api.production.base_url"),
    ("GOLDEN_MACAROON_SANDBOX", "api.sandbox.secret"),
    ("GOLDEN_MACAROON_PRODUCTION", "api.production.secret"),
];

/// Older deployments only export `AWS_ENV`; used when `DEPLOY_ENV` is absent
const AWS_ENV_FALLBACK: &str = "AWS_ENV";

pub fn system_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：旧版环境变量 > DPC__* > config.toml > 默认值
    /// 示例：DPC__SERVER__PORT=3000
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with_env(path, system_env)
    }

    /// Same as [`AppConfig::load`] with an injectable lookup for the legacy variables
    pub fn load_with_env<F>(path: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let mut builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 DPC，分隔符 __
            .add_source(
                Environment::with_prefix("DPC")
                    .separator("__")
                    .try_parsing(true),
            );

        // 3. 旧版环境变量
        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, lookup(var))?;
        }
        if lookup("DEPLOY_ENV").is_none()
            && let Some(aws_env) = lookup(AWS_ENV_FALLBACK)
        {
            eprintln!(
                "[WARN] DEPLOY_ENV is not set, falling back to AWS_ENV={}",
                aws_env
            );
            builder = builder.set_override("deploy.environment", aws_env)?;
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }

        if config.session.jwt_secret.is_empty() {
            eprintln!("[WARN] session.jwt_secret is empty, sessions will not survive a restart");
            config.session.jwt_secret = crate::utils::generate_secret();
        }

        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("# Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PortalError::serialization(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}
