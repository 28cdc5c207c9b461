use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use ureq::Agent;
use url::Url;

use super::http::{build_agent, decode_error, id_string, join_url, request_error, run_blocking};
use crate::config::GithubAuthConfig;
use crate::errors::{PortalError, Result};

const OAUTH_SCOPE: &str = "read:org user:email";
const USER_AGENT: &str = concat!("dpc-portal/", env!("CARGO_PKG_VERSION"));
const TEAMS_PER_PAGE: usize = 100;
const MAX_TEAM_PAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubUser {
    pub uid: String,
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubTeam {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Deserialize)]
struct RawUser {
    id: Value,
    login: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawTeam {
    id: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[async_trait]
pub trait GithubApi: Send + Sync {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String>;

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String>;

    async fn fetch_user(&self, access_token: &str) -> Result<GithubUser>;

    /// `GET /user/teams`, every page
    async fn fetch_user_teams(&self, access_token: &str) -> Result<Vec<GithubTeam>>;
}

pub struct UreqGithubApi {
    agent: Agent,
    config: GithubAuthConfig,
}

impl UreqGithubApi {
    pub fn new(config: &GithubAuthConfig, timeout_secs: u64) -> Self {
        Self {
            agent: build_agent(timeout_secs),
            config: config.clone(),
        }
    }

    async fn get_json(&self, operation: &'static str, path: &str, token: &str) -> Result<Value> {
        let agent = self.agent.clone();
        let url = join_url(&self.config.api_url, path);
        let authorization = format!("Bearer {}", token);

        run_blocking(operation, move || {
            agent
                .get(&url)
                .header("Authorization", &authorization)
                .header("Accept", "application/vnd.github+json")
                .header("User-Agent", USER_AGENT)
                .call()
                .map_err(|e| request_error(operation, e))?
                .into_body()
                .read_json::<Value>()
                .map_err(|e| decode_error(operation, e))
        })
        .await
    }
}

fn parse_user(value: Value) -> Result<GithubUser> {
    let raw: RawUser = serde_json::from_value(value)?;
    let uid = id_string(&raw.id)
        .ok_or_else(|| PortalError::external_service("GitHub user has no id"))?;
    Ok(GithubUser {
        uid,
        login: raw.login,
        email: raw.email.filter(|e| !e.is_empty()),
        name: raw.name.filter(|n| !n.is_empty()),
    })
}

fn parse_teams(value: Value) -> Result<Vec<GithubTeam>> {
    let raw: Vec<RawTeam> = serde_json::from_value(value)?;
    Ok(raw
        .into_iter()
        .filter_map(|team| {
            id_string(&team.id).map(|id| GithubTeam {
                id,
                name: team.name,
                slug: team.slug,
            })
        })
        .collect())
}

#[async_trait]
impl GithubApi for UreqGithubApi {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let base = join_url(&self.config.oauth_url, "login/oauth/authorize");
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", OAUTH_SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| PortalError::config(format!("Invalid GitHub oauth_url: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String> {
        let agent = self.agent.clone();
        let url = join_url(&self.config.oauth_url, "login/oauth/access_token");
        let form = [
            ("client_id", self.config.client_id.clone()),
            ("client_secret", self.config.client_secret.clone()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ];

        let response = run_blocking("GitHub token exchange", move || {
            agent
                .post(&url)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_form(form)
                .map_err(|e| request_error("GitHub token exchange", e))?
                .into_body()
                .read_json::<TokenResponse>()
                .map_err(|e| decode_error("GitHub token exchange", e))
        })
        .await?;

        // GitHub 在 200 响应里返回 error 字段
        match response {
            TokenResponse {
                access_token: Some(token),
                ..
            } if !token.is_empty() => Ok(token),
            TokenResponse {
                error,
                error_description,
                ..
            } => Err(PortalError::external_service(format!(
                "GitHub token exchange rejected: {}",
                error_description
                    .or(error)
                    .unwrap_or_else(|| "no access token".to_string())
            ))),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GithubUser> {
        let value = self.get_json("GitHub user", "user", access_token).await?;
        parse_user(value)
    }

    async fn fetch_user_teams(&self, access_token: &str) -> Result<Vec<GithubTeam>> {
        let mut teams = Vec::new();
        for page in 1..=MAX_TEAM_PAGES {
            let path = format!("user/teams?per_page={}&page={}", TEAMS_PER_PAGE, page);
            let value = self.get_json("GitHub teams", &path, access_token).await?;
            let page_len = value.as_array().map_or(0, Vec::len);
            teams.extend(parse_teams(value)?);

            // 不足一页即为最后一页
            if page_len < TEAMS_PER_PAGE {
                return Ok(teams);
            }
        }

        warn!(
            "GitHub teams truncated after {} pages ({} teams)",
            MAX_TEAM_PAGES,
            teams.len()
        );
        Ok(teams)
    }
}
