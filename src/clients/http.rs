use std::time::Duration;

use tracing::warn;
use ureq::Agent;

use crate::errors::{PortalError, Result};

pub(crate) fn build_agent(timeout_secs: u64) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build()
        .into()
}

/// 在 spawn_blocking 中执行同步 HTTP 请求
pub(crate) async fn run_blocking<T, F>(operation: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        warn!("{} spawn_blocking failed: {}", operation, e);
        PortalError::external_service(format!("{} was interrupted", operation))
    })?
}

/// ureq 把非 2xx 响应也当作错误返回
pub(crate) fn request_error(operation: &str, err: ureq::Error) -> PortalError {
    match err {
        ureq::Error::StatusCode(status) => {
            PortalError::external_service(format!("{} failed with HTTP {}", operation, status))
        }
        other => PortalError::external_service(format!("{} failed: {}", operation, other)),
    }
}

pub(crate) fn decode_error(operation: &str, err: ureq::Error) -> PortalError {
    PortalError::external_service(format!("{} returned an unreadable body: {}", operation, err))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// JSON ids may arrive as numbers or strings
pub(crate) fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
