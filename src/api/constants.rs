//! Cookie 名称与路由常量

/// Organization user session
pub const USER_SESSION_COOKIE: &str = "dpc_user_session";

/// Internal staff session
pub const INTERNAL_SESSION_COOKIE: &str = "dpc_internal_session";

/// OAuth `state` round-trip
pub const OAUTH_STATE_COOKIE: &str = "dpc_oauth_state";

/// One-shot flash message
pub const FLASH_COOKIE: &str = "dpc_flash";

/// OAuth state cookie lifetime
pub const OAUTH_STATE_MINUTES: i64 = 10;

pub const USER_SIGN_IN_PATH: &str = "/users/sign_in";
pub const INTERNAL_SIGN_IN_PATH: &str = "/internal/sign_in";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const INTERNAL_HOME_PATH: &str = "/internal/organizations";
