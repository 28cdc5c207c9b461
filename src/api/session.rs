//! Session, OAuth-state and flash cookies
//!
//! Organization users and internal staff carry separate cookies signed with
//! separate scopes, so one can never be read as the other.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::header::LOCATION;
use actix_web::{HttpMessage, HttpRequest, HttpResponse};
use serde::Serialize;
use strum::{AsRefStr, EnumString};
use tracing::{debug, trace};

use super::constants;
use super::jwt::{JwtService, SessionScope};
use crate::config::{SameSitePolicy, SessionConfig};
use crate::errors::{PortalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlashKind {
    Notice,
    Alert,
}

/// Message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn notice<T: Into<String>>(message: T) -> Self {
        Self {
            kind: FlashKind::Notice,
            message: message.into(),
        }
    }

    pub fn alert<T: Into<String>>(message: T) -> Self {
        Self {
            kind: FlashKind::Alert,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        format!(
            "{}:{}",
            self.kind.as_ref(),
            urlencoding::encode(&self.message)
        )
    }

    fn decode(raw: &str) -> Option<Self> {
        let (kind, message) = raw.split_once(':')?;
        let message = urlencoding::decode(message)
            .map(|m| m.into_owned())
            .unwrap_or_else(|_| message.to_string());
        Some(Self {
            kind: kind.parse().ok()?,
            message,
        })
    }
}

fn session_cookie_name(scope: SessionScope) -> &'static str {
    match scope {
        SessionScope::User => constants::USER_SESSION_COOKIE,
        SessionScope::InternalUser => constants::INTERNAL_SESSION_COOKIE,
    }
}

pub struct SessionManager {
    jwt: JwtService,
    same_site: SameSite,
    secure: bool,
}

impl SessionManager {
    pub fn new(jwt: JwtService, config: &SessionConfig) -> Self {
        let same_site = match config.cookie_same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
            SameSitePolicy::Lax => SameSite::Lax,
        };

        Self {
            jwt,
            same_site,
            secure: config.cookie_secure,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            JwtService::new(&config.jwt_secret, config.session_minutes),
            config,
        )
    }

    fn build_cookie_base(
        &self,
        name: &'static str,
        value: String,
        path: &'static str,
        max_age: Duration,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_path(path);
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site);
        cookie.set_max_age(max_age);
        cookie
    }

    pub fn sign_in_cookie(&self, scope: SessionScope, subject: i32) -> Result<Cookie<'static>> {
        let token = self
            .jwt
            .generate_session_token(scope, subject)
            .map_err(|e| PortalError::serialization(format!("Failed to sign session: {}", e)))?;
        Ok(self.build_cookie_base(
            session_cookie_name(scope),
            token,
            "/",
            Duration::minutes(self.jwt.session_minutes() as i64),
        ))
    }

    pub fn sign_out_cookie(&self, scope: SessionScope) -> Cookie<'static> {
        self.build_cookie_base(session_cookie_name(scope), String::new(), "/", Duration::ZERO)
    }

    /// Subject id of a valid session token
    pub fn subject(&self, token: Option<&str>, scope: SessionScope) -> Option<i32> {
        let token = token.filter(|t| !t.is_empty())?;
        match self.jwt.validate_session_token(token, scope) {
            Ok(claims) => {
                trace!("{} session validated", scope);
                claims.subject_id()
            }
            Err(e) => {
                debug!("{} session rejected: {}", scope, e);
                None
            }
        }
    }

    pub fn current(&self, req: &HttpRequest, scope: SessionScope) -> Option<i32> {
        let cookie = req.cookie(session_cookie_name(scope));
        self.subject(cookie.as_ref().map(|c| c.value()), scope)
    }

    /// 需要跟随第三方回跳发送，Strict 会被浏览器丢弃
    pub fn state_cookie(&self, state: String) -> Cookie<'static> {
        let mut cookie = self.build_cookie_base(
            constants::OAUTH_STATE_COOKIE,
            state,
            "/internal/auth",
            Duration::minutes(constants::OAUTH_STATE_MINUTES),
        );
        if self.same_site == SameSite::Strict {
            cookie.set_same_site(SameSite::Lax);
        }
        cookie
    }

    pub fn expired_state_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::OAUTH_STATE_COOKIE,
            String::new(),
            "/internal/auth",
            Duration::ZERO,
        )
    }

    pub fn flash_cookie(&self, flash: &Flash) -> Cookie<'static> {
        self.build_cookie_base(constants::FLASH_COOKIE, flash.encode(), "/", Duration::minutes(5))
    }

    pub fn expired_flash_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(constants::FLASH_COOKIE, String::new(), "/", Duration::ZERO)
    }

    /// 303 to `location`, carrying a flash for the next page
    pub fn redirect_with_flash(&self, location: &str, flash: Flash) -> HttpResponse {
        HttpResponse::SeeOther()
            .insert_header((LOCATION, location.to_string()))
            .cookie(self.flash_cookie(&flash))
            .finish()
    }
}

pub fn read_flash(req: &HttpRequest) -> Option<Flash> {
    req.cookie(constants::FLASH_COOKIE)
        .and_then(|c| Flash::decode(c.value()))
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, location.to_string()))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn manager() -> SessionManager {
        SessionManager::new(
            JwtService::new("session_test_secret_32_bytes!!!", 30),
            &SessionConfig::default(),
        )
    }

    #[test]
    fn test_flash_encoding() {
        let flash = Flash::alert("Must have admin role");
        let decoded = Flash::decode(&flash.encode()).unwrap();
        assert_eq!(decoded, flash);
        assert!(Flash::decode("bogus").is_none());
        assert!(Flash::decode("warning:hi").is_none());
    }

    #[test]
    fn test_session_cookie_is_scoped() {
        let sessions = manager();
        let cookie = sessions.sign_in_cookie(SessionScope::InternalUser, 9).unwrap();
        assert_eq!(cookie.name(), constants::INTERNAL_SESSION_COOKIE);
        assert!(cookie.http_only().unwrap_or(false));

        let req = TestRequest::default().cookie(cookie.clone()).to_http_request();
        assert_eq!(sessions.current(&req, SessionScope::InternalUser), Some(9));
        assert_eq!(sessions.current(&req, SessionScope::User), None);

        // 内部会话令牌放进用户 cookie 也无效
        let forged = Cookie::new(constants::USER_SESSION_COOKIE, cookie.value().to_string());
        let req = TestRequest::default().cookie(forged).to_http_request();
        assert_eq!(sessions.current(&req, SessionScope::User), None);
    }

    #[test]
    fn test_state_cookie_relaxes_strict_same_site() {
        let config = SessionConfig {
            cookie_same_site: SameSitePolicy::Strict,
            ..Default::default()
        };
        let sessions = SessionManager::new(JwtService::new("s", 5), &config);
        let cookie = sessions.state_cookie("abc".to_string());
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/internal/auth"));
    }
}
