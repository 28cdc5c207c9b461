use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Which principal a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionScope {
    User,
    InternalUser,
}

/// Session Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub scope: SessionScope,
}

impl SessionClaims {
    pub fn subject_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// JWT Service for signing and validating session cookies
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_minutes: u64,
}

impl JwtService {
    pub fn new(secret: &str, session_minutes: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_minutes,
        }
    }

    pub fn session_minutes(&self) -> u64 {
        self.session_minutes
    }

    pub fn generate_session_token(
        &self,
        scope: SessionScope,
        subject: i32,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.session_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            scope,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a session token issued for `scope`
    pub fn validate_session_token(
        &self,
        token: &str,
        scope: SessionScope,
    ) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())?;

        // 用户会话与内部会话互不通用
        if token_data.claims.scope != scope {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }

        Ok(token_data.claims)
    }
}
