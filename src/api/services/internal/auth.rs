//! Internal staff OAuth sign-in

use actix_web::http::StatusCode;
use actix_web::http::header::LOCATION;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::constants::{INTERNAL_HOME_PATH, INTERNAL_SIGN_IN_PATH, OAUTH_STATE_COOKIE};
use crate::api::jwt::SessionScope;
use crate::api::session::{Flash, SessionManager, redirect};
use crate::api::views::{Page, Views};
use crate::config::{AppConfig, InternalAuthProvider};
use crate::errors::{PortalError, Result};
use crate::services::{AuthFailure, InternalAuthService};
use crate::utils::generate_secret;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn provider_label(provider: InternalAuthProvider) -> &'static str {
    match provider {
        InternalAuthProvider::Github => "GitHub",
        InternalAuthProvider::Okta => "Okta",
    }
}

/// Only the configured provider has routes
fn configured_provider(
    auth: &InternalAuthService,
    requested: &str,
) -> Result<InternalAuthProvider> {
    let provider = auth.provider();
    if provider.as_ref() == requested {
        Ok(provider)
    } else {
        Err(PortalError::not_found(format!(
            "Sign-in provider {} is not enabled",
            requested
        )))
    }
}

fn callback_url(config: &AppConfig, provider: InternalAuthProvider) -> String {
    format!(
        "{}/internal/auth/{}/callback",
        config.server.public_url.trim_end_matches('/'),
        provider
    )
}

pub async fn sign_in_page(
    req: HttpRequest,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
) -> Result<HttpResponse> {
    if sessions.current(&req, SessionScope::InternalUser).is_some() {
        return Ok(redirect(INTERNAL_HOME_PATH));
    }

    let provider = auth.provider();
    let page = Page::new(
        "Internal sign in",
        json!({
            "provider": provider.as_ref(),
            "provider_label": provider_label(provider),
        }),
    );
    views.respond(&req, StatusCode::OK, "internal/sign_in", page)
}

/// Start the OAuth dance; `state` round-trips through a short-lived cookie
pub async fn authorize(
    path: web::Path<String>,
    config: web::Data<Arc<AppConfig>>,
    sessions: web::Data<Arc<SessionManager>>,
    auth: web::Data<Arc<InternalAuthService>>,
) -> Result<HttpResponse> {
    let provider = configured_provider(&auth, &path)?;
    let state = generate_secret();
    let location = auth.authorize_url(&callback_url(&config, provider), &state)?;

    Ok(HttpResponse::SeeOther()
        .insert_header((LOCATION, location))
        .cookie(sessions.state_cookie(state))
        .finish())
}

pub async fn callback(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<CallbackQuery>,
    config: web::Data<Arc<AppConfig>>,
    sessions: web::Data<Arc<SessionManager>>,
    auth: web::Data<Arc<InternalAuthService>>,
) -> Result<HttpResponse> {
    let provider = configured_provider(&auth, &path)?;
    let expected_state = req.cookie(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());

    let outcome = if let Some(error) = &query.error {
        Err(AuthFailure::Provider(error.clone()))
    } else if expected_state.is_none() || query.state != expected_state {
        Err(AuthFailure::StateMismatch)
    } else {
        match query.code.as_deref().filter(|c| !c.is_empty()) {
            Some(code) => {
                auth.authenticate(code, &callback_url(&config, provider))
                    .await
            }
            None => Err(AuthFailure::Provider("missing authorization code".to_string())),
        }
    };

    match outcome {
        Ok(user) => Ok(HttpResponse::SeeOther()
            .insert_header((LOCATION, INTERNAL_HOME_PATH))
            .cookie(sessions.sign_in_cookie(SessionScope::InternalUser, user.id)?)
            .cookie(sessions.expired_state_cookie())
            .cookie(sessions.flash_cookie(&Flash::notice("Signed in successfully.")))
            .finish()),
        Err(failure) => {
            warn!("Internal sign-in via {} failed: {}", provider, failure);
            Ok(HttpResponse::SeeOther()
                .insert_header((LOCATION, INTERNAL_SIGN_IN_PATH))
                .cookie(sessions.expired_state_cookie())
                .cookie(sessions.flash_cookie(&Flash::alert(failure.user_message())))
                .finish())
        }
    }
}

pub async fn sign_out(sessions: web::Data<Arc<SessionManager>>) -> HttpResponse {
    info!("Internal user signed out");
    HttpResponse::SeeOther()
        .insert_header((LOCATION, INTERNAL_SIGN_IN_PATH))
        .cookie(sessions.sign_out_cookie(SessionScope::InternalUser))
        .cookie(sessions.flash_cookie(&Flash::notice("Signed out successfully.")))
        .finish()
}
