//! Organization user sign-in, sign-up and dashboard

use actix_web::http::StatusCode;
use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::helpers::{organization_summary, signed_in_user, token_listing};
use crate::api::constants::{DASHBOARD_PATH, USER_SIGN_IN_PATH};
use crate::api::jwt::SessionScope;
use crate::api::middleware::SessionSubject;
use crate::api::session::{Flash, SessionManager, redirect};
use crate::api::views::{Page, Views};
use crate::errors::{PortalError, Result};
use crate::services::{
    ClientTokenService, InternalAuthService, OrganizationService, SignUpParams, UserService,
};
use crate::storage::InternalUser;

const INTERNAL_SESSION_ACTIVE: &str =
    "You are signed in as an internal user. Sign out before signing in as an organization user.";

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn internal_session_user(
    req: &HttpRequest,
    sessions: &SessionManager,
    auth: &InternalAuthService,
) -> Result<Option<InternalUser>> {
    match sessions.current(req, SessionScope::InternalUser) {
        Some(id) => auth.find_user(id).await,
        None => Ok(None),
    }
}

/// 内部会话存在时不渲染用户登录表单，只保留内部登出入口
pub async fn sign_in_page(
    req: HttpRequest,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
) -> Result<HttpResponse> {
    if sessions.current(&req, SessionScope::User).is_some() {
        return Ok(redirect(DASHBOARD_PATH));
    }

    let internal = internal_session_user(&req, &sessions, &auth).await?;
    let page = Page::new("Sign in", json!({ "email": "" })).internal_user(internal.as_ref());
    views.respond(&req, StatusCode::OK, "users/sign_in", page)
}

pub async fn sign_in(
    req: HttpRequest,
    form: web::Form<SignInForm>,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse> {
    if sessions.current(&req, SessionScope::InternalUser).is_some() {
        warn!("Organization sign-in refused: internal session present");
        return Ok(sessions
            .redirect_with_flash(USER_SIGN_IN_PATH, Flash::alert(INTERNAL_SESSION_ACTIVE)));
    }

    match users.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            info!("User {} signed in", user.id);
            Ok(HttpResponse::SeeOther()
                .insert_header((LOCATION, DASHBOARD_PATH))
                .cookie(sessions.sign_in_cookie(SessionScope::User, user.id)?)
                .cookie(sessions.flash_cookie(&Flash::notice("Signed in successfully.")))
                .finish())
        }
        Err(PortalError::Unauthorized(message)) => {
            let page = Page::new("Sign in", json!({ "email": form.email.trim() }))
                .flash(Flash::alert(message));
            views.respond(&req, StatusCode::UNAUTHORIZED, "users/sign_in", page)
        }
        Err(e) => Err(e),
    }
}

/// 与登录页相同：内部会话期间不渲染注册表单
pub async fn sign_up_page(
    req: HttpRequest,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
) -> Result<HttpResponse> {
    if sessions.current(&req, SessionScope::User).is_some() {
        return Ok(redirect(DASHBOARD_PATH));
    }

    let internal = internal_session_user(&req, &sessions, &auth).await?;
    let page = Page::new(
        "Sign up",
        json!({ "email": "", "first_name": "", "last_name": "" }),
    )
    .internal_user(internal.as_ref());
    views.respond(&req, StatusCode::OK, "users/sign_up", page)
}

pub async fn sign_up(
    req: HttpRequest,
    form: web::Form<SignUpParams>,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    users: web::Data<Arc<UserService>>,
) -> Result<HttpResponse> {
    if sessions.current(&req, SessionScope::InternalUser).is_some() {
        return Ok(sessions
            .redirect_with_flash(USER_SIGN_IN_PATH, Flash::alert(INTERNAL_SESSION_ACTIVE)));
    }

    let params = form.into_inner();
    let echo = json!({
        "email": params.email.trim(),
        "first_name": params.first_name.trim(),
        "last_name": params.last_name.trim(),
    });

    match users.sign_up(params).await {
        Ok(user) => Ok(HttpResponse::SeeOther()
            .insert_header((LOCATION, DASHBOARD_PATH))
            .cookie(sessions.sign_in_cookie(SessionScope::User, user.id)?)
            .cookie(sessions.flash_cookie(&Flash::notice(
                "Welcome! You have signed up successfully.",
            )))
            .finish()),
        Err(PortalError::Validation(message)) => {
            let page = Page::new("Sign up", echo).flash(Flash::alert(message));
            views.respond(&req, StatusCode::UNPROCESSABLE_ENTITY, "users/sign_up", page)
        }
        Err(e) => Err(e),
    }
}

pub async fn sign_out(sessions: web::Data<Arc<SessionManager>>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, USER_SIGN_IN_PATH))
        .cookie(sessions.sign_out_cookie(SessionScope::User))
        .cookie(sessions.flash_cookie(&Flash::notice("Signed out successfully.")))
        .finish()
}

/// Organizations of the signed-in user with their client tokens
pub async fn dashboard(
    req: HttpRequest,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    users: web::Data<Arc<UserService>>,
    organizations: web::Data<Arc<OrganizationService>>,
    tokens: web::Data<Arc<ClientTokenService>>,
) -> Result<HttpResponse> {
    let user = signed_in_user(&users, &subject).await?;
    let ids = users.organization_ids(user.id).await?;

    let mut cards = Vec::new();
    for profile in organizations.profiles(&ids).await? {
        let environments = tokens.list(&profile.registered_organizations).await?;
        let mut card = organization_summary(&profile);
        card["environments"] = token_listing(&environments);
        cards.push(card);
    }

    let page = Page::new("Dashboard", json!({ "organizations": cards })).user(Some(&user));
    views.respond(&req, StatusCode::OK, "dashboard", page)
}

pub fn user_routes() -> actix_web::Scope {
    web::scope("/users")
        .route("/sign_in", web::get().to(sign_in_page))
        .route("/sign_in", web::post().to(sign_in))
        .route("/sign_up", web::get().to(sign_up_page))
        .route("/sign_up", web::post().to(sign_up))
        .route("/sign_out", web::post().to(sign_out))
}
