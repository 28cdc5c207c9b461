//! Client token issuance for organization users
//!
//! The raw token is only part of the response to the create request.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use super::helpers::{environment_label, signed_in_user};
use crate::api::middleware::{SessionGuard, SessionSubject};
use crate::api::session::Flash;
use crate::api::views::{Page, Views, display_timestamp, select_options};
use crate::errors::{PortalError, Result};
use crate::services::{ClientTokenService, OrganizationService, UserService};
use crate::storage::{ApiEnvironment, OrganizationProfile, User};

#[derive(Debug, Default, Deserialize)]
pub struct ClientTokenForm {
    #[serde(default)]
    pub api_environment: String,
    #[serde(default)]
    pub label: String,
}

/// The user must be assigned and the organization registered somewhere
async fn credentialable_profile(
    users: &UserService,
    organizations: &OrganizationService,
    user: &User,
    organization_id: i32,
) -> Result<OrganizationProfile> {
    if !users.is_assigned(user.id, organization_id).await? {
        warn!(
            "User {} tried to manage tokens of organization {}",
            user.id, organization_id
        );
        return Err(PortalError::forbidden(
            "You are not assigned to this organization",
        ));
    }

    let profile = organizations.profile(organization_id).await?;
    if !profile.api_credentialable() {
        return Err(PortalError::forbidden(
            "Organization is not registered with the API yet",
        ));
    }
    Ok(profile)
}

fn form_context(profile: &OrganizationProfile, form: &ClientTokenForm) -> Value {
    json!({
        "organization": {
            "id": profile.organization.id,
            "name": profile.organization.name,
        },
        "environments": select_options(
            profile.registered_api_envs(),
            &form.api_environment,
            |env| environment_label(*env).to_string(),
        ),
        "label": form.label,
    })
}

pub async fn new_client_token(
    req: HttpRequest,
    path: web::Path<i32>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    users: web::Data<Arc<UserService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_user(&users, &subject).await?;
    let profile = credentialable_profile(&users, &organizations, &user, *path).await?;

    let page = Page::new(
        "New client token",
        form_context(&profile, &ClientTokenForm::default()),
    )
    .user(Some(&user));
    views.respond(&req, StatusCode::OK, "client_tokens/new", page)
}

pub async fn create_client_token(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Form<ClientTokenForm>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    users: web::Data<Arc<UserService>>,
    organizations: web::Data<Arc<OrganizationService>>,
    tokens: web::Data<Arc<ClientTokenService>>,
) -> Result<HttpResponse> {
    let user = signed_in_user(&users, &subject).await?;
    let profile = credentialable_profile(&users, &organizations, &user, *path).await?;

    let created = match form.api_environment.trim().parse::<ApiEnvironment>() {
        Ok(env) => tokens
            .create(profile.organization.id, env, &form.label)
            .await
            .map(|token| (env, token)),
        Err(_) => Err(PortalError::validation(
            "Api environment is not included in the list",
        )),
    };

    match created {
        Ok((env, token)) => {
            info!(
                "User {} created client token '{}' for organization {}",
                user.id, token.label, profile.organization.id
            );
            let page = Page::new(
                "Client token created",
                json!({
                    "organization": {
                        "id": profile.organization.id,
                        "name": profile.organization.name,
                    },
                    "environment_label": environment_label(env),
                    "token": {
                        "token": token.token,
                        "label": token.label,
                        "created_on": display_timestamp(&token.created_at),
                    },
                }),
            )
            .user(Some(&user));
            views.respond(&req, StatusCode::CREATED, "client_tokens/show", page)
        }
        // 校验失败和令牌服务错误都回到表单展示
        Err(e) if e.is_user_facing() => {
            let page = Page::new("New client token", form_context(&profile, &form))
                .user(Some(&user))
                .flash(Flash::alert(e.message()));
            views.respond(&req, e.http_status(), "client_tokens/new", page)
        }
        Err(e) => Err(e),
    }
}

pub fn client_token_routes() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<
            actix_web::body::EitherBody<actix_web::body::BoxBody>,
        >,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("/organizations")
        .wrap(SessionGuard::user())
        .route("/{id}/client_tokens/new", web::get().to(new_client_token))
        .route("/{id}/client_tokens", web::post().to(create_client_token))
}
