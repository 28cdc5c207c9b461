//! Registering organizations in API environments

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use strum::IntoEnumIterator;

use crate::api::middleware::SessionSubject;
use crate::api::services::helpers::{environment_label, signed_in_internal_user};
use crate::api::session::{Flash, SessionManager};
use crate::api::views::{Page, Views, select_options};
use crate::errors::{PortalError, Result};
use crate::services::{
    FhirEndpointParams, InternalAuthService, OrganizationService, RegisteredOrganizationService,
};
use crate::storage::{ApiEnvironment, FhirEndpointStatus, Organization};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub api_environment: String,
    pub fhir_endpoint_name: String,
    pub fhir_endpoint_status: String,
    pub fhir_endpoint_uri: String,
}

impl RegistrationForm {
    fn endpoint(&self) -> FhirEndpointParams {
        FhirEndpointParams {
            name: Some(self.fhir_endpoint_name.clone()),
            status: Some(self.fhir_endpoint_status.clone()),
            uri: Some(self.fhir_endpoint_uri.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewRegistrationQuery {
    pub api_environment: Option<String>,
}

fn parse_env(value: &str) -> Result<ApiEnvironment> {
    value
        .trim()
        .parse()
        .map_err(|_| PortalError::not_found(format!("Unknown API environment {}", value)))
}

fn form_context(organization: &Organization, form: &RegistrationForm, editing: bool) -> Value {
    json!({
        "organization": { "id": organization.id, "name": organization.name },
        "editing": editing,
        "form": form,
        "environment_label": form
            .api_environment
            .parse::<ApiEnvironment>()
            .ok()
            .map(environment_label),
        "environments": select_options(ApiEnvironment::iter(), &form.api_environment, |env| {
            environment_label(*env).to_string()
        }),
        "statuses": select_options(
            FhirEndpointStatus::iter(),
            &form.fhir_endpoint_status,
            |s| s.as_ref().to_string(),
        ),
    })
}

fn show_path(organization_id: i32) -> String {
    format!("/internal/organizations/{}", organization_id)
}

pub async fn new_registration(
    req: HttpRequest,
    path: web::Path<i32>,
    query: web::Query<NewRegistrationQuery>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let organization = organizations.get(*path).await?;
    let form = RegistrationForm {
        api_environment: query.api_environment.clone().unwrap_or_default(),
        fhir_endpoint_status: FhirEndpointStatus::Test.as_ref().to_string(),
        ..Default::default()
    };

    let page = Page::new("Register organization", form_context(&organization, &form, false))
        .internal_user(Some(&user));
    views.respond(&req, StatusCode::OK, "internal/registered_organizations/form", page)
}

pub async fn create(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Form<RegistrationForm>,
    subject: web::ReqData<SessionSubject>,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
    registrations: web::Data<Arc<RegisteredOrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let organization = organizations.get(*path).await?;
    let form = form.into_inner();

    let registered = match form.api_environment.trim().parse::<ApiEnvironment>() {
        Ok(env) => registrations.register(organization.id, env, &form.endpoint()).await,
        Err(_) => Err(PortalError::validation(
            "Api environment is not included in the list",
        )),
    };

    match registered {
        Ok(reg) => Ok(sessions.redirect_with_flash(
            &show_path(organization.id),
            Flash::notice(format!(
                "Organization registered in {}.",
                environment_label(reg.api_env)
            )),
        )),
        Err(e @ (PortalError::Validation(_) | PortalError::ExternalService(_))) => {
            let page = Page::new("Register organization", form_context(&organization, &form, false))
                .internal_user(Some(&user))
                .flash(Flash::alert(e.message()));
            views.respond(&req, e.http_status(), "internal/registered_organizations/form", page)
        }
        Err(e) => Err(e),
    }
}

pub async fn edit(
    req: HttpRequest,
    path: web::Path<(i32, String)>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let (organization_id, env) = path.into_inner();
    let env = parse_env(&env)?;

    let profile = organizations.profile(organization_id).await?;
    let reg = profile.registered_organization(env).ok_or_else(|| {
        PortalError::not_found(format!("Organization is not registered in {}", env))
    })?;
    let form = RegistrationForm {
        api_environment: env.as_ref().to_string(),
        fhir_endpoint_name: reg.fhir_endpoint.name.clone(),
        fhir_endpoint_status: reg.fhir_endpoint.status.as_ref().to_string(),
        fhir_endpoint_uri: reg.fhir_endpoint.uri.clone(),
    };

    let page = Page::new(
        "Edit registration",
        form_context(&profile.organization, &form, true),
    )
    .internal_user(Some(&user));
    views.respond(&req, StatusCode::OK, "internal/registered_organizations/form", page)
}

pub async fn update(
    req: HttpRequest,
    path: web::Path<(i32, String)>,
    form: web::Form<RegistrationForm>,
    subject: web::ReqData<SessionSubject>,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
    registrations: web::Data<Arc<RegisteredOrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let (organization_id, env) = path.into_inner();
    let env = parse_env(&env)?;
    let mut form = form.into_inner();
    form.api_environment = env.as_ref().to_string();

    match registrations
        .update_endpoint(organization_id, env, &form.endpoint())
        .await
    {
        Ok(_) => Ok(sessions.redirect_with_flash(
            &show_path(organization_id),
            Flash::notice(format!(
                "{} FHIR endpoint updated.",
                environment_label(env)
            )),
        )),
        Err(e @ (PortalError::Validation(_) | PortalError::ExternalService(_))) => {
            let organization = organizations.get(organization_id).await?;
            let page = Page::new("Edit registration", form_context(&organization, &form, true))
                .internal_user(Some(&user))
                .flash(Flash::alert(e.message()));
            views.respond(&req, e.http_status(), "internal/registered_organizations/form", page)
        }
        Err(e) => Err(e),
    }
}

pub async fn delete(
    path: web::Path<(i32, String)>,
    sessions: web::Data<Arc<SessionManager>>,
    registrations: web::Data<Arc<RegisteredOrganizationService>>,
) -> Result<HttpResponse> {
    let (organization_id, env) = path.into_inner();
    let env = parse_env(&env)?;

    match registrations.unregister(organization_id, env).await {
        Ok(()) => Ok(sessions.redirect_with_flash(
            &show_path(organization_id),
            Flash::notice(format!(
                "Organization unregistered from {}.",
                environment_label(env)
            )),
        )),
        Err(PortalError::ExternalService(message)) => Ok(sessions.redirect_with_flash(
            &show_path(organization_id),
            Flash::alert(message),
        )),
        Err(e) => Err(e),
    }
}
