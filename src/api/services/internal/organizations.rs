//! Organization management for internal staff

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use strum::IntoEnumIterator;

use crate::api::middleware::SessionSubject;
use crate::api::services::helpers::{
    environment_label, organization_summary, signed_in_internal_user,
};
use crate::api::session::{Flash, SessionManager};
use crate::api::views::{Page, Views, select_options};
use crate::errors::{PortalError, Result};
use crate::services::{
    AddressParams, InternalAuthService, OrganizationParams, OrganizationService,
};
use crate::storage::{
    Address, AddressType, AddressUse, ApiEnvironment, InternalUser, OrganizationKind,
    OrganizationProfile, OrganizationType,
};

/// Flat form fields; the address is nested into [`AddressParams`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationForm {
    pub name: String,
    pub organization_type: String,
    pub npi: String,
    pub address_street: String,
    pub address_street_2: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zip: String,
    pub address_type: String,
    pub address_use: String,
}

impl OrganizationForm {
    pub fn from_profile(profile: &OrganizationProfile) -> Self {
        let organization = &profile.organization;
        let address = profile.address.as_ref();
        let field = |f: fn(&Address) -> String| address.map(f).unwrap_or_default();

        Self {
            name: organization.name.clone(),
            organization_type: organization.organization_type.as_ref().to_string(),
            npi: organization.npi.clone().unwrap_or_default(),
            address_street: field(|a| a.street.clone()),
            address_street_2: field(|a| a.street_2.clone().unwrap_or_default()),
            address_city: field(|a| a.city.clone()),
            address_state: field(|a| a.state.clone()),
            address_zip: field(|a| a.zip.clone()),
            address_type: field(|a| a.address_type.as_ref().to_string()),
            address_use: field(|a| a.address_use.as_ref().to_string()),
        }
    }

    pub fn into_params(self) -> OrganizationParams {
        OrganizationParams {
            name: self.name,
            organization_type: self.organization_type,
            npi: Some(self.npi),
            address: AddressParams {
                street: Some(self.address_street),
                street_2: Some(self.address_street_2),
                city: Some(self.address_city),
                state: Some(self.address_state),
                zip: Some(self.address_zip),
                address_type: Some(self.address_type),
                address_use: Some(self.address_use),
            },
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn form_context(form: &OrganizationForm, organization_id: Option<i32>) -> Value {
    json!({
        "organization_id": organization_id,
        "form": form,
        "organization_types": select_options(
            OrganizationType::iter(),
            &form.organization_type,
            |t| t.label().to_string(),
        ),
        "address_types": select_options(AddressType::iter(), &form.address_type, |t| {
            capitalize(t.as_ref())
        }),
        "address_uses": select_options(AddressUse::iter(), &form.address_use, |u| {
            capitalize(u.as_ref())
        }),
    })
}

fn form_page(
    title: &str,
    form: &OrganizationForm,
    organization_id: Option<i32>,
    user: &InternalUser,
) -> Page {
    Page::new(title, form_context(form, organization_id)).internal_user(Some(user))
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub kind: Option<String>,
}

pub async fn index(
    req: HttpRequest,
    query: web::Query<IndexQuery>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let kind = query
        .kind
        .as_deref()
        .and_then(|k| k.parse::<OrganizationKind>().ok());

    let rows: Vec<Value> = organizations
        .list(kind)
        .await?
        .iter()
        .map(|org| {
            json!({
                "id": org.id,
                "name": org.name,
                "type_label": org.organization_type.label(),
                "npi": org.npi,
                "sandbox_id": org.sandbox_id,
            })
        })
        .collect();

    let page = Page::new(
        "Organizations",
        json!({
            "organizations": rows,
            "kind": kind.map(|k| k.as_ref().to_string()),
        }),
    )
    .internal_user(Some(&user));
    views.respond(&req, StatusCode::OK, "internal/organizations/index", page)
}

pub async fn new_organization(
    req: HttpRequest,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let page = form_page("New organization", &OrganizationForm::default(), None, &user);
    views.respond(&req, StatusCode::OK, "internal/organizations/new", page)
}

pub async fn create(
    req: HttpRequest,
    form: web::Form<OrganizationForm>,
    subject: web::ReqData<SessionSubject>,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let form = form.into_inner();

    match organizations.create(form.clone().into_params()).await {
        Ok(profile) => Ok(sessions.redirect_with_flash(
            &format!("/internal/organizations/{}", profile.organization.id),
            Flash::notice("Organization created."),
        )),
        Err(PortalError::Validation(message)) => {
            let page =
                form_page("New organization", &form, None, &user).flash(Flash::alert(message));
            views.respond(
                &req,
                StatusCode::UNPROCESSABLE_ENTITY,
                "internal/organizations/new",
                page,
            )
        }
        Err(e) => Err(e),
    }
}

pub async fn show(
    req: HttpRequest,
    path: web::Path<i32>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let profile = organizations.profile(*path).await?;
    let assigned = organizations.assigned_users(*path).await?;

    let registrations: Vec<Value> = profile
        .registered_organizations
        .iter()
        .map(|reg| {
            json!({
                "api_environment": reg.api_env.as_ref(),
                "environment_label": environment_label(reg.api_env),
                "api_id": reg.api_id,
                "fhir_endpoint": reg.fhir_endpoint,
            })
        })
        .collect();
    let unregistered: Vec<Value> = ApiEnvironment::iter()
        .filter(|env| profile.registered_organization(*env).is_none())
        .map(|env| json!({ "value": env.as_ref(), "label": environment_label(env) }))
        .collect();
    let users: Vec<Value> = assigned
        .iter()
        .map(|u| json!({ "id": u.id, "email": u.email, "name": u.full_name() }))
        .collect();

    let page = Page::new(
        profile.organization.name.clone(),
        json!({
            "organization": organization_summary(&profile),
            "address": profile.address,
            "address_type": profile.address_type().map(|t| capitalize(t.as_ref())),
            "address_use": profile.address_use().map(|u| capitalize(u.as_ref())),
            "registrations": registrations,
            "unregistered_envs": unregistered,
            "users": users,
        }),
    )
    .internal_user(Some(&user));
    views.respond(&req, StatusCode::OK, "internal/organizations/show", page)
}

pub async fn edit(
    req: HttpRequest,
    path: web::Path<i32>,
    subject: web::ReqData<SessionSubject>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let profile = organizations.profile(*path).await?;
    let form = OrganizationForm::from_profile(&profile);

    let page = form_page("Edit organization", &form, Some(*path), &user);
    views.respond(&req, StatusCode::OK, "internal/organizations/edit", page)
}

/// Registered organizations are updated in the same request; a failure keeps the old values
pub async fn update(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Form<OrganizationForm>,
    subject: web::ReqData<SessionSubject>,
    sessions: web::Data<Arc<SessionManager>>,
    views: web::Data<Arc<Views>>,
    auth: web::Data<Arc<InternalAuthService>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let user = signed_in_internal_user(&auth, &subject).await?;
    let id = *path;
    let form = form.into_inner();

    match organizations.update(id, form.clone().into_params()).await {
        Ok(_) => Ok(sessions.redirect_with_flash(
            &format!("/internal/organizations/{}", id),
            Flash::notice("Organization updated."),
        )),
        Err(e @ (PortalError::Validation(_) | PortalError::ExternalService(_))) => {
            let page = form_page("Edit organization", &form, Some(id), &user)
                .flash(Flash::alert(e.message()));
            views.respond(&req, e.http_status(), "internal/organizations/edit", page)
        }
        Err(e) => Err(e),
    }
}

pub async fn delete(
    path: web::Path<i32>,
    sessions: web::Data<Arc<SessionManager>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    organizations.delete(*path).await?;
    Ok(sessions.redirect_with_flash(
        "/internal/organizations",
        Flash::notice("Organization deleted."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_address_fields_stay_blank() {
        let form = OrganizationForm {
            name: "Acme Clinic".to_string(),
            organization_type: "urgent_care".to_string(),
            ..Default::default()
        };
        let params = form.into_params();
        assert!(params.address.is_all_blank());
        assert_eq!(params.npi.as_deref(), Some(""));
    }

    #[test]
    fn test_form_context_selects_current_type() {
        let form = OrganizationForm {
            organization_type: "health_it_vendor".to_string(),
            address_use: "billing".to_string(),
            ..Default::default()
        };
        let context = form_context(&form, Some(3));
        let selected: Vec<&Value> = context["organization_types"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|o| o["selected"] == true)
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0]["label"], "Health IT Vendor");
        assert_eq!(context["organization_id"], 3);
        assert!(
            context["address_uses"]
                .as_array()
                .unwrap()
                .iter()
                .any(|o| o["label"] == "Billing" && o["selected"] == true)
        );
    }
}
