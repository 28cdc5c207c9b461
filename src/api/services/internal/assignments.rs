//! Assigning organization users

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::session::{Flash, SessionManager};
use crate::errors::{PortalError, Result};
use crate::services::OrganizationService;

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentForm {
    #[serde(default)]
    pub email: String,
}

pub async fn create(
    path: web::Path<i32>,
    form: web::Form<AssignmentForm>,
    sessions: web::Data<Arc<SessionManager>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let organization_id = *path;
    let location = format!("/internal/organizations/{}", organization_id);

    match organizations.assign_user(organization_id, &form.email).await {
        Ok(user) => Ok(sessions.redirect_with_flash(
            &location,
            Flash::notice(format!("{} assigned.", user.email)),
        )),
        Err(PortalError::Validation(message)) => {
            Ok(sessions.redirect_with_flash(&location, Flash::alert(message)))
        }
        Err(e) => Err(e),
    }
}

pub async fn delete(
    path: web::Path<(i32, i32)>,
    sessions: web::Data<Arc<SessionManager>>,
    organizations: web::Data<Arc<OrganizationService>>,
) -> Result<HttpResponse> {
    let (organization_id, user_id) = path.into_inner();
    organizations.unassign_user(organization_id, user_id).await?;

    Ok(sessions.redirect_with_flash(
        &format!("/internal/organizations/{}", organization_id),
        Flash::notice("User unassigned."),
    ))
}
