use super::{AuthFailure, ProviderProfile};
use crate::clients::OktaApi;

/// Signed in only when the roles claim contains the admin role
pub(super) async fn authorize(
    api: &dyn OktaApi,
    admin_role: &str,
    roles_claim: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<ProviderProfile, AuthFailure> {
    let provider = |e: crate::errors::PortalError| AuthFailure::Provider(e.to_string());

    let token = api.exchange_code(code, redirect_uri).await.map_err(provider)?;
    let info = api.fetch_userinfo(&token).await.map_err(provider)?;

    if !info.roles(roles_claim).iter().any(|role| role == admin_role) {
        return Err(AuthFailure::MissingAdminRole);
    }

    let email = info
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthFailure::Provider("userinfo has no email".to_string()))?;
    Ok(ProviderProfile {
        uid: info.sub,
        email,
        name: info.name,
    })
}
