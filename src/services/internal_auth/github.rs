use super::{AuthFailure, ProviderProfile};
use crate::clients::GithubApi;

/// Signed in only when one of the user's teams has the configured id
pub(super) async fn authorize(
    api: &dyn GithubApi,
    team_id: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<ProviderProfile, AuthFailure> {
    let provider = |e: crate::errors::PortalError| AuthFailure::Provider(e.to_string());

    let token = api.exchange_code(code, redirect_uri).await.map_err(provider)?;
    let user = api.fetch_user(&token).await.map_err(provider)?;
    let teams = api.fetch_user_teams(&token).await.map_err(provider)?;

    if teams.is_empty() {
        return Err(AuthFailure::NoTeams);
    }
    let team_id = team_id.trim();
    if team_id.is_empty() || !teams.iter().any(|team| team.id == team_id) {
        return Err(AuthFailure::NotTeamMember);
    }

    let email = user
        .email
        .unwrap_or_else(|| format!("{}@users.noreply.github.com", user.login));
    Ok(ProviderProfile {
        uid: user.uid,
        email,
        name: user.name,
    })
}
