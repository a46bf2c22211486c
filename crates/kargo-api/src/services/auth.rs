//! Authentication service
//!
//! Login failures are uniform: the caller cannot tell a missing account
//! from a wrong password or a deactivated agency.

use crate::state::AppState;
use kargo_core::auth::{verify_password, Claims};
use kargo_core::entities::agency::{Agency, PublicAgency};
use kargo_core::errors::{CoreError, CoreResult};
use kargo_db::repositories::AgencyRepository;
use tracing::info;

const LOGIN_FAILED: &str = "invalid email or password";

/// Verify credentials and issue a session token.
pub async fn login(state: &AppState, email: &str, password: &str) -> CoreResult<(String, Agency)> {
    let repo = AgencyRepository::new(&state.adapter);
    let agency = repo
        .find_by_email(email)
        .await?
        .ok_or_else(|| CoreError::unauthenticated(LOGIN_FAILED))?;

    if !agency.is_active || !verify_password(password, &agency.password_hash) {
        return Err(CoreError::unauthenticated(LOGIN_FAILED));
    }

    let (token, _claims) = state.tokens.issue(agency.id, &agency.email, agency.role)?;
    info!(agency_id = agency.id, "login successful");
    Ok((token, agency))
}

/// Revoke the session server-side.
pub fn logout(state: &AppState, claims: &Claims) {
    state.revocations.revoke(&claims.jti, claims.exp);
    info!(agency_id = claims.sub, "session revoked");
}

/// Join-by-code: public agency metadata for a valid code, nothing else.
pub async fn join_by_code(state: &AppState, code: &str) -> CoreResult<Option<PublicAgency>> {
    let repo = AgencyRepository::new(&state.adapter);
    let agency = repo.get_by_code(code).await?;
    Ok(agency.filter(Agency::is_active).map(|a| a.public_view()))
}
