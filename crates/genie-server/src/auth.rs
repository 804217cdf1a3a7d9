//! Identity Extraction
//!
//! The identity provider sits upstream (reverse proxy / auth gateway)
//! and passes the authenticated user through as headers: an opaque
//! `x-user-id` and an optional `x-user-email`. The extractor rejects
//! requests without an id and provisions the account row the first
//! time a user is seen.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::Utc;

use genie_core::{Datastore, UserAccount, UserId};

use crate::handlers::ErrorResponse;
use crate::state::AppState;

/// The authenticated user behind a request
pub struct AuthedUser {
    pub id: UserId,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Authentication required".into(),
                        code: "UNAUTHENTICATED".into(),
                    }),
                )
            })?;

        let email = parts
            .headers
            .get("x-user-email")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(String::from);

        let user_id = UserId::from_string(id);
        provision(state, &user_id, email.as_deref()).map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Account provisioning failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.user_message().into(),
                    code: "STORAGE_ERROR".into(),
                }),
            )
        })?;

        Ok(AuthedUser { id: user_id, email })
    }
}

/// Create the account row on first sight; pick up the email if the
/// identity layer started supplying one later.
fn provision(
    state: &AppState,
    user_id: &UserId,
    email: Option<&str>,
) -> genie_core::Result<()> {
    match state.store.account(user_id)? {
        None => {
            let now = Utc::now();
            let account = match email {
                Some(email) => UserAccount::with_email(user_id.clone(), email, now),
                None => UserAccount::new(user_id.clone(), now),
            };
            state.store.put_account(&account)?;
            tracing::info!(user_id = %user_id, "Provisioned new account");
        }
        Some(account) if account.email.is_none() && email.is_some() => {
            let email = email.map(String::from);
            state.store.update_account(user_id, &mut |a| {
                a.email = email.clone();
            })?;
        }
        Some(_) => {}
    }
    Ok(())
}
