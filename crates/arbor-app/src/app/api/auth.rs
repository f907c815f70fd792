//! Ticket sign-in and sign-out.

use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode};
use serde::Deserialize;

use crate::config::{get_config_from_depot, get_selector_from_depot};
use crate::db_handler::{get_session_from_depot, open_session};
use super::parse_json_body;
use crate::error::AppResult;
use arbor_service::auth::password::verify_password;
use arbor_service::auth::{RequestCredentials, RequestUser};
use arbor_service::error::ServiceError;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub user_name: String,
    pub password: String,
}

/// ## Summary
/// POST /auth/sign_in - Verifies credentials and remembers the user through the selected policy.
///
/// ## Side Effects
/// Sets the ticket cookie when the ticket policy handles the request.
///
/// ## Errors
/// Returns HTTP 401 for an unknown user or a wrong password.
#[handler]
async fn sign_in(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<RequestUser>> {
    let body: SignInRequest = parse_json_body(req).await?;
    let config = get_config_from_depot(depot)?;
    let credentials = RequestCredentials::from_request(req, &config.auth);

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;

    let Some(user) = store.user_by_name(&body.user_name).await? else {
        tracing::debug!(user_name = %body.user_name, "Sign in for unknown user");
        return Err(ServiceError::NotAuthenticated.into());
    };
    verify_password(&body.password, &user.password_hash)?;
    let user = RequestUser::load(store, user.id)
        .await?
        .ok_or(ServiceError::NotAuthenticated)?;

    for cookie in get_selector_from_depot(depot)?.remember(&credentials, user.id())? {
        res.add_cookie(cookie);
    }
    tracing::info!(user_id = user.id(), "User signed in");
    Ok(Json(user))
}

/// ## Summary
/// POST /auth/sign_out - Forgets the request's ticket.
#[handler]
async fn sign_out(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let config = get_config_from_depot(depot)?;
    let credentials = RequestCredentials::from_request(req, &config.auth);
    for cookie in get_selector_from_depot(depot)?.forget(&credentials)? {
        res.add_cookie(cookie);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("auth")
        .push(Router::with_path("sign_in").post(sign_in))
        .push(Router::with_path("sign_out").post(sign_out))
}
