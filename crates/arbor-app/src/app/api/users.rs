//! API tokens of the signed-in user and global permissions of any user.

use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode};
use serde::Deserialize;

use super::{caller_is_root, object_id, parse_json_body};
use crate::db_handler::{get_session_from_depot, open_session};
use crate::error::AppResult;
use crate::middleware::context::GlobalContext;
use crate::middleware::permission::RequirePermission;
use arbor_core::constants::{USERS_ROUTE_COMPONENT, permission};
use arbor_db::model::auth_token::AuthToken;
use arbor_service::admin::{
    GlobalGrantView, GlobalPermissionInput, grant_user_global, revoke_user_global,
};
use arbor_service::auth::get_user_from_depot;
use arbor_service::auth::token::create_token;
use arbor_service::error::ServiceError;

#[derive(Debug, Default, Deserialize)]
pub struct NewTokenRequest {
    pub description: Option<String>,
}

#[handler]
async fn list_tokens(depot: &mut Depot) -> AppResult<Json<Vec<AuthToken>>> {
    let owner_id = get_user_from_depot(depot)?.id();

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    Ok(Json(store.tokens_for_user(owner_id).await?))
}

/// ## Summary
/// POST /users/self/auth_tokens - Issues a new token. The body is optional.
#[handler]
async fn issue_token(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<AuthToken>> {
    let owner_id = get_user_from_depot(depot)?.id();
    let body = if req.content_type().is_some() {
        parse_json_body(req).await?
    } else {
        NewTokenRequest::default()
    };

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let token = create_token(store, owner_id, body.description.as_deref()).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(token))
}

#[handler]
async fn revoke_token(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let owner_id = get_user_from_depot(depot)?.id();
    let token_id = req
        .param::<i32>("token_id")
        .ok_or_else(|| ServiceError::BadRequest("token_id must be an integer".to_string()))?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    if !store.delete_token(owner_id, token_id).await? {
        return Err(ServiceError::NotFound(format!("token {token_id}")).into());
    }
    tracing::info!(token_id, "Auth token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// POST /users/{object_id}/permissions - Grants a global permission to a user.
///
/// ## Errors
/// Returns 404 for an unknown user, 422 for a permission that is not global and
/// 403 when anyone but a root administrator hands out `root_administration`.
#[handler]
async fn grant_permission(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<GlobalGrantView>> {
    let user_id = object_id(req)?;
    let input: GlobalPermissionInput = parse_json_body(req).await?;
    let is_root = caller_is_root(depot)?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let grant = grant_user_global(store, user_id, input, is_root).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(grant))
}

#[handler]
async fn revoke_permission(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let user_id = object_id(req)?;
    let input: GlobalPermissionInput = parse_json_body(req).await?;
    let is_root = caller_is_root(depot)?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    revoke_user_global(store, user_id, input, is_root).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(USERS_ROUTE_COMPONENT)
        .push(
            Router::with_path("self/auth_tokens")
                .get(list_tokens)
                .post(issue_token)
                .push(Router::with_path("{token_id}").delete(revoke_token)),
        )
        .push(
            Router::with_path("{object_id}/permissions")
                .hoop(GlobalContext)
                .hoop(RequirePermission::new(permission::ADMIN_USERS))
                .post(grant_permission)
                .delete(revoke_permission),
        )
}
