//! Global permissions and membership of groups.

use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode};

use super::{caller_is_root, object_id, parse_json_body};
use crate::db_handler::{get_session_from_depot, open_session};
use crate::error::AppResult;
use crate::middleware::context::GlobalContext;
use crate::middleware::permission::RequirePermission;
use arbor_core::constants::{GROUPS_ROUTE_COMPONENT, permission};
use arbor_service::admin::{
    GlobalGrantView, GlobalPermissionInput, MemberInput, MembershipView, add_member,
    grant_group_global, remove_member, revoke_group_global,
};

/// ## Summary
/// POST /groups/{object_id}/permissions - Grants a global permission to every member.
#[handler]
async fn grant_permission(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<GlobalGrantView>> {
    let group_id = object_id(req)?;
    let input: GlobalPermissionInput = parse_json_body(req).await?;
    let is_root = caller_is_root(depot)?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let grant = grant_group_global(store, group_id, input, is_root).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(grant))
}

#[handler]
async fn revoke_permission(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let group_id = object_id(req)?;
    let input: GlobalPermissionInput = parse_json_body(req).await?;
    let is_root = caller_is_root(depot)?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    revoke_group_global(store, group_id, input, is_root).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// POST /groups/{object_id}/users - Adds a user by name. 201 for a new member, 200 otherwise.
#[handler]
async fn add_user(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<MembershipView>> {
    let group_id = object_id(req)?;
    let input: MemberInput = parse_json_body(req).await?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let membership = add_member(store, group_id, input).await?;

    if membership.created {
        res.status_code(StatusCode::CREATED);
    }
    Ok(Json(membership))
}

#[handler]
async fn remove_user(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let group_id = object_id(req)?;
    let input: MemberInput = parse_json_body(req).await?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    remove_member(store, group_id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(GROUPS_ROUTE_COMPONENT).push(
        Router::with_path("{object_id}")
            .hoop(GlobalContext)
            .hoop(RequirePermission::new(permission::ADMIN_GROUPS))
            .push(
                Router::with_path("permissions")
                    .post(grant_permission)
                    .delete(revoke_permission),
            )
            .push(Router::with_path("users").post(add_user).delete(remove_user)),
    )
}
