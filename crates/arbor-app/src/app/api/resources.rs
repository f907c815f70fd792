//! Per-resource permission grants.

use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode};

use super::parse_json_body;
use crate::db_handler::{get_session_from_depot, open_session};
use crate::error::AppResult;
use crate::middleware::context::ResourceContext;
use crate::middleware::permission::RequirePermission;
use arbor_core::constants::{RESOURCES_ROUTE_COMPONENT, permission};
use arbor_service::auth::get_context_from_depot;
use arbor_service::permissions::{
    GrantView, GroupPermissionInput, UserPermissionInput, grant_group_permission,
    grant_user_permission, revoke_group_permission, revoke_user_permission,
};

#[handler]
async fn grant_user(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<GrantView>> {
    let input: UserPermissionInput = parse_json_body(req).await?;
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let grant = grant_user_permission(store, resource, input).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(grant))
}

#[handler]
async fn revoke_user(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let input: UserPermissionInput = parse_json_body(req).await?;
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    revoke_user_permission(store, resource, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[handler]
async fn grant_group(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<GrantView>> {
    let input: GroupPermissionInput = parse_json_body(req).await?;
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let grant = grant_group_permission(store, resource, input).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(grant))
}

#[handler]
async fn revoke_group(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let input: GroupPermissionInput = parse_json_body(req).await?;
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    revoke_group_permission(store, resource, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(RESOURCES_ROUTE_COMPONENT).push(
        Router::with_path("{object_id}")
            .hoop(ResourceContext)
            .hoop(RequirePermission::new(permission::OWNER))
            .push(
                Router::with_path("user_permissions")
                    .post(grant_user)
                    .delete(revoke_user),
            )
            .push(
                Router::with_path("group_permissions")
                    .post(grant_group)
                    .delete(revoke_group),
            ),
    )
}
