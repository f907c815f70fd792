mod app_specific;
mod auth;
mod entries;
mod groups;
mod resources;
mod users;

use salvo::{Depot, Request, Router};

use crate::db_handler::TransactionMiddleware;
use crate::error::AppResult;
use crate::middleware::auth::AuthMiddleware;
use arbor_core::constants::{OBJECT_ID_PARAM, permission};
use arbor_service::acl::authorize;
use arbor_service::auth::{get_authentication_from_depot, get_context_from_depot};
use arbor_service::context::parse_object_id;
use arbor_service::error::ServiceError;

// Re-export route constants from core
pub use arbor_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, API_VERSION_COMPONENT, ENTRIES_ROUTE_COMPONENT,
    ENTRIES_ROUTE_PREFIX, RESOURCES_ROUTE_COMPONENT, RESOURCES_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the versioned API router.
///
/// Every route runs inside one store session and sees the request's
/// authentication outcome.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT).push(
        Router::with_path(API_VERSION_COMPONENT)
            .hoop(TransactionMiddleware)
            .hoop(AuthMiddleware)
            .push(app_specific::routes())
            .push(auth::routes())
            .push(users::routes())
            .push(groups::routes())
            .push(entries::routes())
            .push(resources::routes()),
    )
}

/// ## Summary
/// Parses a JSON request body, mapping malformed input to HTTP 400.
///
/// ## Errors
/// Returns `BadRequest` if the body is missing, not JSON, or of the wrong shape.
async fn parse_json_body<T>(req: &mut Request) -> AppResult<T>
where
    T: serde::de::DeserializeOwned,
{
    req.parse_json()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("invalid request body: {e}")).into())
}

/// ## Summary
/// Reads the `object_id` path parameter of user and group routes.
///
/// ## Errors
/// Returns `BadRequest` when the id is missing or not an integer.
fn object_id(req: &Request) -> AppResult<i32> {
    let raw = req.param::<String>(OBJECT_ID_PARAM);
    Ok(parse_object_id(raw.as_deref())?)
}

/// ## Summary
/// Whether the request's principals hold `root_administration` in the current context.
///
/// ## Errors
/// Returns an error if authentication or the security context is missing from the depot.
fn caller_is_root(depot: &Depot) -> AppResult<bool> {
    let principals = get_authentication_from_depot(depot)?.principals();
    let context = get_context_from_depot(depot)?;
    Ok(authorize(&context.acl, &principals, permission::ROOT_ADMINISTRATION).is_allowed())
}
