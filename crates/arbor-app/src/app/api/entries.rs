//! Entry CRUD and subtree walks.

use salvo::http::header::{HeaderName, HeaderValue};
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode};

use super::parse_json_body;
use crate::db_handler::{get_session_from_depot, open_session};
use crate::error::AppResult;
use crate::middleware::context::{GlobalContext, ResourceContext};
use crate::middleware::permission::RequirePermission;
use arbor_core::constants::{ENTRIES_ROUTE_COMPONENT, permission};
use arbor_db::model::resource::{Resource, TreeRow};
use arbor_service::auth::{get_context_from_depot, get_user_from_depot};
use arbor_service::tree::{
    EntryInput, EntryPatch, create_entry, delete_entry, entry_children, list_entries,
    update_entry,
};

const TOTAL_COUNT: &str = "x-total-count";
const CURRENT_PAGE: &str = "x-current-page";
const ITEMS_PER_PAGE: &str = "x-items-per-page";
const PAGES: &str = "x-pages";

/// ## Summary
/// GET /entries - One page of entries with pagination headers.
#[handler]
async fn list(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<Vec<Resource>>> {
    let page = req.query::<i64>("page").unwrap_or(1);

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let page = list_entries(store, page).await?;

    let headers = res.headers_mut();
    for (name, value) in [
        (TOTAL_COUNT, page.total),
        (CURRENT_PAGE, page.page),
        (ITEMS_PER_PAGE, page.per_page),
        (PAGES, page.page_count()),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
    Ok(Json(page.items))
}

/// ## Summary
/// POST /entries - Creates an entry owned by the signed-in user.
///
/// ## Errors
/// Returns HTTP 422 listing every invalid field.
#[handler]
async fn create(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<Resource>> {
    let input: EntryInput = parse_json_body(req).await?;
    let owner = get_user_from_depot(depot)?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    let created = create_entry(store, owner, input).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(created))
}

#[handler]
async fn show(depot: &mut Depot) -> AppResult<Json<Resource>> {
    Ok(Json(get_context_from_depot(depot)?.resource()?.clone()))
}

/// ## Summary
/// PATCH /entries/{object_id} - Renames, re-notes, reorders or reparents an entry.
///
/// ## Errors
/// Returns HTTP 422 listing every invalid field.
#[handler]
async fn update(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Resource>> {
    let patch: EntryPatch = parse_json_body(req).await?;
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    Ok(Json(update_entry(store, resource, patch).await?))
}

#[handler]
async fn remove(depot: &mut Depot) -> AppResult<StatusCode> {
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    delete_entry(store, resource).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// GET /entries/{object_id}/children?depth=N - Descendants in tree order.
#[handler]
async fn children(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<TreeRow>>> {
    let depth = req.query::<i32>("depth");
    let resource = get_context_from_depot(depot)?.resource()?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    Ok(Json(entry_children(store, resource, depth).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ENTRIES_ROUTE_COMPONENT)
        .push(
            Router::new()
                .hoop(GlobalContext)
                .hoop(RequirePermission::new(permission::ADMIN_ENTRIES))
                .get(list)
                .post(create),
        )
        .push(
            Router::with_path("{object_id}")
                .hoop(ResourceContext)
                .push(
                    Router::with_path("children")
                        .hoop(RequirePermission::new(permission::EDITOR))
                        .get(children),
                )
                .push(
                    Router::new()
                        .hoop(RequirePermission::new(permission::EDITOR))
                        .get(show),
                )
                .push(
                    Router::new()
                        .hoop(RequirePermission::new(permission::OWNER))
                        .patch(update)
                        .delete(remove),
                ),
        )
}
