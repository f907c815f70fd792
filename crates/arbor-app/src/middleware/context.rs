//! Hoops that attach a `SecurityContext` to the request.

use salvo::Depot;

use crate::db_handler::{get_session_from_depot, open_session};
use crate::error::AppResult;
use arbor_core::constants::OBJECT_ID_PARAM;
use arbor_service::auth::depot::depot_keys;
use arbor_service::auth::get_authentication_from_depot;
use arbor_service::context::{SecurityContext, global_context, resource_context};

/// Context for routes addressing one resource through the `object_id` path parameter.
pub struct ResourceContext;

/// Context for routes that address no particular resource.
pub struct GlobalContext;

async fn build_resource_context(
    raw_object_id: Option<String>,
    depot: &Depot,
) -> AppResult<SecurityContext> {
    let user = get_authentication_from_depot(depot)?.user.as_ref();

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    Ok(resource_context(store, raw_object_id.as_deref(), user).await?)
}

async fn build_global_context(depot: &Depot) -> AppResult<SecurityContext> {
    let user = get_authentication_from_depot(depot)?.user.as_ref();

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    Ok(global_context(store, user).await?)
}

#[salvo::async_trait]
impl salvo::Handler for ResourceContext {
    #[tracing::instrument(skip_all)]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let raw_object_id = req.param::<String>(OBJECT_ID_PARAM);
        match build_resource_context(raw_object_id, depot).await {
            Ok(context) => {
                depot.insert(depot_keys::SECURITY_CONTEXT, context);
            }
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
            }
        }
    }
}

#[salvo::async_trait]
impl salvo::Handler for GlobalContext {
    #[tracing::instrument(skip_all)]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        match build_global_context(depot).await {
            Ok(context) => {
                depot.insert(depot_keys::SECURITY_CONTEXT, context);
            }
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
            }
        }
    }
}
