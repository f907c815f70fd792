use salvo::prelude::Json;
use salvo::{Depot, Router, handler};
use serde_json::json;

use crate::error::AppResult;
use arbor_service::auth::get_authentication_from_depot;

/// ## Summary
/// Reports which policy authenticated the request and the resolved user, if any.
#[handler]
async fn whoami(depot: &Depot) -> AppResult<Json<serde_json::Value>> {
    let authentication = get_authentication_from_depot(depot)?;
    Ok(Json(json!({
        "policy": authentication.policy_key,
        "user": authentication.user,
    })))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("whoami").get(whoami)
}
