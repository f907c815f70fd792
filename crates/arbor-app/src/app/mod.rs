pub mod api;

use std::sync::Arc;

use salvo::Router;

use crate::config::{ConfigHandler, Settings};
use crate::db_handler::StoreHandler;
use crate::error::AppResult;
use arbor_db::db::DataStore;

/// ## Summary
/// Assembles the full router: store and configuration injection followed by the API routes.
///
/// ## Errors
/// Returns an error if the authentication policies cannot be built from `settings`.
pub fn service_router(store: Arc<dyn DataStore>, settings: Settings) -> AppResult<Router> {
    Ok(Router::new()
        .hoop(StoreHandler { store })
        .hoop(ConfigHandler::new(settings)?)
        .push(api::routes()))
}
