use std::sync::Arc;

use salvo::async_trait;
pub use arbor_core::config::*;
use arbor_service::auth::AuthenticationSelector;

use crate::error::{AppError, AppResult};

/// Injects the loaded settings and the authentication selector built from them.
pub struct ConfigHandler {
    pub settings: Arc<Settings>,
    pub selector: Arc<AuthenticationSelector>,
}

impl ConfigHandler {
    /// ## Summary
    /// Builds the handler, constructing the authentication policies from `settings.auth`.
    ///
    /// ## Errors
    /// Returns an error if a policy cannot be built from its configuration.
    pub fn new(settings: Settings) -> AppResult<Self> {
        let selector = AuthenticationSelector::from_config(&settings.auth)?;
        Ok(Self {
            settings: Arc::new(settings),
            selector: Arc::new(selector),
        })
    }
}

#[async_trait]
impl salvo::Handler for ConfigHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.settings));
        depot.inject(Arc::clone(&self.selector));
    }
}

/// ## Summary
/// Retrieves the application configuration from the depot.
///
/// ## Errors
/// Returns an error if the configuration is not found in the depot.
pub fn get_config_from_depot(depot: &salvo::Depot) -> AppResult<Arc<Settings>> {
    depot.obtain::<Arc<Settings>>().cloned().map_err(|_err| {
        AppError::CoreError(arbor_core::error::CoreError::InvariantViolation(
            "Configuration not found in depot",
        ))
    })
}

/// ## Summary
/// Retrieves the authentication selector from the depot.
///
/// ## Errors
/// Returns an error if the selector is not found in the depot.
pub fn get_selector_from_depot(depot: &salvo::Depot) -> AppResult<Arc<AuthenticationSelector>> {
    depot
        .obtain::<Arc<AuthenticationSelector>>()
        .cloned()
        .map_err(|_err| {
            AppError::CoreError(arbor_core::error::CoreError::InvariantViolation(
                "Authentication selector not found in depot",
            ))
        })
}
