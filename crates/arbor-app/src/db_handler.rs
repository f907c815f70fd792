use std::sync::Arc;

use salvo::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use arbor_core::error::CoreError;
use arbor_db::db::{DataStore, StoreSession};

/// The store session of the current request. `None` once it has been finished.
pub type SharedSession = Arc<Mutex<Option<Box<dyn StoreSession>>>>;

/// Makes the configured backing store available to every request.
pub struct StoreHandler {
    pub store: Arc<dyn DataStore>,
}

#[async_trait]
impl salvo::Handler for StoreHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.store));
    }
}

/// ## Summary
/// Retrieves the backing store from the depot.
///
/// ## Errors
/// Returns an error if the store is not found in the depot.
pub fn get_store_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn DataStore>> {
    depot
        .obtain::<Arc<dyn DataStore>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Data store not found in depot").into())
}

/// ## Summary
/// Retrieves the request's store session from the depot.
///
/// ## Errors
/// Returns an error if `TransactionMiddleware` did not run for this route.
pub fn get_session_from_depot(depot: &salvo::Depot) -> AppResult<SharedSession> {
    depot
        .obtain::<SharedSession>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Store session not found in depot").into())
}

/// ## Summary
/// Borrows the open session out of its guard.
///
/// ## Errors
/// Returns an error if the session was already committed or rolled back.
pub fn open_session(
    slot: &mut Option<Box<dyn StoreSession>>,
) -> AppResult<&mut (dyn StoreSession + 'static)> {
    slot.as_deref_mut().ok_or_else(|| {
        AppError::CoreError(CoreError::InvariantViolation(
            "Store session already finished",
        ))
    })
}

/// ## Summary
/// Runs the rest of the request inside one store session.
///
/// ## Side Effects
/// Commits when the response status is a success or redirect, rolls back
/// otherwise. A failed commit turns the response into a 500.
pub struct TransactionMiddleware;

#[async_trait]
impl salvo::Handler for TransactionMiddleware {
    #[tracing::instrument(skip_all, fields(method = %req.method(), path = %req.uri().path()))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let session = match get_store_from_depot(depot) {
            Ok(store) => store.begin().await,
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
                return;
            }
        };
        let session = match session {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open store session");
                AppError::from(e).render_into(res);
                ctrl.skip_rest();
                return;
            }
        };

        let shared: SharedSession = Arc::new(Mutex::new(Some(session)));
        depot.inject(Arc::clone(&shared));

        ctrl.call_next(req, depot, res).await;

        let Some(session) = shared.lock().await.take() else {
            return;
        };
        let succeeded = res
            .status_code
            .is_none_or(|status| status.is_success() || status.is_redirection());

        if succeeded {
            if let Err(e) = session.commit().await {
                tracing::error!(error = %e, "Commit failed");
                AppError::from(e).render_into(res);
            }
        } else if let Err(e) = session.rollback().await {
            tracing::error!(error = %e, "Rollback failed");
        } else {
            tracing::debug!(status = ?res.status_code, "Store session rolled back");
        }
    }
}
