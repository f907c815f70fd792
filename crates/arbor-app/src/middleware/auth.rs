use salvo::Depot;

use crate::config::{get_config_from_depot, get_selector_from_depot};
use crate::db_handler::{get_session_from_depot, open_session};
use crate::error::AppResult;
use arbor_service::auth::depot::depot_keys;
use arbor_service::auth::{Authentication, RequestCredentials};

/// ## Summary
/// Middleware handler for authentication.
///
/// Resolves the request's principal once through the selected policy and
/// stores the outcome for every later hoop and handler. Anonymous requests
/// pass through with no user.
pub struct AuthMiddleware;

async fn authenticate(
    credentials: &RequestCredentials,
    depot: &Depot,
) -> AppResult<Authentication> {
    let selector = get_selector_from_depot(depot)?;

    let shared = get_session_from_depot(depot)?;
    let mut slot = shared.lock().await;
    let store = open_session(&mut slot)?;
    Ok(selector.authenticate(credentials, store).await?)
}

#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        let credentials = match get_config_from_depot(depot) {
            Ok(config) => RequestCredentials::from_request(req, &config.auth),
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
                return;
            }
        };

        match authenticate(&credentials, depot).await {
            Ok(authentication) => {
                depot.insert(depot_keys::AUTHENTICATION, authentication);
            }
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
            }
        }
    }
}
