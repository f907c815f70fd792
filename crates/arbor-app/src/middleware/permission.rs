use salvo::Depot;

use crate::error::AppResult;
use arbor_service::acl::authorize;
use arbor_service::auth::{get_authentication_from_depot, get_context_from_depot};

/// Rejects the request with 403 unless the security context grants `permission`
/// to the request's user or one of its groups.
pub struct RequirePermission {
    pub permission: &'static str,
}

impl RequirePermission {
    #[must_use]
    pub const fn new(permission: &'static str) -> Self {
        Self { permission }
    }

    fn check(&self, depot: &Depot) -> AppResult<()> {
        let principals = get_authentication_from_depot(depot)?.principals();
        let context = get_context_from_depot(depot)?;
        authorize(&context.acl, &principals, self.permission).require(self.permission)?;
        Ok(())
    }
}

#[salvo::async_trait]
impl salvo::Handler for RequirePermission {
    #[tracing::instrument(skip_all, fields(permission = self.permission))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        if let Err(e) = self.check(depot) {
            e.render_into(res);
            ctrl.skip_rest();
        }
    }
}
