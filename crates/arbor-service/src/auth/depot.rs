//! Depot helpers for request-scoped authentication and authorization state.

use crate::context::SecurityContext;
use crate::error::{ServiceError, ServiceResult};

use super::principal::{Authentication, RequestUser};

pub mod depot_keys {
    pub const AUTHENTICATION: &str = "__authentication";
    pub const SECURITY_CONTEXT: &str = "__security_context";
}

/// Get the authentication outcome recorded for this request.
///
/// ## Errors
///
/// Returns `Configuration` if the authentication middleware did not run.
pub fn get_authentication_from_depot(depot: &salvo::Depot) -> ServiceResult<&Authentication> {
    depot
        .get::<Authentication>(depot_keys::AUTHENTICATION)
        .map_err(|_missing| {
            ServiceError::Configuration("authentication middleware is not installed".to_string())
        })
}

/// Get the authenticated user from the depot.
///
/// ## Errors
///
/// Returns `NotAuthenticated` if the request is anonymous.
pub fn get_user_from_depot(depot: &salvo::Depot) -> ServiceResult<&RequestUser> {
    get_authentication_from_depot(depot)?
        .user
        .as_ref()
        .ok_or(ServiceError::NotAuthenticated)
}

/// Get the security context built for this request.
///
/// ## Errors
///
/// Returns `Configuration` if no context factory ran for the route.
pub fn get_context_from_depot(depot: &salvo::Depot) -> ServiceResult<&SecurityContext> {
    depot
        .get::<SecurityContext>(depot_keys::SECURITY_CONTEXT)
        .map_err(|_missing| {
            ServiceError::Configuration("no security context for this route".to_string())
        })
}
