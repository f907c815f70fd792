//! Security context factories.
//!
//! Every routed request gets exactly one [`SecurityContext`]: resource routes
//! load the addressed resource and its ACL, all other routes use the global ACL.

use crate::acl::{Acl, acl_for_principal, acl_for_resource};
use crate::auth::RequestUser;
use crate::error::{ServiceError, ServiceResult};
use arbor_db::db::{PermissionStore, ResourceStore};
use arbor_db::model::resource::Resource;

#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub acl: Acl,
    /// Present on resource routes only.
    pub resource: Option<Resource>,
}

impl SecurityContext {
    /// ## Summary
    /// The resource addressed by the route.
    ///
    /// ## Errors
    /// Returns `Configuration` when called on a global context.
    pub fn resource(&self) -> ServiceResult<&Resource> {
        self.resource.as_ref().ok_or_else(|| {
            ServiceError::Configuration("route has no resource context".to_string())
        })
    }
}

/// ## Summary
/// Parses the `object_id` path parameter.
///
/// ## Errors
/// Returns `BadRequest` when the parameter is missing or not an integer.
pub fn parse_object_id(raw: Option<&str>) -> ServiceResult<i32> {
    let raw = raw.ok_or_else(|| ServiceError::BadRequest("object_id is required".to_string()))?;
    raw.trim()
        .parse::<i32>()
        .map_err(|_invalid| ServiceError::BadRequest(format!("object_id {raw:?} is not an integer")))
}

/// ## Summary
/// Builds the context for a resource route.
///
/// The object id is parsed first, then the resource is loaded. Only a found
/// resource has its ACL computed.
///
/// ## Errors
/// Returns `BadRequest` for a malformed id, `NotFound` for a missing resource,
/// or a store error.
#[tracing::instrument(skip(store, user))]
pub async fn resource_context<S>(
    store: &mut S,
    raw_object_id: Option<&str>,
    user: Option<&RequestUser>,
) -> ServiceResult<SecurityContext>
where
    S: ResourceStore + PermissionStore + ?Sized,
{
    let resource_id = parse_object_id(raw_object_id)?;

    let Some(resource) = store.resource_by_id(resource_id).await? else {
        tracing::debug!(resource_id, "Resource not found");
        return Err(ServiceError::NotFound(format!("resource {resource_id}")));
    };

    let acl = acl_for_resource(store, &resource, user).await?;
    Ok(SecurityContext {
        acl,
        resource: Some(resource),
    })
}

/// ## Summary
/// Builds the context for a route that does not address a resource.
///
/// ## Errors
/// Returns an error if the permission lookup fails.
#[tracing::instrument(skip(store, user))]
pub async fn global_context<S>(
    store: &mut S,
    user: Option<&RequestUser>,
) -> ServiceResult<SecurityContext>
where
    S: PermissionStore + ?Sized,
{
    let acl = acl_for_principal(store, user).await?;
    Ok(SecurityContext {
        acl,
        resource: None,
    })
}
