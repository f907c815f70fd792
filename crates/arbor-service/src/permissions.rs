//! Granting and revoking permissions on a single resource.

use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ServiceError, ServiceResult};
use arbor_db::db::{PermissionStore, UserStore};
use arbor_db::model::resource::Resource;

#[derive(Debug, Clone, Deserialize)]
pub struct UserPermissionInput {
    pub user_name: String,
    pub perm_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupPermissionInput {
    pub group_id: i32,
    pub perm_name: String,
}

/// A grant as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantView {
    pub resource_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    pub perm_name: String,
}

fn check_perm_name(errors: &mut FieldErrors, resource: &Resource, perm_name: &str) {
    if !resource.possible_permissions().contains(&perm_name) {
        errors.insert(
            "perm_name",
            format!(
                "permission {perm_name:?} cannot be granted on {}",
                resource.resource_type
            ),
        );
    }
}

async fn resolve_user<S>(
    store: &mut S,
    errors: &mut FieldErrors,
    user_name: &str,
) -> ServiceResult<Option<i32>>
where
    S: UserStore + ?Sized,
{
    let user = store.user_by_name(user_name).await?;
    if user.is_none() {
        errors.insert("user_name", "user not found");
    }
    Ok(user.map(|u| u.id))
}

async fn check_group<S>(store: &mut S, errors: &mut FieldErrors, group_id: i32) -> ServiceResult<()>
where
    S: UserStore + ?Sized,
{
    if store.group_by_id(group_id).await?.is_none() {
        errors.insert("group_id", "group not found");
    }
    Ok(())
}

/// ## Summary
/// Grants `perm_name` on `resource` to the named user.
///
/// ## Errors
/// Returns `Validation` for an unknown user or a permission the resource does not accept.
#[tracing::instrument(skip(store, resource), fields(resource_id = resource.resource_id))]
pub async fn grant_user_permission<S>(
    store: &mut S,
    resource: &Resource,
    input: UserPermissionInput,
) -> ServiceResult<GrantView>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    check_perm_name(&mut errors, resource, &input.perm_name);
    let user_id = resolve_user(store, &mut errors, &input.user_name).await?;
    let Some(user_id) = user_id.filter(|_| errors.is_empty()) else {
        return Err(ServiceError::Validation(errors));
    };

    store
        .grant_user_resource_permission(user_id, resource.resource_id, &input.perm_name)
        .await?;
    tracing::info!(user_id, perm_name = %input.perm_name, "Resource permission granted");

    Ok(GrantView {
        resource_id: resource.resource_id,
        user_id: Some(user_id),
        group_id: None,
        perm_name: input.perm_name,
    })
}

/// ## Summary
/// Revokes `perm_name` on `resource` from the named user.
///
/// ## Errors
/// Returns `Validation` for an unknown user or permission, `NotFound` when no such grant exists.
#[tracing::instrument(skip(store, resource), fields(resource_id = resource.resource_id))]
pub async fn revoke_user_permission<S>(
    store: &mut S,
    resource: &Resource,
    input: UserPermissionInput,
) -> ServiceResult<()>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    check_perm_name(&mut errors, resource, &input.perm_name);
    let user_id = resolve_user(store, &mut errors, &input.user_name).await?;
    let Some(user_id) = user_id.filter(|_| errors.is_empty()) else {
        return Err(ServiceError::Validation(errors));
    };

    if !store
        .revoke_user_resource_permission(user_id, resource.resource_id, &input.perm_name)
        .await?
    {
        return Err(ServiceError::NotFound(format!(
            "permission {} for user {}",
            input.perm_name, input.user_name
        )));
    }
    tracing::info!(user_id, perm_name = %input.perm_name, "Resource permission revoked");
    Ok(())
}

/// ## Summary
/// Grants `perm_name` on `resource` to a group.
///
/// ## Errors
/// Returns `Validation` for an unknown group or a permission the resource does not accept.
#[tracing::instrument(skip(store, resource), fields(resource_id = resource.resource_id))]
pub async fn grant_group_permission<S>(
    store: &mut S,
    resource: &Resource,
    input: GroupPermissionInput,
) -> ServiceResult<GrantView>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    check_perm_name(&mut errors, resource, &input.perm_name);
    check_group(store, &mut errors, input.group_id).await?;
    errors.into_result()?;

    store
        .grant_group_resource_permission(input.group_id, resource.resource_id, &input.perm_name)
        .await?;
    tracing::info!(group_id = input.group_id, perm_name = %input.perm_name, "Resource permission granted");

    Ok(GrantView {
        resource_id: resource.resource_id,
        user_id: None,
        group_id: Some(input.group_id),
        perm_name: input.perm_name,
    })
}

/// ## Summary
/// Revokes `perm_name` on `resource` from a group.
///
/// ## Errors
/// Returns `Validation` for an unknown group or permission, `NotFound` when no such grant exists.
#[tracing::instrument(skip(store, resource), fields(resource_id = resource.resource_id))]
pub async fn revoke_group_permission<S>(
    store: &mut S,
    resource: &Resource,
    input: GroupPermissionInput,
) -> ServiceResult<()>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    check_perm_name(&mut errors, resource, &input.perm_name);
    check_group(store, &mut errors, input.group_id).await?;
    errors.into_result()?;

    if !store
        .revoke_group_resource_permission(input.group_id, resource.resource_id, &input.perm_name)
        .await?
    {
        return Err(ServiceError::NotFound(format!(
            "permission {} for group {}",
            input.perm_name, input.group_id
        )));
    }
    tracing::info!(group_id = input.group_id, perm_name = %input.perm_name, "Resource permission revoked");
    Ok(())
}
