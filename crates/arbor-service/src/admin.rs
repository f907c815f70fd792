//! User and group administration: global permission grants and group membership.
//!
//! Global grants are what the global ACL is assembled from, so these are the
//! operations that open or close the `admin_panel` gate for a principal.

use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ServiceError, ServiceResult};
use arbor_core::constants::permission;
use arbor_db::db::{PermissionStore, UserStore};
use arbor_db::model::group::Group;
use arbor_db::model::user::User;

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalPermissionInput {
    pub perm_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberInput {
    pub user_name: String,
}

/// A global grant as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalGrantView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    pub perm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipView {
    pub group_id: i32,
    pub user_id: i32,
    /// `false` when the user already belonged to the group.
    #[serde(skip)]
    pub created: bool,
}

/// ## Summary
/// Checks that `perm_name` is grantable outside a resource and that the caller
/// may hand it out. Only a root administrator manages `root_administration`.
fn check_global_perm(perm_name: &str, caller_is_root: bool) -> ServiceResult<()> {
    if !permission::GLOBAL.contains(&perm_name) {
        let mut errors = FieldErrors::new();
        errors.insert(
            "perm_name",
            format!("permission {perm_name:?} cannot be granted globally"),
        );
        return Err(ServiceError::Validation(errors));
    }
    if perm_name == permission::ROOT_ADMINISTRATION && !caller_is_root {
        return Err(ServiceError::PermissionDenied(
            permission::ROOT_ADMINISTRATION.to_owned(),
        ));
    }
    Ok(())
}

async fn require_user<S>(store: &mut S, user_id: i32) -> ServiceResult<User>
where
    S: UserStore + ?Sized,
{
    store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {user_id}")))
}

async fn require_group<S>(store: &mut S, group_id: i32) -> ServiceResult<Group>
where
    S: UserStore + ?Sized,
{
    store
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("group {group_id}")))
}

/// ## Summary
/// Grants a global permission to a user. Granting an existing permission is a no-op.
///
/// ## Errors
/// Returns `NotFound` for an unknown user, `Validation` for a permission that is
/// not global, or `PermissionDenied` when a non-root caller hands out root.
#[tracing::instrument(skip(store, input), fields(perm_name = %input.perm_name))]
pub async fn grant_user_global<S>(
    store: &mut S,
    user_id: i32,
    input: GlobalPermissionInput,
    caller_is_root: bool,
) -> ServiceResult<GlobalGrantView>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let user = require_user(store, user_id).await?;
    check_global_perm(&input.perm_name, caller_is_root)?;

    store.grant_user_permission(user.id, &input.perm_name).await?;
    tracing::info!(user_name = %user.user_name, "Global permission granted");

    Ok(GlobalGrantView {
        user_id: Some(user.id),
        group_id: None,
        perm_name: input.perm_name,
    })
}

/// ## Summary
/// Revokes a global permission from a user.
///
/// ## Errors
/// Returns `NotFound` for an unknown user or an absent grant, plus the
/// validation and authority errors of [`grant_user_global`].
#[tracing::instrument(skip(store, input), fields(perm_name = %input.perm_name))]
pub async fn revoke_user_global<S>(
    store: &mut S,
    user_id: i32,
    input: GlobalPermissionInput,
    caller_is_root: bool,
) -> ServiceResult<()>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let user = require_user(store, user_id).await?;
    check_global_perm(&input.perm_name, caller_is_root)?;

    if !store.revoke_user_permission(user.id, &input.perm_name).await? {
        return Err(ServiceError::NotFound(format!(
            "permission {} for user {}",
            input.perm_name, user.user_name
        )));
    }
    tracing::info!(user_name = %user.user_name, "Global permission revoked");
    Ok(())
}

/// ## Summary
/// Grants a global permission to a group. Every member inherits it.
///
/// ## Errors
/// Returns `NotFound` for an unknown group, `Validation` for a permission that
/// is not global, or `PermissionDenied` when a non-root caller hands out root.
#[tracing::instrument(skip(store, input), fields(perm_name = %input.perm_name))]
pub async fn grant_group_global<S>(
    store: &mut S,
    group_id: i32,
    input: GlobalPermissionInput,
    caller_is_root: bool,
) -> ServiceResult<GlobalGrantView>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let group = require_group(store, group_id).await?;
    check_global_perm(&input.perm_name, caller_is_root)?;

    store.grant_group_permission(group.id, &input.perm_name).await?;
    tracing::info!(group_name = %group.group_name, "Global permission granted");

    Ok(GlobalGrantView {
        user_id: None,
        group_id: Some(group.id),
        perm_name: input.perm_name,
    })
}

/// ## Summary
/// Revokes a global permission from a group.
///
/// ## Errors
/// Returns `NotFound` for an unknown group or an absent grant, plus the
/// validation and authority errors of [`grant_group_global`].
#[tracing::instrument(skip(store, input), fields(perm_name = %input.perm_name))]
pub async fn revoke_group_global<S>(
    store: &mut S,
    group_id: i32,
    input: GlobalPermissionInput,
    caller_is_root: bool,
) -> ServiceResult<()>
where
    S: PermissionStore + UserStore + ?Sized,
{
    let group = require_group(store, group_id).await?;
    check_global_perm(&input.perm_name, caller_is_root)?;

    if !store.revoke_group_permission(group.id, &input.perm_name).await? {
        return Err(ServiceError::NotFound(format!(
            "permission {} for group {}",
            input.perm_name, group.group_name
        )));
    }
    tracing::info!(group_name = %group.group_name, "Global permission revoked");
    Ok(())
}

async fn resolve_member<S>(
    store: &mut S,
    group_id: i32,
    user_name: &str,
) -> ServiceResult<(Group, User)>
where
    S: UserStore + ?Sized,
{
    let group = require_group(store, group_id).await?;
    let Some(user) = store.user_by_name(user_name).await? else {
        let mut errors = FieldErrors::new();
        errors.insert("user_name", "user not found");
        return Err(ServiceError::Validation(errors));
    };
    Ok((group, user))
}

/// ## Summary
/// Adds the named user to a group.
///
/// ## Errors
/// Returns `NotFound` for an unknown group, `Validation` for an unknown user.
#[tracing::instrument(skip(store, input), fields(user_name = %input.user_name))]
pub async fn add_member<S>(
    store: &mut S,
    group_id: i32,
    input: MemberInput,
) -> ServiceResult<MembershipView>
where
    S: UserStore + ?Sized,
{
    let (group, user) = resolve_member(store, group_id, &input.user_name).await?;
    let created = store.add_group_member(user.id, group.id).await?;
    if created {
        tracing::info!(group_name = %group.group_name, "User added to group");
    }

    Ok(MembershipView {
        group_id: group.id,
        user_id: user.id,
        created,
    })
}

/// ## Summary
/// Removes the named user from a group.
///
/// ## Errors
/// Returns `NotFound` for an unknown group or when the user is not a member,
/// `Validation` for an unknown user.
#[tracing::instrument(skip(store, input), fields(user_name = %input.user_name))]
pub async fn remove_member<S>(
    store: &mut S,
    group_id: i32,
    input: MemberInput,
) -> ServiceResult<()>
where
    S: UserStore + ?Sized,
{
    let (group, user) = resolve_member(store, group_id, &input.user_name).await?;
    if !store.remove_group_member(user.id, group.id).await? {
        return Err(ServiceError::NotFound(format!(
            "user {} in group {}",
            user.user_name, group.group_name
        )));
    }
    tracing::info!(group_name = %group.group_name, "User removed from group");
    Ok(())
}
