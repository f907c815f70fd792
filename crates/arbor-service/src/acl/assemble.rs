//! Builds ACLs for the global context and for single resources.

use std::collections::BTreeSet;

use super::{Ace, AceEffect, Acl, PermissionRef, PrincipalRef};
use crate::auth::RequestUser;
use crate::error::ServiceResult;
use arbor_core::constants::permission;
use arbor_db::db::PermissionStore;
use arbor_db::model::resource::Resource;

/// ## Summary
/// Turns a permission name into an allow entry, mapping `root_administration`
/// to the all-permissions sentinel.
#[must_use]
pub fn translate(principal: PrincipalRef, perm_name: &str) -> Ace {
    if perm_name == permission::ROOT_ADMINISTRATION {
        Ace::allow_all(principal)
    } else {
        Ace::allow(principal, PermissionRef::Named(perm_name.to_owned()))
    }
}

/// ## Summary
/// Drops every `admin_*` entry unless an allow entry for `admin_panel` or all
/// permissions is present.
#[must_use]
pub fn gate_admin_permissions(acl: Acl) -> Acl {
    let has_panel_access = acl.iter().any(|ace| {
        ace.effect == AceEffect::Allow
            && (ace.permission == PermissionRef::All
                || ace.permission.name() == Some(permission::ADMIN_PANEL))
    });
    if has_panel_access {
        return acl;
    }

    acl.into_iter()
        .filter(|ace| {
            !ace.permission
                .name()
                .is_some_and(|name| name.starts_with(permission::ADMIN_PREFIX))
        })
        .collect()
}

fn translate_all(principal: PrincipalRef, names: &BTreeSet<String>) -> impl Iterator<Item = Ace> {
    names.iter().map(move |name| translate(principal, name))
}

/// ## Summary
/// ACL for routes that are not tied to a resource.
///
/// Holds one entry per effective global permission of the user, with the
/// root rewrite and the `admin_panel` gate applied. Anonymous requests get an
/// empty list.
///
/// ## Errors
/// Returns an error if the permission lookup fails.
#[tracing::instrument(skip_all, fields(user_id = user.map(RequestUser::id)))]
pub async fn acl_for_principal<S>(store: &mut S, user: Option<&RequestUser>) -> ServiceResult<Acl>
where
    S: PermissionStore + ?Sized,
{
    let Some(user) = user else {
        return Ok(Acl::new());
    };

    let names = store.user_permissions(user.id()).await?;
    let acl = gate_admin_permissions(translate_all(PrincipalRef::User(user.id()), &names).collect());

    tracing::trace!(ace_count = acl.len(), "Global ACL assembled");
    Ok(acl)
}

/// ## Summary
/// ACL for a single resource.
///
/// Ownership entries come first, then the user's grants on this resource,
/// then an all-permissions entry if the user holds `root_administration`
/// globally. No `admin_*` gating applies here.
///
/// ## Errors
/// Returns an error if a permission lookup fails.
#[tracing::instrument(skip_all, fields(resource_id = resource.resource_id, user_id = user.map(RequestUser::id)))]
pub async fn acl_for_resource<S>(
    store: &mut S,
    resource: &Resource,
    user: Option<&RequestUser>,
) -> ServiceResult<Acl>
where
    S: PermissionStore + ?Sized,
{
    let mut acl = Acl::new();
    if let Some(owner_user_id) = resource.owner_user_id {
        acl.push(Ace::allow_all(PrincipalRef::User(owner_user_id)));
    }
    if let Some(owner_group_id) = resource.owner_group_id {
        acl.push(Ace::allow_all(PrincipalRef::Group(owner_group_id)));
    }

    if let Some(user) = user {
        let principal = PrincipalRef::User(user.id());

        let scoped = store
            .user_resource_permissions(user.id(), resource.resource_id)
            .await?;
        acl.extend(translate_all(principal, &scoped));

        let global = store.user_permissions(user.id()).await?;
        if global.contains(permission::ROOT_ADMINISTRATION) {
            acl.push(Ace::allow_all(principal));
        }
    }

    tracing::trace!(ace_count = acl.len(), "Resource ACL assembled");
    Ok(acl)
}
