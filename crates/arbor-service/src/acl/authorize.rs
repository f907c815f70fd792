//! First-match evaluation of an ACL.

use super::{Ace, AceEffect, PrincipalRef};
use crate::error::{ServiceError, ServiceResult};

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzResult {
    Allowed,
    Denied,
}

impl AuthzResult {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Convert to a `Result`, returning `Err(ServiceError::PermissionDenied)` if denied.
    ///
    /// ## Errors
    ///
    /// Returns `PermissionDenied` if access is denied.
    pub fn require(self, permission: &str) -> ServiceResult<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied => Err(ServiceError::PermissionDenied(permission.to_owned())),
        }
    }
}

/// ## Summary
/// Walks `acl` in order and lets the first entry that names one of
/// `principals` and covers `permission` decide. No match denies.
#[must_use]
pub fn authorize(acl: &[Ace], principals: &[PrincipalRef], permission: &str) -> AuthzResult {
    let decision = acl.iter().find(|ace| {
        principals.contains(&ace.principal) && ace.permission.covers(permission)
    });

    match decision {
        Some(ace) if ace.effect == AceEffect::Allow => {
            tracing::debug!(permission, principal = %ace.principal, "Authorization granted");
            AuthzResult::Allowed
        }
        Some(ace) => {
            tracing::debug!(permission, principal = %ace.principal, "Authorization denied by entry");
            AuthzResult::Denied
        }
        None => {
            tracing::debug!(permission, "Authorization denied for all principals");
            AuthzResult::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::PermissionRef;

    fn named(name: &str) -> PermissionRef {
        PermissionRef::Named(name.to_owned())
    }

    #[test]
    fn first_matching_entry_wins() {
        let acl = vec![
            Ace::deny(PrincipalRef::Group(3), named("editor")),
            Ace::allow(PrincipalRef::User(1), named("editor")),
        ];

        assert_eq!(
            authorize(&acl, &[PrincipalRef::User(1), PrincipalRef::Group(3)], "editor"),
            AuthzResult::Denied
        );
        assert_eq!(
            authorize(&acl, &[PrincipalRef::User(1)], "editor"),
            AuthzResult::Allowed
        );
    }

    #[test]
    fn all_permissions_covers_owner() {
        let acl = vec![Ace::allow_all(PrincipalRef::Group(2))];

        assert!(authorize(&acl, &[PrincipalRef::User(5), PrincipalRef::Group(2)], "owner").is_allowed());
        assert!(!authorize(&acl, &[PrincipalRef::User(5)], "owner").is_allowed());
        assert!(!authorize(&acl, &[], "owner").is_allowed());
    }

    #[test]
    fn require_maps_denial_to_error() {
        assert!(AuthzResult::Allowed.require("editor").is_ok());
        assert!(matches!(
            AuthzResult::Denied.require("editor"),
            Err(ServiceError::PermissionDenied(p)) if p == "editor"
        ));
    }
}
