//! Access-control lists.
//!
//! An ACL is an ordered list of [`Ace`]s. Consumers walk it top to bottom and
//! the first entry matching one of the request principals decides.

pub mod assemble;
pub mod authorize;

use serde::Serialize;

pub use assemble::{acl_for_principal, acl_for_resource};
pub use authorize::{AuthzResult, authorize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AceEffect {
    Allow,
    Deny,
}

/// A user or group an entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PrincipalRef {
    User(i32),
    Group(i32),
}

impl std::fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// A single named permission, or every permission at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionRef {
    Named(String),
    All,
}

impl PermissionRef {
    #[must_use]
    pub fn covers(&self, permission: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name == permission,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::All => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ace {
    pub effect: AceEffect,
    pub principal: PrincipalRef,
    pub permission: PermissionRef,
}

impl Ace {
    #[must_use]
    pub fn allow(principal: PrincipalRef, permission: PermissionRef) -> Self {
        Self {
            effect: AceEffect::Allow,
            principal,
            permission,
        }
    }

    #[must_use]
    pub fn allow_all(principal: PrincipalRef) -> Self {
        Self::allow(principal, PermissionRef::All)
    }

    #[must_use]
    pub fn deny(principal: PrincipalRef, permission: PermissionRef) -> Self {
        Self {
            effect: AceEffect::Deny,
            principal,
            permission,
        }
    }
}

pub type Acl = Vec<Ace>;
