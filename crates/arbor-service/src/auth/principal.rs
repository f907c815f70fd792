//! The principal a request acts as.

use serde::Serialize;

use crate::acl::PrincipalRef;
use crate::error::ServiceResult;
use arbor_db::db::UserStore;
use arbor_db::model::user::User;

/// An authenticated user together with the groups it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestUser {
    pub user: User,
    pub group_ids: Vec<i32>,
}

impl RequestUser {
    /// ## Summary
    /// Loads a user and its memberships. A missing user yields `None`.
    ///
    /// ## Errors
    /// Returns an error if the store lookup fails.
    pub async fn load<S>(store: &mut S, user_id: i32) -> ServiceResult<Option<Self>>
    where
        S: UserStore + ?Sized,
    {
        let Some(user) = store.user_by_id(user_id).await? else {
            tracing::debug!(user_id, "Authenticated id has no user record");
            return Ok(None);
        };
        let group_ids = store.group_ids_for_user(user_id).await?;
        Ok(Some(Self { user, group_ids }))
    }

    #[must_use]
    pub const fn id(&self) -> i32 {
        self.user.id
    }

    /// The user principal followed by one group principal per membership.
    #[must_use]
    pub fn principals(&self) -> Vec<PrincipalRef> {
        std::iter::once(PrincipalRef::User(self.user.id))
            .chain(self.group_ids.iter().copied().map(PrincipalRef::Group))
            .collect()
    }
}

/// Outcome of authenticating one request, resolved once and kept in the depot.
#[derive(Debug, Clone, Serialize)]
pub struct Authentication {
    /// Key of the policy that handled the request.
    pub policy_key: String,
    pub user: Option<RequestUser>,
}

impl Authentication {
    #[must_use]
    pub fn principals(&self) -> Vec<PrincipalRef> {
        self.user
            .as_ref()
            .map(RequestUser::principals)
            .unwrap_or_default()
    }
}
