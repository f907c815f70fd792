//! Narrow store interfaces consumed by the service layer.
//!
//! A [`DataStore`] hands out one [`StoreSession`] per request. Everything a
//! request reads or writes goes through that session, which maps onto a single
//! database transaction and is committed or rolled back when the request ends.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::{DbResult, TreeError};
use crate::model::{
    auth_token::AuthToken,
    group::Group,
    resource::{NewResource, Resource, ResourceChanges, ResourcePage, TreeRow},
    user::User,
};
use arbor_core::types::ResourceType;

/// Ordered parent/child tree queries and mutations.
///
/// Positions are 1-based and contiguous within every sibling set, including the
/// forest root (`parent_id = None`). Backends supply the row-level primitives;
/// the provided methods build every ordering-preserving mutation from them.
#[async_trait]
pub trait TreeStore: Send {
    async fn tree_node(&mut self, resource_id: i32) -> DbResult<Option<Resource>>;

    async fn count_children(&mut self, parent_id: Option<i32>) -> DbResult<i32>;

    /// Ids from `node_id` itself up to its forest root, or `None` if the node is missing.
    async fn path_to_root(&mut self, node_id: i32) -> DbResult<Option<Vec<i32>>>;

    /// Serializes count-then-mutate work on one sibling set until the session ends.
    async fn lock_sibling_set(&mut self, parent_id: Option<i32>) -> DbResult<()>;

    /// Adds `delta` to the ordering of every sibling positioned within `from..=to`.
    async fn shift_siblings(
        &mut self,
        parent_id: Option<i32>,
        from: i32,
        to: i32,
        delta: i32,
    ) -> DbResult<()>;

    /// Writes parent and ordering of one node without touching its siblings.
    async fn place_node(
        &mut self,
        resource_id: i32,
        parent_id: Option<i32>,
        ordering: i32,
    ) -> DbResult<()>;

    /// Descendants of `parent_id` in depth-first sibling order. Direct children have depth 1.
    async fn from_parent_deeper(
        &mut self,
        parent_id: Option<i32>,
        limit_depth: Option<i32>,
    ) -> DbResult<Vec<TreeRow>>;

    /// Removes a node and all of its descendants without repairing sibling order.
    async fn delete_subtree(&mut self, resource_id: i32) -> DbResult<()>;

    /// ## Summary
    /// Loads a node or fails with `TreeError::NodeNotFound`.
    ///
    /// ## Errors
    /// Returns `TreeError::NodeNotFound` or a backend error.
    async fn require_node(&mut self, resource_id: i32) -> DbResult<Resource> {
        self.tree_node(resource_id)
            .await?
            .ok_or_else(|| TreeError::NodeNotFound(resource_id).into())
    }

    /// ## Summary
    /// Checks that `candidate_parent_id` exists and is neither `node_id` nor one of its descendants.
    ///
    /// ## Errors
    /// Returns `TreeError::MissingParent` or `TreeError::CyclicPath`.
    async fn check_node_parent(
        &mut self,
        node_id: Option<i32>,
        candidate_parent_id: i32,
    ) -> DbResult<()> {
        let Some(path) = self.path_to_root(candidate_parent_id).await? else {
            return Err(TreeError::MissingParent.into());
        };
        if let Some(node_id) = node_id
            && path.contains(&node_id)
        {
            return Err(TreeError::CyclicPath.into());
        }
        Ok(())
    }

    /// ## Summary
    /// Checks `position` against the sibling set of `parent_id`.
    ///
    /// A node moving within its own sibling set may take positions `1..=count`;
    /// a node entering the set may also take `count + 1`.
    ///
    /// ## Errors
    /// Returns `TreeError::OutOfBoundary` with the applicable upper bound.
    async fn check_node_position(
        &mut self,
        parent_id: Option<i32>,
        position: i32,
        same_branch: bool,
    ) -> DbResult<()> {
        let count = self.count_children(parent_id).await?;
        let max = if same_branch { count } else { count + 1 };
        if position < 1 || position > max {
            return Err(TreeError::OutOfBoundary { max }.into());
        }
        Ok(())
    }

    /// ## Summary
    /// Moves a node to `to_position` within its current sibling set.
    ///
    /// ## Side Effects
    /// Siblings between the old and new position shift by one toward the gap.
    ///
    /// ## Errors
    /// Returns `TreeError::NodeNotFound`, `TreeError::OutOfBoundary` or a backend error.
    #[tracing::instrument(skip(self))]
    async fn set_position(&mut self, resource_id: i32, to_position: i32) -> DbResult<()> {
        let node = self.require_node(resource_id).await?;
        self.check_node_position(node.parent_id, to_position, true)
            .await?;

        let from_position = node.ordering;
        match to_position.cmp(&from_position) {
            std::cmp::Ordering::Equal => return Ok(()),
            std::cmp::Ordering::Less => {
                self.shift_siblings(node.parent_id, to_position, from_position - 1, 1)
                    .await?;
            }
            std::cmp::Ordering::Greater => {
                self.shift_siblings(node.parent_id, from_position + 1, to_position, -1)
                    .await?;
            }
        }
        self.place_node(resource_id, node.parent_id, to_position)
            .await
    }

    /// ## Summary
    /// Moves a node under `new_parent_id` at `to_position`.
    ///
    /// Staying under the same parent is a plain reorder.
    ///
    /// ## Side Effects
    /// Closes the gap in the old sibling set and opens one in the new set.
    ///
    /// ## Errors
    /// Returns a `TreeError` when the node or parent is invalid or the position is out of range.
    #[tracing::instrument(skip(self))]
    async fn move_to_position(
        &mut self,
        resource_id: i32,
        new_parent_id: Option<i32>,
        to_position: i32,
    ) -> DbResult<()> {
        let node = self.require_node(resource_id).await?;
        if node.parent_id == new_parent_id {
            return self.set_position(resource_id, to_position).await;
        }

        if let Some(parent_id) = new_parent_id {
            self.check_node_parent(Some(resource_id), parent_id).await?;
        }
        self.check_node_position(new_parent_id, to_position, false)
            .await?;

        self.shift_siblings(node.parent_id, node.ordering + 1, i32::MAX, -1)
            .await?;
        self.shift_siblings(new_parent_id, to_position, i32::MAX, 1)
            .await?;
        self.place_node(resource_id, new_parent_id, to_position)
            .await
    }

    /// ## Summary
    /// Deletes a node with all of its descendants and closes the gap among its siblings.
    ///
    /// ## Errors
    /// Returns `TreeError::NodeNotFound` or a backend error.
    #[tracing::instrument(skip(self))]
    async fn delete_branch(&mut self, resource_id: i32) -> DbResult<()> {
        let node = self.require_node(resource_id).await?;
        self.delete_subtree(resource_id).await?;
        self.shift_siblings(node.parent_id, node.ordering + 1, i32::MAX, -1)
            .await
    }
}

#[async_trait]
pub trait ResourceStore: Send {
    async fn resource_by_id(&mut self, resource_id: i32) -> DbResult<Option<Resource>>;

    /// Inserts a row exactly as given; callers choose an ordering that keeps the set contiguous.
    async fn insert_resource(&mut self, new_resource: NewResource) -> DbResult<Resource>;

    async fn update_resource(
        &mut self,
        resource_id: i32,
        changes: &ResourceChanges,
    ) -> DbResult<Resource>;

    async fn list_resources(
        &mut self,
        resource_type: ResourceType,
        page: i64,
        per_page: i64,
    ) -> DbResult<ResourcePage>;
}

#[async_trait]
pub trait PermissionStore: Send {
    /// Global permissions granted to the user directly or through any of its groups.
    async fn user_permissions(&mut self, user_id: i32) -> DbResult<BTreeSet<String>>;

    /// Permissions one user holds on one resource, directly or through its groups.
    async fn user_resource_permissions(
        &mut self,
        user_id: i32,
        resource_id: i32,
    ) -> DbResult<BTreeSet<String>>;

    async fn grant_user_permission(&mut self, user_id: i32, perm_name: &str) -> DbResult<()>;

    async fn grant_group_permission(&mut self, group_id: i32, perm_name: &str) -> DbResult<()>;

    /// Returns `false` when there was nothing to revoke.
    async fn revoke_user_permission(&mut self, user_id: i32, perm_name: &str) -> DbResult<bool>;

    /// Returns `false` when there was nothing to revoke.
    async fn revoke_group_permission(&mut self, group_id: i32, perm_name: &str)
    -> DbResult<bool>;

    async fn grant_user_resource_permission(
        &mut self,
        user_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<()>;

    /// Returns `false` when there was nothing to revoke.
    async fn revoke_user_resource_permission(
        &mut self,
        user_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<bool>;

    async fn grant_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<()>;

    /// Returns `false` when there was nothing to revoke.
    async fn revoke_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<bool>;
}

#[async_trait]
pub trait TokenStore: Send {
    async fn lookup_by_token(&mut self, token: &str) -> DbResult<Option<AuthToken>>;

    async fn tokens_for_user(&mut self, owner_id: i32) -> DbResult<Vec<AuthToken>>;

    async fn create_token(
        &mut self,
        owner_id: i32,
        token: &str,
        description: Option<&str>,
    ) -> DbResult<AuthToken>;

    /// Returns `false` when the token does not exist or belongs to someone else.
    async fn delete_token(&mut self, owner_id: i32, token_id: i32) -> DbResult<bool>;
}

#[async_trait]
pub trait UserStore: Send {
    async fn user_by_id(&mut self, user_id: i32) -> DbResult<Option<User>>;

    async fn user_by_name(&mut self, user_name: &str) -> DbResult<Option<User>>;

    async fn group_ids_for_user(&mut self, user_id: i32) -> DbResult<Vec<i32>>;

    async fn group_by_id(&mut self, group_id: i32) -> DbResult<Option<Group>>;

    /// Returns `false` when the user already belonged to the group.
    async fn add_group_member(&mut self, user_id: i32, group_id: i32) -> DbResult<bool>;

    /// Returns `false` when the user was not a member.
    async fn remove_group_member(&mut self, user_id: i32, group_id: i32) -> DbResult<bool>;
}

/// All stores behind one transaction.
#[async_trait]
pub trait StoreSession:
    TreeStore + ResourceStore + PermissionStore + TokenStore + UserStore + Send
{
    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Opens a session; its writes become visible to other sessions on commit.
    async fn begin(&self) -> DbResult<Box<dyn StoreSession>>;
}
