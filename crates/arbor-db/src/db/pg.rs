//! `PostgreSQL` backed store. Each session owns one pooled connection with an open transaction.

use std::collections::BTreeSet;

use async_trait::async_trait;
use diesel_async::{AnsiTransactionManager, TransactionManager};

use crate::db::connection::{DbConnection, DbPool};
use crate::db::query;
use crate::db::store::{
    DataStore, PermissionStore, ResourceStore, StoreSession, TokenStore, TreeStore, UserStore,
};
use crate::error::DbResult;
use crate::model::{
    auth_token::{AuthToken, NewAuthToken},
    group::Group,
    permission::{GroupPermission, GroupResourcePermission, UserPermission, UserResourcePermission},
    resource::{NewResource, Resource, ResourceChanges, ResourcePage, TreeRow},
    user::{Membership, User},
};
use arbor_core::types::ResourceType;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn begin(&self) -> DbResult<Box<dyn StoreSession>> {
        let mut conn = self.pool.get_owned().await?;
        AnsiTransactionManager::begin_transaction(&mut *conn).await?;
        tracing::trace!("Transaction opened");
        Ok(Box::new(PgSession { conn }))
    }
}

/// A pooled connection inside an open transaction.
///
/// Must end with [`StoreSession::commit`] or [`StoreSession::rollback`].
pub struct PgSession {
    conn: DbConnection<'static>,
}

#[async_trait]
impl TreeStore for PgSession {
    async fn tree_node(&mut self, resource_id: i32) -> DbResult<Option<Resource>> {
        Ok(query::resource::by_id(&mut self.conn, resource_id).await?)
    }

    async fn count_children(&mut self, parent_id: Option<i32>) -> DbResult<i32> {
        let count = query::tree::count_children(&mut self.conn, parent_id).await?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn path_to_root(&mut self, node_id: i32) -> DbResult<Option<Vec<i32>>> {
        let path = query::tree::path_to_root(&mut self.conn, node_id).await?;
        Ok((!path.is_empty()).then_some(path))
    }

    #[tracing::instrument(skip(self))]
    async fn lock_sibling_set(&mut self, parent_id: Option<i32>) -> DbResult<()> {
        Ok(query::tree::lock_sibling_set(&mut self.conn, parent_id).await?)
    }

    async fn shift_siblings(
        &mut self,
        parent_id: Option<i32>,
        from: i32,
        to: i32,
        delta: i32,
    ) -> DbResult<()> {
        query::tree::shift_siblings(&mut self.conn, parent_id, from, to, delta).await?;
        Ok(())
    }

    async fn place_node(
        &mut self,
        resource_id: i32,
        parent_id: Option<i32>,
        ordering: i32,
    ) -> DbResult<()> {
        query::tree::place_node(&mut self.conn, resource_id, parent_id, ordering).await?;
        Ok(())
    }

    async fn from_parent_deeper(
        &mut self,
        parent_id: Option<i32>,
        limit_depth: Option<i32>,
    ) -> DbResult<Vec<TreeRow>> {
        Ok(query::tree::from_parent_deeper(&mut self.conn, parent_id, limit_depth).await?)
    }

    async fn delete_subtree(&mut self, resource_id: i32) -> DbResult<()> {
        query::tree::delete_subtree(&mut self.conn, resource_id).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for PgSession {
    async fn resource_by_id(&mut self, resource_id: i32) -> DbResult<Option<Resource>> {
        Ok(query::resource::by_id(&mut self.conn, resource_id).await?)
    }

    async fn insert_resource(&mut self, new_resource: NewResource) -> DbResult<Resource> {
        Ok(query::resource::insert(&mut self.conn, &new_resource).await?)
    }

    async fn update_resource(
        &mut self,
        resource_id: i32,
        changes: &ResourceChanges,
    ) -> DbResult<Resource> {
        if changes.is_empty() {
            return self.require_node(resource_id).await;
        }
        Ok(query::resource::update(&mut self.conn, resource_id, changes).await?)
    }

    async fn list_resources(
        &mut self,
        resource_type: ResourceType,
        page: i64,
        per_page: i64,
    ) -> DbResult<ResourcePage> {
        let tag = resource_type.as_str();
        let total = query::resource::count_by_type(&mut self.conn, tag).await?;
        let offset = (page.max(1) - 1) * per_page;
        let items = query::resource::list_page(&mut self.conn, tag, offset, per_page).await?;
        Ok(ResourcePage {
            items,
            total,
            page,
            per_page,
        })
    }
}

#[async_trait]
impl PermissionStore for PgSession {
    async fn user_permissions(&mut self, user_id: i32) -> DbResult<BTreeSet<String>> {
        let names = query::permission::for_user(&mut self.conn, user_id).await?;
        Ok(names.into_iter().collect())
    }

    async fn user_resource_permissions(
        &mut self,
        user_id: i32,
        resource_id: i32,
    ) -> DbResult<BTreeSet<String>> {
        let names =
            query::permission::for_user_on_resource(&mut self.conn, user_id, resource_id).await?;
        Ok(names.into_iter().collect())
    }

    async fn grant_user_permission(&mut self, user_id: i32, perm_name: &str) -> DbResult<()> {
        let row = UserPermission {
            user_id,
            perm_name: perm_name.to_owned(),
        };
        Ok(query::permission::grant_user(&mut self.conn, &row).await?)
    }

    async fn grant_group_permission(&mut self, group_id: i32, perm_name: &str) -> DbResult<()> {
        let row = GroupPermission {
            group_id,
            perm_name: perm_name.to_owned(),
        };
        Ok(query::permission::grant_group(&mut self.conn, &row).await?)
    }

    async fn revoke_user_permission(&mut self, user_id: i32, perm_name: &str) -> DbResult<bool> {
        let row = UserPermission {
            user_id,
            perm_name: perm_name.to_owned(),
        };
        let removed = query::permission::revoke_user(&mut self.conn, &row).await?;
        Ok(removed > 0)
    }

    async fn revoke_group_permission(
        &mut self,
        group_id: i32,
        perm_name: &str,
    ) -> DbResult<bool> {
        let row = GroupPermission {
            group_id,
            perm_name: perm_name.to_owned(),
        };
        let removed = query::permission::revoke_group(&mut self.conn, &row).await?;
        Ok(removed > 0)
    }

    async fn grant_user_resource_permission(
        &mut self,
        user_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<()> {
        let row = UserResourcePermission {
            user_id,
            resource_id,
            perm_name: perm_name.to_owned(),
        };
        Ok(query::permission::grant_user_resource(&mut self.conn, &row).await?)
    }

    async fn revoke_user_resource_permission(
        &mut self,
        user_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<bool> {
        let row = UserResourcePermission {
            user_id,
            resource_id,
            perm_name: perm_name.to_owned(),
        };
        let removed = query::permission::revoke_user_resource(&mut self.conn, &row).await?;
        Ok(removed > 0)
    }

    async fn grant_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<()> {
        let row = GroupResourcePermission {
            group_id,
            resource_id,
            perm_name: perm_name.to_owned(),
        };
        Ok(query::permission::grant_group_resource(&mut self.conn, &row).await?)
    }

    async fn revoke_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<bool> {
        let row = GroupResourcePermission {
            group_id,
            resource_id,
            perm_name: perm_name.to_owned(),
        };
        let removed = query::permission::revoke_group_resource(&mut self.conn, &row).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl TokenStore for PgSession {
    async fn lookup_by_token(&mut self, token: &str) -> DbResult<Option<AuthToken>> {
        Ok(query::token::by_token(&mut self.conn, token).await?)
    }

    async fn tokens_for_user(&mut self, owner_id: i32) -> DbResult<Vec<AuthToken>> {
        Ok(query::token::by_owner(&mut self.conn, owner_id).await?)
    }

    async fn create_token(
        &mut self,
        owner_id: i32,
        token: &str,
        description: Option<&str>,
    ) -> DbResult<AuthToken> {
        let new_token = NewAuthToken {
            token,
            owner_id,
            description,
        };
        Ok(query::token::insert(&mut self.conn, &new_token).await?)
    }

    async fn delete_token(&mut self, owner_id: i32, token_id: i32) -> DbResult<bool> {
        let removed = query::token::delete_owned(&mut self.conn, owner_id, token_id).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl UserStore for PgSession {
    async fn user_by_id(&mut self, user_id: i32) -> DbResult<Option<User>> {
        Ok(query::user::by_id(&mut self.conn, user_id).await?)
    }

    async fn user_by_name(&mut self, user_name: &str) -> DbResult<Option<User>> {
        Ok(query::user::by_name(&mut self.conn, user_name).await?)
    }

    async fn group_ids_for_user(&mut self, user_id: i32) -> DbResult<Vec<i32>> {
        Ok(query::user::group_ids(&mut self.conn, user_id).await?)
    }

    async fn group_by_id(&mut self, group_id: i32) -> DbResult<Option<Group>> {
        Ok(query::user::group_by_id(&mut self.conn, group_id).await?)
    }

    async fn add_group_member(&mut self, user_id: i32, group_id: i32) -> DbResult<bool> {
        let row = Membership { user_id, group_id };
        let added = query::user::add_membership(&mut self.conn, &row).await?;
        Ok(added > 0)
    }

    async fn remove_group_member(&mut self, user_id: i32, group_id: i32) -> DbResult<bool> {
        let row = Membership { user_id, group_id };
        let removed = query::user::remove_membership(&mut self.conn, &row).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl StoreSession for PgSession {
    #[tracing::instrument(skip(self))]
    async fn commit(mut self: Box<Self>) -> DbResult<()> {
        AnsiTransactionManager::commit_transaction(&mut *self.conn).await?;
        tracing::trace!("Transaction committed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn rollback(mut self: Box<Self>) -> DbResult<()> {
        AnsiTransactionManager::rollback_transaction(&mut *self.conn).await?;
        tracing::trace!("Transaction rolled back");
        Ok(())
    }
}
