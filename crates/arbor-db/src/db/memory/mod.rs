//! In-process store used by tests and by `storage.backend = "memory"`.
//!
//! A session holds the store mutex for its whole lifetime, so sessions are
//! fully serialized and sibling-set locks are implied. Writes are undone on
//! rollback (or drop) by restoring a snapshot taken when the session opened.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::store::{
    DataStore, PermissionStore, ResourceStore, StoreSession, TokenStore, TreeStore, UserStore,
};
use crate::error::{DbResult, TreeError};
use crate::model::{
    auth_token::AuthToken,
    group::Group,
    resource::{NewResource, Resource, ResourceChanges, ResourcePage, TreeRow},
    user::User,
};
use arbor_core::types::ResourceType;

/// Every table of the store, held in ordered maps so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: BTreeMap<i32, User>,
    groups: BTreeMap<i32, Group>,
    memberships: BTreeSet<(i32, i32)>,
    user_permissions: BTreeSet<(i32, String)>,
    group_permissions: BTreeSet<(i32, String)>,
    user_resource_permissions: BTreeSet<(i32, i32, String)>,
    group_resource_permissions: BTreeSet<(i32, i32, String)>,
    resources: BTreeMap<i32, Resource>,
    tokens: BTreeMap<i32, AuthToken>,
    last_user_id: i32,
    last_group_id: i32,
    last_resource_id: i32,
    last_token_id: i32,
}

impl MemoryState {
    pub fn add_user(&mut self, user_name: &str, email: &str, password_hash: &str) -> User {
        self.last_user_id += 1;
        let user = User {
            id: self.last_user_id,
            user_name: user_name.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            registered_date: chrono::Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        user
    }

    pub fn add_group(&mut self, group_name: &str) -> Group {
        self.last_group_id += 1;
        let group = Group {
            id: self.last_group_id,
            group_name: group_name.to_owned(),
            description: None,
        };
        self.groups.insert(group.id, group.clone());
        group
    }

    pub fn add_membership(&mut self, user_id: i32, group_id: i32) {
        self.memberships.insert((user_id, group_id));
    }

    pub fn grant_user_permission(&mut self, user_id: i32, perm_name: &str) {
        self.user_permissions.insert((user_id, perm_name.to_owned()));
    }

    pub fn grant_group_permission(&mut self, group_id: i32, perm_name: &str) {
        self.group_permissions
            .insert((group_id, perm_name.to_owned()));
    }

    pub fn grant_user_resource_permission(&mut self, user_id: i32, resource_id: i32, perm_name: &str) {
        self.user_resource_permissions
            .insert((user_id, resource_id, perm_name.to_owned()));
    }

    pub fn grant_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) {
        self.group_resource_permissions
            .insert((group_id, resource_id, perm_name.to_owned()));
    }

    pub fn insert_resource(&mut self, new_resource: NewResource) -> Resource {
        self.last_resource_id += 1;
        let resource = Resource {
            resource_id: self.last_resource_id,
            resource_name: new_resource.resource_name,
            resource_type: new_resource.resource_type,
            parent_id: new_resource.parent_id,
            ordering: new_resource.ordering,
            owner_user_id: new_resource.owner_user_id,
            owner_group_id: new_resource.owner_group_id,
            note: new_resource.note,
            created_at: chrono::Utc::now(),
        };
        self.resources.insert(resource.resource_id, resource.clone());
        resource
    }

    pub fn add_token(&mut self, owner_id: i32, token: &str, description: Option<&str>) -> AuthToken {
        self.last_token_id += 1;
        let row = AuthToken {
            id: self.last_token_id,
            token: token.to_owned(),
            owner_id,
            description: description.map(str::to_owned),
            created_at: chrono::Utc::now(),
        };
        self.tokens.insert(row.id, row.clone());
        row
    }

    #[must_use]
    pub fn resource(&self, resource_id: i32) -> Option<&Resource> {
        self.resources.get(&resource_id)
    }

    /// Children of `parent_id` ordered by position.
    #[must_use]
    pub fn children(&self, parent_id: Option<i32>) -> Vec<&Resource> {
        let mut children: Vec<&Resource> = self
            .resources
            .values()
            .filter(|r| r.parent_id == parent_id)
            .collect();
        children.sort_by_key(|r| r.ordering);
        children
    }

    fn subtree_ids(&self, resource_id: i32) -> Vec<i32> {
        let mut ids = vec![resource_id];
        let mut cursor = 0;
        while let Some(&current) = ids.get(cursor) {
            ids.extend(
                self.resources
                    .values()
                    .filter(|r| r.parent_id == Some(current))
                    .map(|r| r.resource_id),
            );
            cursor += 1;
        }
        ids
    }

    fn walk_children(
        &self,
        parent_id: Option<i32>,
        depth: i32,
        limit_depth: Option<i32>,
        out: &mut Vec<TreeRow>,
    ) {
        if limit_depth.is_some_and(|limit| depth > limit) {
            return;
        }
        for child in self.children(parent_id) {
            out.push(TreeRow {
                resource: child.clone(),
                depth,
            });
            self.walk_children(Some(child.resource_id), depth + 1, limit_depth, out);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    permission_queries: Arc<AtomicUsize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the state outside of any session, for seeding and inspection.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    /// Number of permission lookups served so far.
    #[must_use]
    pub fn permission_query_count(&self) -> usize {
        self.permission_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreSession>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemorySession {
            guard,
            snapshot: Some(snapshot),
            permission_queries: Arc::clone(&self.permission_queries),
        }))
    }
}

pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
    permission_queries: Arc<AtomicUsize>,
}

impl MemorySession {
    fn count_permission_query(&self) {
        self.permission_queries.fetch_add(1, Ordering::SeqCst);
    }

    fn group_ids(&self, user_id: i32) -> Vec<i32> {
        self.guard
            .memberships
            .iter()
            .filter(|(member, _)| *member == user_id)
            .map(|(_, group_id)| *group_id)
            .collect()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl TreeStore for MemorySession {
    async fn tree_node(&mut self, resource_id: i32) -> DbResult<Option<Resource>> {
        Ok(self.guard.resources.get(&resource_id).cloned())
    }

    async fn count_children(&mut self, parent_id: Option<i32>) -> DbResult<i32> {
        let count = self
            .guard
            .resources
            .values()
            .filter(|r| r.parent_id == parent_id)
            .count();
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn path_to_root(&mut self, node_id: i32) -> DbResult<Option<Vec<i32>>> {
        let mut path = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            let Some(node) = self.guard.resources.get(&current) else {
                break;
            };
            if path.contains(&current) {
                break;
            }
            path.push(current);
            cursor = node.parent_id;
        }
        Ok((!path.is_empty()).then_some(path))
    }

    async fn lock_sibling_set(&mut self, parent_id: Option<i32>) -> DbResult<()> {
        tracing::trace!(?parent_id, "Sibling set already held by session");
        Ok(())
    }

    async fn shift_siblings(
        &mut self,
        parent_id: Option<i32>,
        from: i32,
        to: i32,
        delta: i32,
    ) -> DbResult<()> {
        for resource in self.guard.resources.values_mut() {
            if resource.parent_id == parent_id && (from..=to).contains(&resource.ordering) {
                resource.ordering += delta;
            }
        }
        Ok(())
    }

    async fn place_node(
        &mut self,
        resource_id: i32,
        parent_id: Option<i32>,
        ordering: i32,
    ) -> DbResult<()> {
        let node = self
            .guard
            .resources
            .get_mut(&resource_id)
            .ok_or(TreeError::NodeNotFound(resource_id))?;
        node.parent_id = parent_id;
        node.ordering = ordering;
        Ok(())
    }

    async fn from_parent_deeper(
        &mut self,
        parent_id: Option<i32>,
        limit_depth: Option<i32>,
    ) -> DbResult<Vec<TreeRow>> {
        let mut rows = Vec::new();
        self.guard
            .walk_children(parent_id, 1, limit_depth, &mut rows);
        Ok(rows)
    }

    async fn delete_subtree(&mut self, resource_id: i32) -> DbResult<()> {
        let doomed: BTreeSet<i32> = self.guard.subtree_ids(resource_id).into_iter().collect();
        let state = &mut *self.guard;
        state.resources.retain(|id, _| !doomed.contains(id));
        state
            .user_resource_permissions
            .retain(|(_, id, _)| !doomed.contains(id));
        state
            .group_resource_permissions
            .retain(|(_, id, _)| !doomed.contains(id));
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for MemorySession {
    async fn resource_by_id(&mut self, resource_id: i32) -> DbResult<Option<Resource>> {
        Ok(self.guard.resources.get(&resource_id).cloned())
    }

    async fn insert_resource(&mut self, new_resource: NewResource) -> DbResult<Resource> {
        Ok(self.guard.insert_resource(new_resource))
    }

    async fn update_resource(
        &mut self,
        resource_id: i32,
        changes: &ResourceChanges,
    ) -> DbResult<Resource> {
        let resource = self
            .guard
            .resources
            .get_mut(&resource_id)
            .ok_or(TreeError::NodeNotFound(resource_id))?;
        changes.apply_to(resource);
        Ok(resource.clone())
    }

    async fn list_resources(
        &mut self,
        resource_type: ResourceType,
        page: i64,
        per_page: i64,
    ) -> DbResult<ResourcePage> {
        let matching: Vec<&Resource> = self
            .guard
            .resources
            .values()
            .filter(|r| r.resource_type == resource_type.as_str())
            .collect();
        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let skip = usize::try_from((page.max(1) - 1) * per_page).unwrap_or(usize::MAX);
        let take = usize::try_from(per_page).unwrap_or(0);
        let items = matching.into_iter().skip(skip).take(take).cloned().collect();
        Ok(ResourcePage {
            items,
            total,
            page,
            per_page,
        })
    }
}

#[async_trait]
impl PermissionStore for MemorySession {
    async fn user_permissions(&mut self, user_id: i32) -> DbResult<BTreeSet<String>> {
        self.count_permission_query();
        let group_ids = self.group_ids(user_id);
        let state = &*self.guard;
        let direct = state
            .user_permissions
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, name)| name.clone());
        let via_groups = state
            .group_permissions
            .iter()
            .filter(|(id, _)| group_ids.contains(id))
            .map(|(_, name)| name.clone());
        Ok(direct.chain(via_groups).collect())
    }

    async fn user_resource_permissions(
        &mut self,
        user_id: i32,
        resource_id: i32,
    ) -> DbResult<BTreeSet<String>> {
        self.count_permission_query();
        let group_ids = self.group_ids(user_id);
        let state = &*self.guard;
        let direct = state
            .user_resource_permissions
            .iter()
            .filter(|(id, res, _)| *id == user_id && *res == resource_id)
            .map(|(_, _, name)| name.clone());
        let via_groups = state
            .group_resource_permissions
            .iter()
            .filter(|(id, res, _)| group_ids.contains(id) && *res == resource_id)
            .map(|(_, _, name)| name.clone());
        Ok(direct.chain(via_groups).collect())
    }

    async fn grant_user_permission(&mut self, user_id: i32, perm_name: &str) -> DbResult<()> {
        self.guard.grant_user_permission(user_id, perm_name);
        Ok(())
    }

    async fn grant_group_permission(&mut self, group_id: i32, perm_name: &str) -> DbResult<()> {
        self.guard.grant_group_permission(group_id, perm_name);
        Ok(())
    }

    async fn revoke_user_permission(&mut self, user_id: i32, perm_name: &str) -> DbResult<bool> {
        Ok(self
            .guard
            .user_permissions
            .remove(&(user_id, perm_name.to_owned())))
    }

    async fn revoke_group_permission(
        &mut self,
        group_id: i32,
        perm_name: &str,
    ) -> DbResult<bool> {
        Ok(self
            .guard
            .group_permissions
            .remove(&(group_id, perm_name.to_owned())))
    }

    async fn grant_user_resource_permission(
        &mut self,
        user_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<()> {
        self.guard
            .grant_user_resource_permission(user_id, resource_id, perm_name);
        Ok(())
    }

    async fn revoke_user_resource_permission(
        &mut self,
        user_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<bool> {
        Ok(self
            .guard
            .user_resource_permissions
            .remove(&(user_id, resource_id, perm_name.to_owned())))
    }

    async fn grant_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<()> {
        self.guard
            .grant_group_resource_permission(group_id, resource_id, perm_name);
        Ok(())
    }

    async fn revoke_group_resource_permission(
        &mut self,
        group_id: i32,
        resource_id: i32,
        perm_name: &str,
    ) -> DbResult<bool> {
        Ok(self
            .guard
            .group_resource_permissions
            .remove(&(group_id, resource_id, perm_name.to_owned())))
    }
}

#[async_trait]
impl TokenStore for MemorySession {
    async fn lookup_by_token(&mut self, token: &str) -> DbResult<Option<AuthToken>> {
        Ok(self
            .guard
            .tokens
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn tokens_for_user(&mut self, owner_id: i32) -> DbResult<Vec<AuthToken>> {
        Ok(self
            .guard
            .tokens
            .values()
            .rev()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_token(
        &mut self,
        owner_id: i32,
        token: &str,
        description: Option<&str>,
    ) -> DbResult<AuthToken> {
        Ok(self.guard.add_token(owner_id, token, description))
    }

    async fn delete_token(&mut self, owner_id: i32, token_id: i32) -> DbResult<bool> {
        let owned = self
            .guard
            .tokens
            .get(&token_id)
            .is_some_and(|t| t.owner_id == owner_id);
        if owned {
            self.guard.tokens.remove(&token_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl UserStore for MemorySession {
    async fn user_by_id(&mut self, user_id: i32) -> DbResult<Option<User>> {
        Ok(self.guard.users.get(&user_id).cloned())
    }

    async fn user_by_name(&mut self, user_name: &str) -> DbResult<Option<User>> {
        Ok(self
            .guard
            .users
            .values()
            .find(|u| u.user_name == user_name)
            .cloned())
    }

    async fn group_ids_for_user(&mut self, user_id: i32) -> DbResult<Vec<i32>> {
        Ok(self.group_ids(user_id))
    }

    async fn group_by_id(&mut self, group_id: i32) -> DbResult<Option<Group>> {
        Ok(self.guard.groups.get(&group_id).cloned())
    }

    async fn add_group_member(&mut self, user_id: i32, group_id: i32) -> DbResult<bool> {
        Ok(self.guard.memberships.insert((user_id, group_id)))
    }

    async fn remove_group_member(&mut self, user_id: i32, group_id: i32) -> DbResult<bool> {
        Ok(self.guard.memberships.remove(&(user_id, group_id)))
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn commit(mut self: Box<Self>) -> DbResult<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        drop(self);
        Ok(())
    }
}
