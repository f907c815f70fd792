//! Entry workflows: create, update, delete, list and walk.
//!
//! Each mutation locks the sibling sets it touches before counting, so the
//! count-then-mutate sequence cannot interleave with another request.

use serde::{Deserialize, Deserializer};

use super::placement::{
    MoveDecision, ParentUpdate, decide_move, resolve_insert_position, validate_parent,
    validate_position,
};
use crate::auth::RequestUser;
use crate::error::{FieldErrors, ServiceError, ServiceResult};
use arbor_core::types::ResourceType;
use arbor_db::db::{ResourceStore, TreeStore};
use arbor_db::error::DbResult;
use arbor_db::model::resource::{NewResource, Resource, ResourceChanges, ResourcePage, TreeRow};

pub const ENTRIES_PER_PAGE: i64 = 50;

const RESOURCE_NAME_MAX_CHARS: usize = 100;

/// Body of an entry creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInput {
    pub resource_name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub ordering: Option<i32>,
}

/// Body of an entry update. Absent fields are left alone; an explicit
/// `"parent_id": null` moves the entry to the root level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<i32>>,
    #[serde(default)]
    pub ordering: Option<i32>,
}

impl EntryPatch {
    #[must_use]
    pub fn parent_update(&self) -> ParentUpdate {
        self.parent_id.map_or(ParentUpdate::Unchanged, ParentUpdate::Set)
    }
}

/// Distinguishes a field sent as `null` from a missing one.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.trim().is_empty() {
        errors.insert("resource_name", "resource_name must not be empty");
    } else if name.chars().count() > RESOURCE_NAME_MAX_CHARS {
        errors.insert(
            "resource_name",
            format!("resource_name must be at most {RESOURCE_NAME_MAX_CHARS} characters"),
        );
    }
}

/// Locks each distinct sibling set once, in ascending key order.
async fn lock_sibling_sets<S>(store: &mut S, parents: &[Option<i32>]) -> DbResult<()>
where
    S: TreeStore + ?Sized,
{
    let mut keys = parents.to_vec();
    keys.sort_by_key(|parent_id| parent_id.unwrap_or(0));
    keys.dedup();
    for parent_id in keys {
        store.lock_sibling_set(parent_id).await?;
    }
    Ok(())
}

async fn reload<S>(store: &mut S, resource_id: i32) -> ServiceResult<Resource>
where
    S: ResourceStore + ?Sized,
{
    store
        .resource_by_id(resource_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("resource {resource_id}")))
}

/// ## Summary
/// Creates an entry owned by `owner` under the requested parent and position.
///
/// ## Side Effects
/// Inserts the entry as last child, then moves it to the requested position.
///
/// ## Errors
/// Returns `Validation` with every offending field, or a store error.
#[tracing::instrument(skip(store, owner, input), fields(owner_id = owner.id()))]
pub async fn create_entry<S>(
    store: &mut S,
    owner: &RequestUser,
    input: EntryInput,
) -> ServiceResult<Resource>
where
    S: TreeStore + ResourceStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    check_name(&mut errors, &input.resource_name);

    store.lock_sibling_set(input.parent_id).await?;

    let parent_ok = errors.collect(
        "parent_id",
        validate_parent(store, None, input.parent_id).await,
    )?;
    if parent_ok {
        errors.collect(
            "ordering",
            validate_position(store, None, ParentUpdate::Set(input.parent_id), input.ordering)
                .await,
        )?;
    }
    errors.into_result()?;

    let append_at = resolve_insert_position(store, None, input.parent_id).await?;
    let position = resolve_insert_position(store, input.ordering, input.parent_id).await?;

    let created = store
        .insert_resource(NewResource {
            resource_name: input.resource_name,
            resource_type: ResourceType::Entry.as_str().to_owned(),
            parent_id: input.parent_id,
            ordering: append_at,
            owner_user_id: Some(owner.id()),
            owner_group_id: None,
            note: input.note,
        })
        .await?;

    if position != append_at {
        store.set_position(created.resource_id, position).await?;
    }

    tracing::info!(
        resource_id = created.resource_id,
        parent_id = ?created.parent_id,
        position,
        "Entry created"
    );

    reload(store, created.resource_id).await
}

/// ## Summary
/// Applies field changes and any reorder or reparent an update asks for.
///
/// ## Errors
/// Returns `Validation` with every offending field, or a store error.
#[tracing::instrument(skip(store, resource, patch), fields(resource_id = resource.resource_id))]
pub async fn update_entry<S>(
    store: &mut S,
    resource: &Resource,
    patch: EntryPatch,
) -> ServiceResult<Resource>
where
    S: TreeStore + ResourceStore + ?Sized,
{
    let parent = patch.parent_update();
    lock_sibling_sets(
        store,
        &[resource.parent_id, parent.target(resource.parent_id)],
    )
    .await?;
    let resource = reload(store, resource.resource_id).await?;

    let mut errors = FieldErrors::new();
    if let Some(name) = &patch.resource_name {
        check_name(&mut errors, name);
    }

    let parent_ok = if parent.changes(resource.parent_id) {
        errors.collect(
            "parent_id",
            validate_parent(
                store,
                Some(resource.resource_id),
                parent.target(resource.parent_id),
            )
            .await,
        )?
    } else {
        true
    };
    if parent_ok {
        errors.collect(
            "ordering",
            validate_position(store, Some(&resource), parent, patch.ordering).await,
        )?;
    }
    errors.into_result()?;

    match decide_move(store, &resource, parent, patch.ordering).await? {
        MoveDecision::NoMove => {}
        MoveDecision::Reorder { position } => {
            store.set_position(resource.resource_id, position).await?;
            tracing::debug!(position, "Entry reordered");
        }
        MoveDecision::Reparent {
            parent_id,
            position,
        } => {
            store
                .move_to_position(resource.resource_id, parent_id, position)
                .await?;
            tracing::debug!(?parent_id, position, "Entry moved to new parent");
        }
    }

    let changes = ResourceChanges {
        resource_name: patch.resource_name,
        note: patch.note,
    };
    Ok(store.update_resource(resource.resource_id, &changes).await?)
}

/// ## Summary
/// Deletes an entry and its whole subtree.
///
/// ## Errors
/// Returns a store error.
#[tracing::instrument(skip(store, resource), fields(resource_id = resource.resource_id))]
pub async fn delete_entry<S>(store: &mut S, resource: &Resource) -> ServiceResult<()>
where
    S: TreeStore + ?Sized,
{
    store.lock_sibling_set(resource.parent_id).await?;
    store.delete_branch(resource.resource_id).await?;
    tracing::info!(resource_name = %resource.resource_name, "Entry deleted");
    Ok(())
}

/// ## Summary
/// Descendants of an entry in tree order, at most `depth` levels down.
///
/// ## Errors
/// Returns `BadRequest` for a depth below 1, or a store error.
pub async fn entry_children<S>(
    store: &mut S,
    resource: &Resource,
    depth: Option<i32>,
) -> ServiceResult<Vec<TreeRow>>
where
    S: TreeStore + ?Sized,
{
    if depth.is_some_and(|d| d < 1) {
        return Err(ServiceError::BadRequest("depth must be at least 1".to_string()));
    }
    Ok(store
        .from_parent_deeper(Some(resource.resource_id), depth)
        .await?)
}

/// ## Summary
/// One page of entries. Pages are 1-based; anything lower reads page 1.
///
/// ## Errors
/// Returns a store error.
pub async fn list_entries<S>(store: &mut S, page: i64) -> ServiceResult<ResourcePage>
where
    S: ResourceStore + ?Sized,
{
    Ok(store
        .list_resources(ResourceType::Entry, page.max(1), ENTRIES_PER_PAGE)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_db::db::memory::MemoryStore;
    use arbor_db::db::{DataStore, StoreSession};

    async fn owner(store: &MemoryStore) -> RequestUser {
        store
            .with_state(|s| RequestUser {
                user: s.add_user("alice", "alice@example.com", "x"),
                group_ids: Vec::new(),
            })
            .await
    }

    fn input(name: &str, parent_id: Option<i32>, ordering: Option<i32>) -> EntryInput {
        EntryInput {
            resource_name: name.to_owned(),
            note: None,
            parent_id,
            ordering,
        }
    }

    async fn positions(
        session: &mut dyn StoreSession,
        parent_id: Option<i32>,
    ) -> Vec<(String, i32)> {
        session
            .from_parent_deeper(parent_id, Some(1))
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.resource.resource_name, row.resource.ordering))
            .collect()
    }

    #[test_log::test(tokio::test)]
    async fn create_at_requested_position_shifts_siblings() {
        let store = MemoryStore::new();
        let owner = owner(&store).await;
        let mut session = store.begin().await.unwrap();

        let parent = create_entry(session.as_mut(), &owner, input("parent", None, None))
            .await
            .unwrap();
        for name in ["a", "b", "c", "d"] {
            create_entry(session.as_mut(), &owner, input(name, Some(parent.resource_id), None))
                .await
                .unwrap();
        }

        let created = create_entry(
            session.as_mut(),
            &owner,
            input("new", Some(parent.resource_id), Some(2)),
        )
        .await
        .unwrap();
        assert_eq!(created.ordering, 2);
        assert_eq!(created.owner_user_id, Some(owner.id()));
        assert_eq!(
            positions(session.as_mut(), Some(parent.resource_id)).await,
            vec![
                ("a".to_owned(), 1),
                ("new".to_owned(), 2),
                ("b".to_owned(), 3),
                ("c".to_owned(), 4),
                ("d".to_owned(), 5),
            ]
        );
    }

    #[test_log::test(tokio::test)]
    async fn create_collects_every_field_error() {
        let store = MemoryStore::new();
        let owner = owner(&store).await;
        let mut session = store.begin().await.unwrap();

        let result = create_entry(session.as_mut(), &owner, input("", Some(99), Some(3))).await;
        let Err(ServiceError::Validation(errors)) = result else {
            panic!("expected validation failure, got {result:?}");
        };
        assert_eq!(errors.get("resource_name"), Some("resource_name must not be empty"));
        assert_eq!(errors.get("parent_id"), Some("parent not found"));
        assert_eq!(errors.get("ordering"), None);

        let result = create_entry(session.as_mut(), &owner, input("x", None, Some(3))).await;
        let Err(ServiceError::Validation(errors)) = result else {
            panic!("expected validation failure, got {result:?}");
        };
        assert_eq!(errors.get("ordering"), Some("position must be between 1 and 1"));
    }

    #[test_log::test(tokio::test)]
    async fn update_reorders_within_bounds_only() {
        let store = MemoryStore::new();
        let owner = owner(&store).await;
        let mut session = store.begin().await.unwrap();

        let parent = create_entry(session.as_mut(), &owner, input("parent", None, None))
            .await
            .unwrap();
        let mut children = Vec::new();
        for name in ["a", "b", "c", "d"] {
            children.push(
                create_entry(session.as_mut(), &owner, input(name, Some(parent.resource_id), None))
                    .await
                    .unwrap(),
            );
        }

        let rejected = update_entry(
            session.as_mut(),
            &children[1],
            EntryPatch {
                ordering: Some(5),
                ..EntryPatch::default()
            },
        )
        .await;
        let Err(ServiceError::Validation(errors)) = rejected else {
            panic!("expected validation failure, got {rejected:?}");
        };
        assert_eq!(errors.get("ordering"), Some("position must be between 1 and 4"));

        let moved = update_entry(
            session.as_mut(),
            &children[1],
            EntryPatch {
                ordering: Some(4),
                resource_name: Some("b2".to_owned()),
                ..EntryPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.ordering, 4);
        assert_eq!(moved.resource_name, "b2");
        assert_eq!(
            positions(session.as_mut(), Some(parent.resource_id)).await,
            vec![
                ("a".to_owned(), 1),
                ("c".to_owned(), 2),
                ("d".to_owned(), 3),
                ("b2".to_owned(), 4),
            ]
        );
    }

    #[test_log::test(tokio::test)]
    async fn update_reparents_and_rejects_cycles() {
        let store = MemoryStore::new();
        let owner = owner(&store).await;
        let mut session = store.begin().await.unwrap();

        let first = create_entry(session.as_mut(), &owner, input("first", None, None))
            .await
            .unwrap();
        let second = create_entry(session.as_mut(), &owner, input("second", None, None))
            .await
            .unwrap();
        let child = create_entry(session.as_mut(), &owner, input("child", Some(first.resource_id), None))
            .await
            .unwrap();

        let cyclic = update_entry(
            session.as_mut(),
            &first,
            EntryPatch {
                parent_id: Some(Some(child.resource_id)),
                ..EntryPatch::default()
            },
        )
        .await;
        let Err(ServiceError::Validation(errors)) = cyclic else {
            panic!("expected validation failure, got {cyclic:?}");
        };
        assert_eq!(
            errors.get("parent_id"),
            Some("cannot nest a resource under itself or its own descendant")
        );

        let moved = update_entry(
            session.as_mut(),
            &second,
            EntryPatch {
                parent_id: Some(Some(first.resource_id)),
                ..EntryPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.parent_id, Some(first.resource_id));
        assert_eq!(moved.ordering, 2);
        assert_eq!(positions(session.as_mut(), None).await, vec![("first".to_owned(), 1)]);

        let to_root = update_entry(
            session.as_mut(),
            &child,
            EntryPatch {
                parent_id: Some(None),
                ordering: Some(1),
                ..EntryPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!((to_root.parent_id, to_root.ordering), (None, 1));
        assert_eq!(
            positions(session.as_mut(), None).await,
            vec![("child".to_owned(), 1), ("first".to_owned(), 2)]
        );
        assert_eq!(
            positions(session.as_mut(), Some(first.resource_id)).await,
            vec![("second".to_owned(), 1)]
        );
    }

    #[test_log::test(tokio::test)]
    async fn delete_closes_gap_and_children_walk_respects_depth() {
        let store = MemoryStore::new();
        let owner = owner(&store).await;
        let mut session = store.begin().await.unwrap();

        let mut roots = Vec::new();
        for name in ["a", "b", "c", "d"] {
            roots.push(
                create_entry(session.as_mut(), &owner, input(name, None, None))
                    .await
                    .unwrap(),
            );
        }
        let child = create_entry(session.as_mut(), &owner, input("b1", Some(roots[1].resource_id), None))
            .await
            .unwrap();
        create_entry(session.as_mut(), &owner, input("b1a", Some(child.resource_id), None))
            .await
            .unwrap();

        let walked = entry_children(session.as_mut(), &roots[1], None).await.unwrap();
        assert_eq!(walked.len(), 2);
        let shallow = entry_children(session.as_mut(), &roots[1], Some(1)).await.unwrap();
        assert_eq!(shallow.len(), 1);
        assert!(matches!(
            entry_children(session.as_mut(), &roots[1], Some(0)).await,
            Err(ServiceError::BadRequest(_))
        ));

        delete_entry(session.as_mut(), &roots[1]).await.unwrap();
        assert_eq!(
            positions(session.as_mut(), None).await,
            vec![("a".to_owned(), 1), ("c".to_owned(), 2), ("d".to_owned(), 3)]
        );
        assert!(session.resource_by_id(child.resource_id).await.unwrap().is_none());

        let page = list_entries(session.as_mut(), 0).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn patch_distinguishes_null_parent_from_absent() {
        let absent: EntryPatch = serde_json::from_str(r#"{"ordering": 2}"#).unwrap();
        assert_eq!(absent.parent_update(), ParentUpdate::Unchanged);

        let null: EntryPatch = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(null.parent_update(), ParentUpdate::Set(None));

        let set: EntryPatch = serde_json::from_str(r#"{"parent_id": 4, "note": null}"#).unwrap();
        assert_eq!(set.parent_update(), ParentUpdate::Set(Some(4)));
        assert_eq!(set.note, Some(None));
    }
}
