//! Placement checks for nodes in the resource tree: parent validity and
//! position bounds within a sibling set.

use arbor_db::db::TreeStore;
use arbor_db::error::DbResult;
use arbor_db::model::resource::Resource;

/// A requested parent change. `Set(None)` moves to the forest root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentUpdate {
    #[default]
    Unchanged,
    Set(Option<i32>),
}

impl ParentUpdate {
    /// The parent a node ends up under, given where it is now.
    #[must_use]
    pub const fn target(self, current: Option<i32>) -> Option<i32> {
        match self {
            Self::Unchanged => current,
            Self::Set(parent_id) => parent_id,
        }
    }

    /// Whether this update actually moves a node currently under `current`.
    #[must_use]
    pub fn changes(self, current: Option<i32>) -> bool {
        matches!(self, Self::Set(parent_id) if parent_id != current)
    }
}

/// What an update does to a node's place in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDecision {
    NoMove,
    Reorder {
        position: i32,
    },
    Reparent {
        parent_id: Option<i32>,
        position: i32,
    },
}

/// ## Summary
/// Checks that `node_id` (`None` for a node being created) may live under `new_parent_id`.
///
/// A root placement is always valid.
///
/// ## Errors
/// Returns `TreeError::MissingParent` or `TreeError::CyclicPath`, or a store error.
pub async fn validate_parent<S>(
    store: &mut S,
    node_id: Option<i32>,
    new_parent_id: Option<i32>,
) -> DbResult<()>
where
    S: TreeStore + ?Sized,
{
    match new_parent_id {
        None => Ok(()),
        Some(parent_id) => store.check_node_parent(node_id, parent_id).await,
    }
}

/// ## Summary
/// Checks a requested position against the sibling set the node will land in.
///
/// No position and position 1 are always valid. A node staying under its
/// parent may take `1..=count`; a new or reparented node may take `1..=count + 1`.
///
/// ## Errors
/// Returns `TreeError::OutOfBoundary`, or a store error.
pub async fn validate_position<S>(
    store: &mut S,
    existing: Option<&Resource>,
    parent: ParentUpdate,
    position: Option<i32>,
) -> DbResult<()>
where
    S: TreeStore + ?Sized,
{
    let Some(position) = position else {
        return Ok(());
    };
    if position == 1 {
        return Ok(());
    }

    let (target_parent, same_branch) = match existing {
        Some(resource) => (
            parent.target(resource.parent_id),
            !parent.changes(resource.parent_id),
        ),
        None => (parent.target(None), false),
    };

    store
        .check_node_position(target_parent, position, same_branch)
        .await
}

/// ## Summary
/// The position a new child of `parent_id` takes: the explicit one, or last.
///
/// Must run in the same session as the insert, after the sibling set is locked.
///
/// ## Errors
/// Returns a store error.
pub async fn resolve_insert_position<S>(
    store: &mut S,
    explicit_position: Option<i32>,
    parent_id: Option<i32>,
) -> DbResult<i32>
where
    S: TreeStore + ?Sized,
{
    match explicit_position {
        Some(position) => Ok(position),
        None => Ok(store.count_children(parent_id).await? + 1),
    }
}

/// ## Summary
/// Decides how an update relocates `existing`.
///
/// A reparent without a position appends after the new parent's last child.
///
/// ## Errors
/// Returns a store error.
pub async fn decide_move<S>(
    store: &mut S,
    existing: &Resource,
    parent: ParentUpdate,
    position: Option<i32>,
) -> DbResult<MoveDecision>
where
    S: TreeStore + ?Sized,
{
    if !parent.changes(existing.parent_id) {
        return Ok(match position {
            Some(position) if position != existing.ordering => MoveDecision::Reorder { position },
            _ => MoveDecision::NoMove,
        });
    }

    let parent_id = parent.target(existing.parent_id);
    let position = resolve_insert_position(store, position, parent_id).await?;
    Ok(MoveDecision::Reparent {
        parent_id,
        position,
    })
}
