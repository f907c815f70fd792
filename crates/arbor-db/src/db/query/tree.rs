//! Ordered tree queries over `resources`.
//!
//! Sibling sets are matched with `IS NOT DISTINCT FROM` so the forest root
//! (`parent_id IS NULL`) behaves like any other parent.

use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable};
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::resources;
use crate::model::resource::{Resource, TreeRow};

/// Advisory lock class shared by every sibling-set lock.
const SIBLING_SET_LOCK_CLASS: i32 = 0x0A7B_0001;

#[derive(QueryableByName)]
struct PathRow {
    #[diesel(sql_type = Integer)]
    resource_id: i32,
}

/// ## Summary
/// Counts the direct children of `parent_id`.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn count_children(
    conn: &mut DbConnection<'_>,
    parent_id: Option<i32>,
) -> QueryResult<i64> {
    resources::table
        .filter(resources::parent_id.is_not_distinct_from(parent_id))
        .count()
        .get_result::<i64>(conn)
        .await
}

/// ## Summary
/// Loads the ids on the path from `node_id` up to its root, the node itself first.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn path_to_root(conn: &mut DbConnection<'_>, node_id: i32) -> QueryResult<Vec<i32>> {
    let rows = diesel::sql_query(
        "WITH RECURSIVE path (resource_id, parent_id, depth) AS ( \
             SELECT resource_id, parent_id, 0 FROM resources WHERE resource_id = $1 \
             UNION ALL \
             SELECT r.resource_id, r.parent_id, p.depth + 1 \
             FROM resources r JOIN path p ON r.resource_id = p.parent_id \
         ) \
         SELECT resource_id FROM path ORDER BY depth",
    )
    .bind::<Integer, _>(node_id)
    .load::<PathRow>(conn)
    .await?;

    Ok(rows.into_iter().map(|row| row.resource_id).collect())
}

/// ## Summary
/// Takes a transaction-scoped advisory lock on the sibling set of `parent_id`.
///
/// ## Side Effects
/// Blocks until concurrent transactions holding the same lock finish.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn lock_sibling_set(
    conn: &mut DbConnection<'_>,
    parent_id: Option<i32>,
) -> QueryResult<()> {
    diesel::sql_query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind::<Integer, _>(SIBLING_SET_LOCK_CLASS)
        .bind::<Integer, _>(parent_id.unwrap_or(0))
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Adds `delta` to the ordering of siblings whose position lies in `from..=to`.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn shift_siblings(
    conn: &mut DbConnection<'_>,
    parent_id: Option<i32>,
    from: i32,
    to: i32,
    delta: i32,
) -> QueryResult<usize> {
    diesel::update(
        resources::table
            .filter(resources::parent_id.is_not_distinct_from(parent_id))
            .filter(resources::ordering.between(from, to)),
    )
    .set(resources::ordering.eq(resources::ordering + delta))
    .execute(conn)
    .await
}

/// ## Summary
/// Writes the parent and position of a single node.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn place_node(
    conn: &mut DbConnection<'_>,
    resource_id: i32,
    parent_id: Option<i32>,
    ordering: i32,
) -> QueryResult<Resource> {
    diesel::update(resources::table.find(resource_id))
        .set((
            resources::parent_id.eq(parent_id),
            resources::ordering.eq(ordering),
        ))
        .returning(Resource::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Walks the subtree under `parent_id` in depth-first sibling order.
///
/// Direct children have depth 1. With `limit_depth` set, nothing deeper than
/// that depth is returned.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn from_parent_deeper(
    conn: &mut DbConnection<'_>,
    parent_id: Option<i32>,
    limit_depth: Option<i32>,
) -> QueryResult<Vec<TreeRow>> {
    diesel::sql_query(
        "WITH RECURSIVE subtree AS ( \
             SELECT r.*, 1 AS depth, ARRAY[r.ordering] AS sorting \
             FROM resources r WHERE r.parent_id IS NOT DISTINCT FROM $1 \
             UNION ALL \
             SELECT r.*, s.depth + 1, s.sorting || r.ordering \
             FROM resources r JOIN subtree s ON r.parent_id = s.resource_id \
             WHERE $2::int IS NULL OR s.depth < $2 \
         ) \
         SELECT resource_id, resource_name, resource_type, parent_id, ordering, \
                owner_user_id, owner_group_id, note, created_at, depth \
         FROM subtree ORDER BY sorting",
    )
    .bind::<Nullable<Integer>, _>(parent_id)
    .bind::<Nullable<Integer>, _>(limit_depth)
    .load::<TreeRow>(conn)
    .await
}

/// ## Summary
/// Deletes a node together with every descendant.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn delete_subtree(conn: &mut DbConnection<'_>, resource_id: i32) -> QueryResult<usize> {
    diesel::sql_query(
        "WITH RECURSIVE subtree AS ( \
             SELECT resource_id FROM resources WHERE resource_id = $1 \
             UNION ALL \
             SELECT r.resource_id FROM resources r JOIN subtree s ON r.parent_id = s.resource_id \
         ) \
         DELETE FROM resources WHERE resource_id IN (SELECT resource_id FROM subtree)",
    )
    .bind::<Integer, _>(resource_id)
    .execute(conn)
    .await
}
