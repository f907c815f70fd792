//! Query composition for `resources` rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::resources;
use crate::model::resource::{NewResource, Resource, ResourceChanges};

/// ## Summary
/// Loads a resource by id.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn by_id(conn: &mut DbConnection<'_>, resource_id: i32) -> QueryResult<Option<Resource>> {
    resources::table
        .find(resource_id)
        .select(Resource::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts a resource row.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    new_resource: &NewResource,
) -> QueryResult<Resource> {
    diesel::insert_into(resources::table)
        .values(new_resource)
        .returning(Resource::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Applies field changes to a resource and returns the updated row.
///
/// ## Errors
/// Returns an error if the database operation fails or the row is missing.
pub async fn update(
    conn: &mut DbConnection<'_>,
    resource_id: i32,
    changes: &ResourceChanges,
) -> QueryResult<Resource> {
    diesel::update(resources::table.find(resource_id))
        .set(changes)
        .returning(Resource::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Loads one page of resources of a type, oldest first.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn list_page(
    conn: &mut DbConnection<'_>,
    resource_type: &str,
    offset: i64,
    limit: i64,
) -> QueryResult<Vec<Resource>> {
    resources::table
        .filter(resources::resource_type.eq(resource_type))
        .order(resources::resource_id.asc())
        .offset(offset)
        .limit(limit)
        .select(Resource::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Counts resources of a type.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn count_by_type(conn: &mut DbConnection<'_>, resource_type: &str) -> QueryResult<i64> {
    resources::table
        .filter(resources::resource_type.eq(resource_type))
        .count()
        .get_result(conn)
        .await
}
