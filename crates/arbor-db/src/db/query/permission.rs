//! Query composition for global and resource-scoped permission grants.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{
    groups_permissions, groups_resources_permissions, users_groups, users_permissions,
    users_resources_permissions,
};
use crate::model::permission::{
    GroupPermission, GroupResourcePermission, UserPermission, UserResourcePermission,
};

/// ## Summary
/// Loads global permission names granted to a user directly and through its groups.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn for_user(conn: &mut DbConnection<'_>, user_id: i32) -> QueryResult<Vec<String>> {
    let mut names = users_permissions::table
        .filter(users_permissions::user_id.eq(user_id))
        .select(users_permissions::perm_name)
        .load::<String>(conn)
        .await?;

    let via_groups = groups_permissions::table
        .inner_join(
            users_groups::table.on(users_groups::group_id.eq(groups_permissions::group_id)),
        )
        .filter(users_groups::user_id.eq(user_id))
        .select(groups_permissions::perm_name)
        .load::<String>(conn)
        .await?;

    names.extend(via_groups);
    Ok(names)
}

/// ## Summary
/// Loads permission names a user holds on one resource, directly and through its groups.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn for_user_on_resource(
    conn: &mut DbConnection<'_>,
    user_id: i32,
    resource_id: i32,
) -> QueryResult<Vec<String>> {
    let mut names = users_resources_permissions::table
        .filter(users_resources_permissions::user_id.eq(user_id))
        .filter(users_resources_permissions::resource_id.eq(resource_id))
        .select(users_resources_permissions::perm_name)
        .load::<String>(conn)
        .await?;

    let via_groups = groups_resources_permissions::table
        .inner_join(
            users_groups::table
                .on(users_groups::group_id.eq(groups_resources_permissions::group_id)),
        )
        .filter(users_groups::user_id.eq(user_id))
        .filter(groups_resources_permissions::resource_id.eq(resource_id))
        .select(groups_resources_permissions::perm_name)
        .load::<String>(conn)
        .await?;

    names.extend(via_groups);
    Ok(names)
}

/// ## Summary
/// Grants a global permission to a user. Existing grants are left untouched.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn grant_user(conn: &mut DbConnection<'_>, row: &UserPermission) -> QueryResult<()> {
    diesel::insert_into(users_permissions::table)
        .values(row)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Grants a global permission to a group. Existing grants are left untouched.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn grant_group(conn: &mut DbConnection<'_>, row: &GroupPermission) -> QueryResult<()> {
    diesel::insert_into(groups_permissions::table)
        .values(row)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Removes a user's global permission and reports how many rows went away.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn revoke_user(conn: &mut DbConnection<'_>, row: &UserPermission) -> QueryResult<usize> {
    diesel::delete(
        users_permissions::table
            .filter(users_permissions::user_id.eq(row.user_id))
            .filter(users_permissions::perm_name.eq(&row.perm_name)),
    )
    .execute(conn)
    .await
}

/// ## Summary
/// Removes a group's global permission and reports how many rows went away.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn revoke_group(
    conn: &mut DbConnection<'_>,
    row: &GroupPermission,
) -> QueryResult<usize> {
    diesel::delete(
        groups_permissions::table
            .filter(groups_permissions::group_id.eq(row.group_id))
            .filter(groups_permissions::perm_name.eq(&row.perm_name)),
    )
    .execute(conn)
    .await
}

/// ## Summary
/// Grants a resource permission to a user. Existing grants are left untouched.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn grant_user_resource(
    conn: &mut DbConnection<'_>,
    row: &UserResourcePermission,
) -> QueryResult<()> {
    diesel::insert_into(users_resources_permissions::table)
        .values(row)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Removes a user's resource permission and reports how many rows went away.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn revoke_user_resource(
    conn: &mut DbConnection<'_>,
    row: &UserResourcePermission,
) -> QueryResult<usize> {
    diesel::delete(
        users_resources_permissions::table
            .filter(users_resources_permissions::user_id.eq(row.user_id))
            .filter(users_resources_permissions::resource_id.eq(row.resource_id))
            .filter(users_resources_permissions::perm_name.eq(&row.perm_name)),
    )
    .execute(conn)
    .await
}

/// ## Summary
/// Grants a resource permission to a group. Existing grants are left untouched.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn grant_group_resource(
    conn: &mut DbConnection<'_>,
    row: &GroupResourcePermission,
) -> QueryResult<()> {
    diesel::insert_into(groups_resources_permissions::table)
        .values(row)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Removes a group's resource permission and reports how many rows went away.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn revoke_group_resource(
    conn: &mut DbConnection<'_>,
    row: &GroupResourcePermission,
) -> QueryResult<usize> {
    diesel::delete(
        groups_resources_permissions::table
            .filter(groups_resources_permissions::group_id.eq(row.group_id))
            .filter(groups_resources_permissions::resource_id.eq(row.resource_id))
            .filter(groups_resources_permissions::perm_name.eq(&row.perm_name)),
    )
    .execute(conn)
    .await
}
