//! Query composition for users and their group memberships.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{groups, users, users_groups};
use crate::model::group::Group;
use crate::model::user::{Membership, User};

/// ## Summary
/// Loads a user by id.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn by_id(conn: &mut DbConnection<'_>, user_id: i32) -> QueryResult<Option<User>> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Loads a user by login name.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn by_name(conn: &mut DbConnection<'_>, user_name: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::user_name.eq(user_name))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Lists the ids of groups a user belongs to.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn group_ids(conn: &mut DbConnection<'_>, user_id: i32) -> QueryResult<Vec<i32>> {
    users_groups::table
        .filter(users_groups::user_id.eq(user_id))
        .order(users_groups::group_id.asc())
        .select(users_groups::group_id)
        .load(conn)
        .await
}

/// ## Summary
/// Loads a group by id.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn group_by_id(conn: &mut DbConnection<'_>, group_id: i32) -> QueryResult<Option<Group>> {
    groups::table
        .find(group_id)
        .select(Group::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Adds a user to a group. Returns the number of rows inserted, zero for an existing membership.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn add_membership(conn: &mut DbConnection<'_>, row: &Membership) -> QueryResult<usize> {
    diesel::insert_into(users_groups::table)
        .values(row)
        .on_conflict_do_nothing()
        .execute(conn)
        .await
}

/// ## Summary
/// Removes a user from a group and reports how many rows went away.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn remove_membership(
    conn: &mut DbConnection<'_>,
    row: &Membership,
) -> QueryResult<usize> {
    diesel::delete(
        users_groups::table
            .filter(users_groups::user_id.eq(row.user_id))
            .filter(users_groups::group_id.eq(row.group_id)),
    )
    .execute(conn)
    .await
}
