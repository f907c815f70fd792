//! Query composition for `auth_tokens`.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::auth_tokens;
use crate::model::auth_token::{AuthToken, NewAuthToken};

/// ## Summary
/// Finds a token row by its secret value.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn by_token(conn: &mut DbConnection<'_>, token: &str) -> QueryResult<Option<AuthToken>> {
    auth_tokens::table
        .filter(auth_tokens::token.eq(token))
        .select(AuthToken::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Lists a user's tokens, newest first.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn by_owner(conn: &mut DbConnection<'_>, owner_id: i32) -> QueryResult<Vec<AuthToken>> {
    auth_tokens::table
        .filter(auth_tokens::owner_id.eq(owner_id))
        .order(auth_tokens::id.desc())
        .select(AuthToken::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Inserts a token.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    new_token: &NewAuthToken<'_>,
) -> QueryResult<AuthToken> {
    diesel::insert_into(auth_tokens::table)
        .values(new_token)
        .returning(AuthToken::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Deletes a token if it belongs to `owner_id`.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn delete_owned(
    conn: &mut DbConnection<'_>,
    owner_id: i32,
    token_id: i32,
) -> QueryResult<usize> {
    diesel::delete(
        auth_tokens::table
            .filter(auth_tokens::id.eq(token_id))
            .filter(auth_tokens::owner_id.eq(owner_id)),
    )
    .execute(conn)
    .await
}
