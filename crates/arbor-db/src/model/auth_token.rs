use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

/// Opaque API token that authenticates as its owner.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = schema::auth_tokens)]
#[diesel(check_for_backend(Pg))]
pub struct AuthToken {
    pub id: i32,
    pub token: String,
    pub owner_id: i32,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::auth_tokens)]
pub struct NewAuthToken<'a> {
    pub token: &'a str,
    pub owner_id: i32,
    pub description: Option<&'a str>,
}
