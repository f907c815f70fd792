use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = schema::groups)]
#[diesel(check_for_backend(Pg))]
pub struct Group {
    pub id: i32,
    pub group_name: String,
    pub description: Option<String>,
}
