//! Permission grant rows. Global grants have no resource; resource grants name one.

use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::users_permissions)]
#[diesel(check_for_backend(Pg))]
pub struct UserPermission {
    pub user_id: i32,
    pub perm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::groups_permissions)]
#[diesel(check_for_backend(Pg))]
pub struct GroupPermission {
    pub group_id: i32,
    pub perm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = schema::users_resources_permissions)]
#[diesel(check_for_backend(Pg))]
pub struct UserResourcePermission {
    pub user_id: i32,
    pub resource_id: i32,
    pub perm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = schema::groups_resources_permissions)]
#[diesel(check_for_backend(Pg))]
pub struct GroupResourcePermission {
    pub group_id: i32,
    pub resource_id: i32,
    pub perm_name: String,
}
