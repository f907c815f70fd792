use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;
use arbor_core::types::ResourceType;

/// A node of the resource tree.
#[derive(
    Debug, Clone, PartialEq, Eq, Identifiable, Queryable, QueryableByName, Selectable, Serialize,
)]
#[diesel(table_name = schema::resources)]
#[diesel(primary_key(resource_id))]
#[diesel(check_for_backend(Pg))]
pub struct Resource {
    pub resource_id: i32,
    pub resource_name: String,
    pub resource_type: String,
    pub parent_id: Option<i32>,
    pub ordering: i32,
    pub owner_user_id: Option<i32>,
    pub owner_group_id: Option<i32>,
    pub note: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Resource {
    #[must_use]
    pub fn kind(&self) -> Option<ResourceType> {
        ResourceType::from_tag(&self.resource_type)
    }

    /// Permission names that may be granted on this resource.
    #[must_use]
    pub fn possible_permissions(&self) -> &'static [&'static str] {
        self.kind().map_or(&[], ResourceType::possible_permissions)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::resources)]
pub struct NewResource {
    pub resource_name: String,
    pub resource_type: String,
    pub parent_id: Option<i32>,
    pub ordering: i32,
    pub owner_user_id: Option<i32>,
    pub owner_group_id: Option<i32>,
    pub note: Option<String>,
}

/// Non-structural field updates. Parent and position changes go through the tree store.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::resources)]
pub struct ResourceChanges {
    pub resource_name: Option<String>,
    pub note: Option<Option<String>>,
}

impl ResourceChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.resource_name.is_none() && self.note.is_none()
    }

    pub fn apply_to(&self, resource: &mut Resource) {
        if let Some(name) = &self.resource_name {
            resource.resource_name.clone_from(name);
        }
        if let Some(note) = &self.note {
            resource.note.clone_from(note);
        }
    }
}

/// A descendant returned by a subtree walk, annotated with its depth below the start.
#[derive(Debug, Clone, PartialEq, Eq, QueryableByName, Serialize)]
pub struct TreeRow {
    #[diesel(embed)]
    #[serde(flatten)]
    pub resource: Resource,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub depth: i32,
}

/// One page of a resource listing.
#[derive(Debug, Clone)]
pub struct ResourcePage {
    pub items: Vec<Resource>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl ResourcePage {
    #[must_use]
    pub fn page_count(&self) -> i64 {
        if self.per_page <= 0 {
            return 0;
        }
        (self.total + self.per_page - 1) / self.per_page
    }
}
