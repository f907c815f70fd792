/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_VERSION_COMPONENT: &str = "v1";
pub const API_ROUTE_PREFIX: &str =
    const_str::concat!("/", API_ROUTE_COMPONENT, "/", API_VERSION_COMPONENT);

pub const ENTRIES_ROUTE_COMPONENT: &str = "entries";
pub const ENTRIES_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", ENTRIES_ROUTE_COMPONENT);

pub const RESOURCES_ROUTE_COMPONENT: &str = "resources";
pub const RESOURCES_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", RESOURCES_ROUTE_COMPONENT);

pub const USERS_ROUTE_COMPONENT: &str = "users";
pub const GROUPS_ROUTE_COMPONENT: &str = "groups";

/// Path parameter carrying the resource, user or group id on object-scoped routes.
pub const OBJECT_ID_PARAM: &str = "object_id";

/// Well-known permission names.
pub mod permission {
    /// Equivalent to a grant of every permission.
    pub const ROOT_ADMINISTRATION: &str = "root_administration";
    /// Prerequisite for every other `admin_*` global permission.
    pub const ADMIN_PANEL: &str = "admin_panel";
    pub const ADMIN_PREFIX: &str = "admin_";
    pub const ADMIN_ENTRIES: &str = "admin_entries";
    pub const ADMIN_USERS: &str = "admin_users";
    pub const ADMIN_GROUPS: &str = "admin_groups";

    /// Permissions that can be granted to users and groups outside any resource.
    pub const GLOBAL: &[&str] = &[
        ROOT_ADMINISTRATION,
        ADMIN_PANEL,
        ADMIN_USERS,
        ADMIN_GROUPS,
        ADMIN_ENTRIES,
    ];

    /// Not granted directly; satisfied only by an all-permissions ACE.
    pub const OWNER: &str = "owner";
    pub const EDITOR: &str = "editor";
}
