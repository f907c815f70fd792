pub mod connection;
pub mod memory;
pub mod pg;
pub mod query;
pub mod schema;
pub mod store;

pub use store::{
    DataStore, PermissionStore, ResourceStore, StoreSession, TokenStore, TreeStore, UserStore,
};
