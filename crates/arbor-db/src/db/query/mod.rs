//! Query composition for the `PostgreSQL` store.

pub mod permission;
pub mod resource;
pub mod token;
pub mod tree;
pub mod user;
