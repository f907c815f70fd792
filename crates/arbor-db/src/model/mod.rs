pub mod auth_token;
pub mod group;
pub mod permission;
pub mod resource;
pub mod user;
