//! Persistence for arbor: diesel schema and models, the store interfaces the
//! service layer talks to, and their PostgreSQL and in-memory implementations.

pub mod db;
pub mod error;
pub mod model;
