//! HTTP surface of the arbor tree administration backend.

pub mod app;
pub mod config;
pub mod db_handler;
pub mod error;
pub mod middleware;
