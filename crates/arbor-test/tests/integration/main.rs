//! End-to-end tests driving the full router over the in-memory store.

mod authentication;
mod authorization;
mod entries;
