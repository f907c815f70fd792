//! Authorization resolution and tree placement for arbor.
//!
//! ## Module Organization
//!
//! - `auth`: authentication policy selection, tokens, signed tickets, passwords
//! - `acl`: access-control list assembly and the first-match authorization walk
//! - `context`: per-request security context for global and resource routes
//! - `tree`: placement validation and the entry create/update/delete workflows
//! - `permissions`: resource permission grants and revocations
//! - `admin`: global permission grants and group membership

pub mod acl;
pub mod admin;
pub mod auth;
pub mod context;
pub mod error;
pub mod permissions;
pub mod tree;
