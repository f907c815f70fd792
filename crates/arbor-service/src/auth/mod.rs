//! Authentication flow.
//!
//! ## Module Organization
//!
//! - `selector`: picks token or ticket authentication per request and resolves the principal
//! - `token`: API token policy backed by the token store
//! - `ticket`: HMAC-signed cookie tickets
//! - `principal`: the authenticated user with its group memberships
//! - `depot`: helpers for reading request-scoped auth state from Salvo's depot
//! - `password`: password hashing and verification with Argon2

pub mod depot;
pub mod password;
pub mod principal;
pub mod selector;
pub mod ticket;
pub mod token;

pub use depot::{get_authentication_from_depot, get_context_from_depot, get_user_from_depot};
pub use principal::{Authentication, RequestUser};
pub use selector::{AuthPolicy, AuthenticationSelector, RequestCredentials, select_policy};
pub use ticket::TicketPolicy;
pub use token::TokenPolicy;
