//! Per-request choice between token and ticket authentication.

use std::collections::HashMap;

use salvo::http::cookie::Cookie;

use super::principal::{Authentication, RequestUser};
use super::ticket::TicketPolicy;
use super::token::TokenPolicy;
use crate::error::{ServiceError, ServiceResult};
use arbor_core::config::AuthConfig;
use arbor_db::db::{TokenStore, UserStore};

pub const TOKEN_POLICY_KEY: &str = "token";
pub const TICKET_POLICY_KEY: &str = "ticket";

/// The credential material a request carries, extracted once from headers and cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    pub token: Option<String>,
    pub ticket: Option<String>,
}

impl RequestCredentials {
    #[must_use]
    pub fn from_request(req: &salvo::Request, config: &AuthConfig) -> Self {
        let token = req
            .headers()
            .get(config.token_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let ticket = req
            .cookie(config.ticket.cookie_name.as_str())
            .map(|cookie| cookie.value().to_owned());
        Self { token, ticket }
    }
}

/// ## Summary
/// Picks the policy key for a request: a non-empty token header selects
/// token authentication, anything else falls back to the ticket cookie.
#[must_use]
pub fn select_policy(credentials: &RequestCredentials) -> &'static str {
    if credentials.token.as_deref().is_some_and(|t| !t.is_empty()) {
        TOKEN_POLICY_KEY
    } else {
        TICKET_POLICY_KEY
    }
}

#[derive(Debug, Clone)]
pub enum AuthPolicy {
    Token(TokenPolicy),
    Ticket(TicketPolicy),
}

impl AuthPolicy {
    /// ## Summary
    /// Extracts the claimed user id without checking that the user still exists.
    ///
    /// ## Errors
    /// Returns an error if the token lookup fails or the ticket secret is unusable.
    pub async fn unauthenticated_userid<S>(
        &self,
        credentials: &RequestCredentials,
        store: &mut S,
    ) -> ServiceResult<Option<i32>>
    where
        S: TokenStore + ?Sized,
    {
        match self {
            Self::Token(policy) => {
                policy
                    .unauthenticated_userid(credentials.token.as_deref(), store)
                    .await
            }
            Self::Ticket(policy) => policy.unauthenticated_userid(credentials.ticket.as_deref()),
        }
    }

    /// ## Summary
    /// Cookies that establish a session. Token authentication has none.
    ///
    /// ## Errors
    /// Returns an error if a ticket cannot be signed.
    pub fn remember(&self, user_id: i32) -> ServiceResult<Vec<Cookie<'static>>> {
        match self {
            Self::Token(_) => Ok(Vec::new()),
            Self::Ticket(policy) => policy.remember(user_id),
        }
    }

    #[must_use]
    pub fn forget(&self) -> Vec<Cookie<'static>> {
        match self {
            Self::Token(_) => Vec::new(),
            Self::Ticket(policy) => policy.forget(),
        }
    }
}

/// Registry of authentication policies plus the function that picks one per request.
#[derive(Debug, Clone)]
pub struct AuthenticationSelector {
    policies: HashMap<String, AuthPolicy>,
    selector: fn(&RequestCredentials) -> &'static str,
}

impl AuthenticationSelector {
    /// ## Summary
    /// Registers the token and ticket policies under their standard keys.
    ///
    /// ## Errors
    /// Returns `Configuration` if the ticket policy cannot be built.
    pub fn from_config(config: &AuthConfig) -> ServiceResult<Self> {
        let policies = HashMap::from([
            (
                TOKEN_POLICY_KEY.to_string(),
                AuthPolicy::Token(TokenPolicy),
            ),
            (
                TICKET_POLICY_KEY.to_string(),
                AuthPolicy::Ticket(TicketPolicy::new(&config.ticket)?),
            ),
        ]);
        Ok(Self::new(policies, select_policy))
    }

    #[must_use]
    pub fn new(
        policies: HashMap<String, AuthPolicy>,
        selector: fn(&RequestCredentials) -> &'static str,
    ) -> Self {
        Self { policies, selector }
    }

    /// ## Summary
    /// Selects the policy for a request.
    ///
    /// ## Errors
    /// Returns `Configuration` when the selector names an unregistered policy.
    pub fn policy_for(
        &self,
        credentials: &RequestCredentials,
    ) -> ServiceResult<(&'static str, &AuthPolicy)> {
        let key = (self.selector)(credentials);
        let policy = self.policies.get(key).ok_or_else(|| {
            ServiceError::Configuration(format!(
                "authentication policy {key} is not registered"
            ))
        })?;
        Ok((key, policy))
    }

    /// ## Summary
    /// Resolves the request principal through the selected policy.
    ///
    /// An id that no longer maps to a user is treated as anonymous.
    ///
    /// ## Errors
    /// Returns `Configuration` for an unknown policy key, or a store error.
    #[tracing::instrument(skip_all, fields(policy = tracing::field::Empty))]
    pub async fn authenticate<S>(
        &self,
        credentials: &RequestCredentials,
        store: &mut S,
    ) -> ServiceResult<Authentication>
    where
        S: TokenStore + UserStore + ?Sized,
    {
        let (policy_key, policy) = self.policy_for(credentials)?;
        tracing::Span::current().record("policy", policy_key);

        let user = match policy.unauthenticated_userid(credentials, store).await? {
            Some(user_id) => RequestUser::load(store, user_id).await?,
            None => None,
        };

        tracing::debug!(
            policy = policy_key,
            user_id = user.as_ref().map(RequestUser::id),
            "Request authenticated"
        );

        Ok(Authentication {
            policy_key: policy_key.to_string(),
            user,
        })
    }

    /// ## Summary
    /// Session-establishing cookies from the policy selected for this request.
    ///
    /// ## Errors
    /// Returns `Configuration` for an unknown policy key or an unusable ticket secret.
    pub fn remember(
        &self,
        credentials: &RequestCredentials,
        user_id: i32,
    ) -> ServiceResult<Vec<Cookie<'static>>> {
        let (_, policy) = self.policy_for(credentials)?;
        policy.remember(user_id)
    }

    /// ## Summary
    /// Session-clearing cookies from the policy selected for this request.
    ///
    /// ## Errors
    /// Returns `Configuration` for an unknown policy key.
    pub fn forget(&self, credentials: &RequestCredentials) -> ServiceResult<Vec<Cookie<'static>>> {
        let (_, policy) = self.policy_for(credentials)?;
        Ok(policy.forget())
    }
}
