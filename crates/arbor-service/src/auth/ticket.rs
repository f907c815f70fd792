//! Cookie tickets signed with HMAC-SHA256.
//!
//! A ticket is `base64url("{user_id}!{issued_at}!{hex signature}")` where the
//! signature covers `"{user_id}!{issued_at}"`. Tickets older than the
//! configured maximum age are ignored.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use salvo::http::cookie::{Cookie, SameSite};
use sha2::Sha256;

use crate::error::{ServiceError, ServiceResult};
use arbor_core::config::TicketConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct TicketPolicy {
    secret: Vec<u8>,
    cookie_name: String,
    max_age_secs: i64,
}

impl TicketPolicy {
    /// ## Summary
    /// Builds the policy from configuration.
    ///
    /// ## Errors
    /// Returns `Configuration` if the signing secret is empty.
    pub fn new(config: &TicketConfig) -> ServiceResult<Self> {
        if config.secret.is_empty() {
            return Err(ServiceError::Configuration(
                "auth.ticket.secret must not be empty".to_string(),
            ));
        }
        Ok(Self {
            secret: config.secret.as_bytes().to_vec(),
            cookie_name: config.cookie_name.clone(),
            max_age_secs: config.max_age_secs,
        })
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn mac(&self) -> ServiceResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServiceError::Configuration(format!("invalid ticket secret: {e}")))
    }

    /// ## Summary
    /// Creates a signed ticket for `user_id` issued at `issued_at` (unix seconds).
    ///
    /// ## Errors
    /// Returns `Configuration` if the secret cannot key the MAC.
    pub fn issue(&self, user_id: i32, issued_at: i64) -> ServiceResult<String> {
        let payload = format!("{user_id}!{issued_at}");
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(URL_SAFE_NO_PAD.encode(format!("{payload}!{signature}")))
    }

    /// ## Summary
    /// Returns the user id carried by a ticket if the signature matches and it has not expired.
    ///
    /// ## Errors
    /// Returns `Configuration` if the secret cannot key the MAC.
    pub fn verify(&self, ticket: &str, now: i64) -> ServiceResult<Option<i32>> {
        let Some((user_id, issued_at, signature)) = Self::split(ticket) else {
            tracing::debug!("Ticket is malformed");
            return Ok(None);
        };

        let mut mac = self.mac()?;
        mac.update(format!("{user_id}!{issued_at}").as_bytes());
        if mac.verify_slice(&signature).is_err() {
            tracing::debug!("Ticket signature mismatch");
            return Ok(None);
        }

        if now.saturating_sub(issued_at) > self.max_age_secs {
            tracing::debug!(user_id, issued_at, "Ticket expired");
            return Ok(None);
        }

        Ok(Some(user_id))
    }

    fn split(ticket: &str) -> Option<(i32, i64, Vec<u8>)> {
        let decoded = URL_SAFE_NO_PAD.decode(ticket).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let mut parts = decoded.splitn(3, '!');
        let user_id = parts.next()?.parse().ok()?;
        let issued_at = parts.next()?.parse().ok()?;
        let signature = hex::decode(parts.next()?).ok()?;
        Some((user_id, issued_at, signature))
    }

    /// ## Summary
    /// Resolves the user id from the ticket cookie value, if any.
    ///
    /// ## Errors
    /// Returns `Configuration` if the secret cannot key the MAC.
    pub fn unauthenticated_userid(&self, ticket: Option<&str>) -> ServiceResult<Option<i32>> {
        match ticket {
            Some(ticket) if !ticket.is_empty() => self.verify(ticket, chrono::Utc::now().timestamp()),
            _ => Ok(None),
        }
    }

    /// ## Summary
    /// Cookie that establishes a session for `user_id`.
    ///
    /// ## Errors
    /// Returns `Configuration` if the secret cannot key the MAC.
    pub fn remember(&self, user_id: i32) -> ServiceResult<Vec<Cookie<'static>>> {
        let ticket = self.issue(user_id, chrono::Utc::now().timestamp())?;
        let cookie = Cookie::build((self.cookie_name.clone(), ticket))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        Ok(vec![cookie])
    }

    /// Cookie that clears the session.
    #[must_use]
    pub fn forget(&self) -> Vec<Cookie<'static>> {
        let mut cookie = Cookie::build((self.cookie_name.clone(), String::new()))
            .path("/")
            .build();
        cookie.make_removal();
        vec![cookie]
    }
}
