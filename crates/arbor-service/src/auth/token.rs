//! API token authentication.

use crate::error::ServiceResult;
use arbor_db::db::TokenStore;
use arbor_db::model::auth_token::AuthToken;

/// Resolves the principal from the token header. Tokens are not tied to a
/// live session, so authenticated and unauthenticated resolution coincide.
#[derive(Debug, Clone, Default)]
pub struct TokenPolicy;

impl TokenPolicy {
    /// ## Summary
    /// Looks the token up and returns its owner id.
    ///
    /// An empty or unknown token yields no principal rather than an error.
    ///
    /// ## Errors
    /// Returns an error if the token store lookup fails.
    #[tracing::instrument(skip_all)]
    pub async fn unauthenticated_userid<S>(
        &self,
        token: Option<&str>,
        store: &mut S,
    ) -> ServiceResult<Option<i32>>
    where
        S: TokenStore + ?Sized,
    {
        let token = token.unwrap_or_default();
        if token.is_empty() {
            return Ok(None);
        }

        let owner_id = store.lookup_by_token(token).await?.map(|t| t.owner_id);
        tracing::info!(found = owner_id.is_some(), owner = ?owner_id, "Token lookup");
        Ok(owner_id)
    }
}

/// ## Summary
/// Issues a fresh random token for `owner_id`.
///
/// ## Errors
/// Returns an error if the token cannot be stored.
#[tracing::instrument(skip(store, description))]
pub async fn create_token<S>(
    store: &mut S,
    owner_id: i32,
    description: Option<&str>,
) -> ServiceResult<AuthToken>
where
    S: TokenStore + ?Sized,
{
    let token = uuid::Uuid::new_v4().simple().to_string();
    let row = store.create_token(owner_id, &token, description).await?;
    tracing::info!(token_id = row.id, "Auth token created");
    Ok(row)
}
