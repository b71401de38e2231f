//! Single-use password reset tokens.
//!
//! A token is a random UUID v4 stored in Valkey under `reset:{token}` with the
//! owning user id as value and a TTL. Consuming uses `GETDEL`, so a token can
//! be redeemed at most once even under concurrent requests.

use fred::prelude::*;
use uuid::Uuid;

use crate::error::ApiError;

fn reset_key(token: Uuid) -> String {
    format!("reset:{token}")
}

/// Create a reset token for `user_id` that expires after `ttl_secs`.
#[tracing::instrument(skip(valkey), fields(%user_id), err)]
pub async fn issue(
    valkey: &fred::clients::Pool,
    user_id: Uuid,
    ttl_secs: i64,
) -> Result<Uuid, ApiError> {
    let token = Uuid::new_v4();
    let _: () = valkey
        .set(
            reset_key(token),
            user_id.to_string(),
            Some(Expiration::EX(ttl_secs)),
            None,
            false,
        )
        .await?;
    Ok(token)
}

/// Redeem a token. Returns the user id it was issued for, or `None` if the
/// token is unknown, expired, or already used.
pub async fn consume(
    valkey: &fred::clients::Pool,
    token: Uuid,
) -> Result<Option<Uuid>, ApiError> {
    let value: Option<String> = valkey.getdel(reset_key(token)).await?;
    let Some(value) = value else {
        return Ok(None);
    };
    let user_id = Uuid::parse_str(&value)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt reset token entry: {e}")))?;
    Ok(Some(user_id))
}
