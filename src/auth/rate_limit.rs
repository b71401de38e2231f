use fred::interfaces::KeysInterface;

use crate::error::ApiError;

pub const LOGIN_MAX_ATTEMPTS: u64 = 10;
pub const LOGIN_WINDOW_SECS: i64 = 300;

fn rate_key(prefix: &str, identifier: &str) -> String {
    format!("rate:{prefix}:{identifier}")
}

/// Login attempts are counted per account and client address, so failures
/// from one client cannot lock the account out for everyone else.
pub fn login_identifier(email: &str, client_ip: Option<&str>) -> String {
    format!("{email}|{}", client_ip.unwrap_or("unknown"))
}

/// Fixed-window rate limiter backed by Valkey.
///
/// Increments a counter keyed on `rate:{prefix}:{identifier}` with a TTL of
/// `window_secs`. Returns `Err(ApiError::TooManyRequests)` when the counter
/// exceeds `max_attempts`.
pub async fn check_rate(
    valkey: &fred::clients::Pool,
    prefix: &str,
    identifier: &str,
    max_attempts: u64,
    window_secs: i64,
) -> Result<(), ApiError> {
    let key = rate_key(prefix, identifier);

    let count: u64 = valkey.incr(&key).await?;

    // Set expiry only when the key is newly created (count == 1)
    if count == 1 {
        let _: () = valkey.expire(&key, window_secs, None).await?;
    }

    if count > max_attempts {
        tracing::warn!(prefix, identifier, count, "rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }

    Ok(())
}

/// Drop the counter for `identifier`, e.g. once a login succeeds.
pub async fn clear_rate(
    valkey: &fred::clients::Pool,
    prefix: &str,
    identifier: &str,
) -> Result<(), ApiError> {
    let _: i64 = valkey.del(rate_key(prefix, identifier)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced() {
        assert_eq!(
            rate_key("login", "ada@example.com"),
            "rate:login:ada@example.com"
        );
    }

    #[test]
    fn login_identifier_includes_client() {
        assert_eq!(
            login_identifier("ada@example.com", Some("203.0.113.7")),
            "ada@example.com|203.0.113.7"
        );
        assert_eq!(
            login_identifier("ada@example.com", None),
            "ada@example.com|unknown"
        );
        assert_ne!(
            login_identifier("ada@example.com", Some("203.0.113.7")),
            login_identifier("ada@example.com", Some("198.51.100.2"))
        );
    }
}
