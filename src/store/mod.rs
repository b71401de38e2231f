pub mod bootstrap;
pub mod pool;
pub mod valkey;

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub valkey: fred::clients::Pool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Assemble the shared state, deriving the token keys from `config`.
    /// Fails on token or reset lifetimes that are not positive.
    pub fn new(pool: PgPool, valkey: fred::clients::Pool, config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let jwt = JwtKeys::new(&config.jwt_secret, config.token_ttl()?)?;
        Ok(Self {
            pool,
            valkey,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        })
    }
}
