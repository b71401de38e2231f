use fred::prelude::*;

/// Connections in the Valkey pool. Traffic is limited to login counters and
/// reset tokens, so a small pool suffices.
const POOL_SIZE: usize = 2;

#[tracing::instrument(skip(url), err)]
pub async fn connect(url: &str) -> anyhow::Result<fred::clients::Pool> {
    let config = fred::types::config::Config::from_url(url)?;
    let pool = fred::clients::Pool::new(config, None, None, None, POOL_SIZE)?;
    pool.init().await?;

    tracing::info!(pool_size = POOL_SIZE, "connected to valkey");
    Ok(pool)
}
