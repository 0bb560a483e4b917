use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, ConnectionInfo, IntoConnectionInfo, aio::ConnectionManager};
use tracing::info;

use crate::error::CacheError;

use super::{KeyValueStore, MAX_ENTRY_TTL};

/// Parse `url`, letting `secret` take precedence over any password it carries.
pub(crate) fn connection_info(
    url: &str,
    secret: Option<&str>,
) -> Result<ConnectionInfo, CacheError> {
    let mut info = url.into_connection_info()?;
    if let Some(secret) = secret {
        info.redis.password = Some(secret.to_owned());
    }
    Ok(info)
}

/// Redis-backed store sharing one auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to `url`, overriding the password with `secret` when given.
    pub async fn connect(url: &str, secret: Option<&str>) -> Result<Self, CacheError> {
        let client = Client::open(connection_info(url, secret)?)?;
        let conn = client.get_connection_manager().await?;

        info!(addr = %client.get_connection_info().addr, "connected to cache store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.min(MAX_ENTRY_TTL).as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_overrides_url_password() {
        let info = connection_info("redis://:from-url@localhost:6379/0", Some("from-secret")).unwrap();
        assert_eq!(info.redis.password.as_deref(), Some("from-secret"));
        assert_eq!(info.redis.db, 0);
    }

    #[test]
    fn url_password_is_kept_without_secret() {
        let info = connection_info("redis://:from-url@localhost:6379/2", None).unwrap();
        assert_eq!(info.redis.password.as_deref(), Some("from-url"));
        assert_eq!(info.redis.db, 2);
    }

    #[test]
    fn malformed_url_is_a_store_error() {
        let err = connection_info("not a redis url", Some("secret")).unwrap_err();
        assert!(matches!(err, CacheError::Store(_)));
    }
}
