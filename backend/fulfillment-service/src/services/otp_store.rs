/// Keyed storage for pending one-time codes
///
/// Two backends:
/// - [`InMemoryOtpStore`]: process-local map, lost on restart
/// - [`RedisOtpStore`]: shared across instances, per-key TTL
///
/// Expiry is decided by the verifier from `OtpRecord::expires_at`; backends
/// only keep stale records around long enough for that check to observe them.
use crate::error::Result;
use crate::models::OtpRecord;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Redis key prefix
const REDIS_OTP_PREFIX: &str = "purchase_otp:";

/// How long an expired record is retained so `verify` can report it as expired
const EXPIRED_RECORD_GRACE_SECS: i64 = 300;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Insert or replace the record for `record.email`
    async fn put(&self, record: OtpRecord) -> Result<()>;

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>>;

    /// Remove the record only if it is still exactly `record`.
    ///
    /// Returns `true` when this call removed it. A concurrent `put` or
    /// `remove` makes this return `false`.
    async fn remove(&self, record: &OtpRecord) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryOtpStore {
    records: RwLock<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, record: OtpRecord) -> Result<()> {
        let cutoff = Utc::now() - Duration::seconds(EXPIRED_RECORD_GRACE_SECS);
        let mut records = self.records.write().await;
        // Abandoned codes are never verified, so prune them on write
        records.retain(|_, r| r.expires_at > cutoff);
        records.insert(record.email.clone(), record);
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn remove(&self, record: &OtpRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get(&record.email) {
            Some(current) if current == record => {
                records.remove(&record.email);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Wire form stored under the Redis key. Integer timestamps keep the
/// serialized value byte-stable for the compare-and-delete script.
#[derive(Debug, Serialize, Deserialize)]
struct StoredOtp {
    code: String,
    expires_at_ms: i64,
}

impl StoredOtp {
    fn encode(record: &OtpRecord) -> Result<String> {
        Ok(serde_json::to_string(&StoredOtp {
            code: record.code.clone(),
            expires_at_ms: record.expires_at.timestamp_millis(),
        })?)
    }
}

const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisOtpStore {
    redis: SharedConnectionManager,
}

impl RedisOtpStore {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }

    fn key(email: &str) -> String {
        format!("{}{}", REDIS_OTP_PREFIX, email)
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, record: OtpRecord) -> Result<()> {
        let payload = StoredOtp::encode(&record)?;
        let remaining = (record.expires_at - Utc::now()).num_seconds().max(0);
        let ttl = remaining + EXPIRED_RECORD_GRACE_SECS;
        let mut conn = self.redis.lock().await.clone();

        redis::cmd("SET")
            .arg(Self::key(&record.email))
            .arg(payload)
            .arg("EX")
            .arg(ttl)
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>> {
        let mut conn = self.redis.lock().await.clone();

        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::key(email))
            .query_async(&mut conn)
            .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let stored: StoredOtp = serde_json::from_str(&payload)?;
        let expires_at = Utc
            .timestamp_millis_opt(stored.expires_at_ms)
            .single()
            .ok_or_else(|| {
                crate::error::AppError::OtpStore("Invalid OTP expiry timestamp".to_string())
            })?;

        Ok(Some(OtpRecord {
            email: email.to_string(),
            code: stored.code,
            expires_at,
        }))
    }

    async fn remove(&self, record: &OtpRecord) -> Result<bool> {
        let payload = StoredOtp::encode(record)?;
        let mut conn = self.redis.lock().await.clone();

        let removed: i64 = redis::Script::new(COMPARE_AND_DELETE)
            .key(Self::key(&record.email))
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;

        Ok(removed == 1)
    }
}
