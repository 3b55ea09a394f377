use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Probabilistic set of taken usernames and emails.
///
/// A negative answer is only trusted as a hint to skip the duplicate
/// pre-check; the unique indexes still reject real collisions.
pub struct IdentityFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for IdentityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityFilter {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }

    /// Check if a username or email might be taken (false positives possible)
    pub fn might_exist(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize(key))
    }

    pub fn insert(&self, key: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&normalize(key));
    }

    fn insert_batch(&self, keys: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            filter.add(key);
        }
    }

    /// Warm up the filter with every username and email, streamed in batches
    pub async fn warmup(&self, pool: &MySqlPool, batch_size: usize) -> Result<()> {
        let mut stream =
            sqlx::query_as::<_, (String, String)>("SELECT username, email FROM users").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size * 2);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (username, email) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

            batch.push(normalize(&username));
            batch.push(normalize(&email));
            total += 1;

            if batch.len() >= batch_size * 2 {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        info!(users = total, "Identity filter warmup complete");
        Ok(())
    }
}
