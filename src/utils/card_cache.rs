use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

/// id card number => user id.
///
/// Profiles never change after provisioning, so a hit can skip the profile lookup at login.
#[derive(Clone)]
pub struct CardCache {
    inner: Cache<String, u64>,
}

impl Default for CardCache {
    fn default() -> Self {
        Self::new(50_000, Duration::from_secs(86400))
    }
}

impl CardCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, id_card_number: &str) -> Option<u64> {
        self.inner.get(id_card_number.trim()).await
    }

    pub async fn remember(&self, id_card_number: &str, user_id: u64) {
        self.inner
            .insert(id_card_number.trim().to_string(), user_id)
            .await;
    }

    /// Load cards of users who logged in RECENTLY into the cache (batched)
    pub async fn warmup(&self, pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (String, u64)>(
            r#"
            SELECT p.id_card_number, p.user_id
            FROM employee_profiles p
            JOIN users u ON u.id = p.user_id
            WHERE u.last_login_at >= NOW() - INTERVAL ? DAY
            ORDER BY u.last_login_at DESC
            "#,
        )
        .bind(days)
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total_count = 0usize;

        while let Some(row) = stream.next().await {
            batch.push(row?);
            total_count += 1;

            if batch.len() >= batch_size {
                self.remember_batch(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.remember_batch(&batch).await;
        }

        info!(cards = total_count, days, "Card cache warmup complete");
        Ok(())
    }

    async fn remember_batch(&self, entries: &[(String, u64)]) {
        let futures: Vec<_> = entries
            .iter()
            .map(|(card, user_id)| self.inner.insert(card.clone(), *user_id))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }
}
