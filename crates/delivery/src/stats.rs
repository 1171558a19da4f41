//! Daily delivery counters
//!
//! One counter per session per UTC day at `stats:daily:{session}:{YYYY-MM-DD}`.
//! Counters expire after 48 hours by default so yesterday stays visible.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::persistence::{DeliveryStore, StoreError};
use crate::queue::keys;

/// Days reported by [`StatsCounter::session_stats`], today included
const HISTORY_DAYS: u64 = 7;

/// Delivered count for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DailyCount {
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "2024-05-01"))]
    pub date: NaiveDate,
    pub count: i64,
}

/// Delivery stats for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_name: String,
    pub today: DailyCount,
    /// Today first, then the six days before
    pub last_7_days: Vec<DailyCount>,
}

pub struct StatsCounter {
    store: Arc<dyn DeliveryStore>,
    ttl: Duration,
}

impl StatsCounter {
    pub fn new(store: Arc<dyn DeliveryStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Count one delivery for today, returning the new total
    pub async fn increment_daily(&self, session: &str) -> Result<i64, StoreError> {
        let key = keys::daily_stats_key(session, today());
        self.store.incr_counter(&key, self.ttl).await
    }

    /// Deliveries so far today
    pub async fn get_daily(&self, session: &str) -> Result<i64, StoreError> {
        self.get_for(session, today()).await
    }

    /// Deliveries on a given UTC day (0 once the counter has expired)
    pub async fn get_for(&self, session: &str, date: NaiveDate) -> Result<i64, StoreError> {
        let key = keys::daily_stats_key(session, date);
        self.store.get_counter(&key).await
    }

    /// Today plus the previous six days
    pub async fn session_stats(&self, session: &str) -> Result<SessionStats, StoreError> {
        let today = today();
        let mut last_7_days = Vec::with_capacity(HISTORY_DAYS as usize);

        for offset in 0..HISTORY_DAYS {
            let Some(date) = today.checked_sub_days(Days::new(offset)) else {
                break;
            };
            last_7_days.push(DailyCount {
                date,
                count: self.get_for(session, date).await?,
            });
        }

        let today_count = last_7_days.first().map_or(0, |d| d.count);

        Ok(SessionStats {
            session_name: session.to_string(),
            today: DailyCount {
                date: today,
                count: today_count,
            },
            last_7_days,
        })
    }

    /// Stats for every session that has a live counter
    pub async fn all_session_stats(&self) -> Result<Vec<SessionStats>, StoreError> {
        let counter_keys = self
            .store
            .list_counter_keys(keys::DAILY_STATS_PREFIX)
            .await?;

        let sessions: BTreeSet<&str> = counter_keys
            .iter()
            .filter_map(|k| keys::parse_daily_stats_key(k).map(|(session, _)| session))
            .collect();

        let mut stats = Vec::with_capacity(sessions.len());
        for session in sessions {
            stats.push(self.session_stats(session).await?);
        }
        Ok(stats)
    }

    /// Clear today's counter for a session
    pub async fn reset_daily(&self, session: &str) -> Result<bool, StoreError> {
        let key = keys::daily_stats_key(session, today());
        let existed = self.store.delete_counter(&key).await?;
        info!(%session, "Daily counter reset");
        Ok(existed)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryDeliveryStore;

    const TTL: Duration = Duration::from_secs(48 * 3600);

    #[tokio::test]
    async fn test_increment_and_get() {
        let stats = StatsCounter::new(Arc::new(InMemoryDeliveryStore::new()), TTL);

        assert_eq!(stats.get_daily("a").await.unwrap(), 0);
        assert_eq!(stats.increment_daily("a").await.unwrap(), 1);
        assert_eq!(stats.increment_daily("a").await.unwrap(), 2);
        assert_eq!(stats.get_daily("a").await.unwrap(), 2);
        assert_eq!(stats.get_daily("b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_session_stats_includes_previous_days() {
        let store = Arc::new(InMemoryDeliveryStore::new());
        let stats = StatsCounter::new(store.clone(), TTL);

        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        store
            .incr_counter(&keys::daily_stats_key("a", yesterday), TTL)
            .await
            .unwrap();
        stats.increment_daily("a").await.unwrap();
        stats.increment_daily("a").await.unwrap();

        let report = stats.session_stats("a").await.unwrap();
        assert_eq!(report.session_name, "a");
        assert_eq!(report.today.count, 2);
        assert_eq!(report.last_7_days.len(), 7);
        assert_eq!(report.last_7_days[0].date, today());
        assert_eq!(report.last_7_days[1].date, yesterday);
        assert_eq!(report.last_7_days[1].count, 1);
        assert!(report.last_7_days[2..].iter().all(|d| d.count == 0));
    }

    #[tokio::test]
    async fn test_all_session_stats() {
        let stats = StatsCounter::new(Arc::new(InMemoryDeliveryStore::new()), TTL);
        stats.increment_daily("b").await.unwrap();
        stats.increment_daily("a").await.unwrap();
        stats.increment_daily("a").await.unwrap();

        let all = stats.all_session_stats().await.unwrap();
        let summary: Vec<(String, i64)> = all
            .into_iter()
            .map(|s| (s.session_name, s.today.count))
            .collect();
        assert_eq!(summary, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_reset_daily() {
        let stats = StatsCounter::new(Arc::new(InMemoryDeliveryStore::new()), TTL);
        stats.increment_daily("a").await.unwrap();

        assert!(stats.reset_daily("a").await.unwrap());
        assert_eq!(stats.get_daily("a").await.unwrap(), 0);
        assert!(!stats.reset_daily("a").await.unwrap());
    }

    #[test]
    fn test_stats_json_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let stats = SessionStats {
            session_name: "a".to_string(),
            today: DailyCount { date, count: 3 },
            last_7_days: vec![DailyCount { date, count: 3 }],
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["sessionName"], "a");
        assert_eq!(value["today"]["date"], "2024-05-01");
        assert_eq!(value["last7Days"][0]["count"], 3);
    }
}
