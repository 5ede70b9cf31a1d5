//! Durable IP block list
//!
//! Independent of the short-window rate limiter: an IP that keeps
//! producing spam-classified submissions gets a 30-day block after its
//! fifth hit. Rows are created on the first hit in a flagged-but-inactive
//! state (expiry already past) so merely-flagged IPs still pass the gate.

use std::sync::Arc;

use chrono::Duration;
use mailroom_core::Clock;
use mailroom_entities::{blocked_ips, BlockReason};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::{info, warn};

use crate::errors::ContactError;

/// Spam hits after which an IP is actively blocked
pub const AUTO_BLOCK_THRESHOLD: i32 = 5;

/// Length of the automatic block window
pub const BLOCK_DURATION_DAYS: i64 = 30;

/// Service over the blocked_ips table
pub struct BlockedIpService {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
}

impl BlockedIpService {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Whether submissions from this IP are currently rejected
    pub async fn is_blocked(&self, ip_address: &str) -> Result<bool, ContactError> {
        let now = self.clock.now();

        let active = blocked_ips::Entity::find()
            .filter(blocked_ips::Column::IpAddress.eq(ip_address))
            .filter(
                Condition::any()
                    .add(blocked_ips::Column::ExpiresAt.is_null())
                    .add(blocked_ips::Column::ExpiresAt.gt(now)),
            )
            .one(self.db.as_ref())
            .await?;

        Ok(active.is_some())
    }

    /// Record one spam-classified submission from this IP.
    ///
    /// The increment is a single SQL UPDATE so two racing spam paths for
    /// the same IP never undercount. Crossing the threshold flips the row
    /// into an active block for the next 30 days.
    pub async fn record_spam_hit_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        ip_address: &str,
    ) -> Result<blocked_ips::Model, ContactError> {
        let now = self.clock.now();

        let result = blocked_ips::Entity::update_many()
            .col_expr(
                blocked_ips::Column::SpamCount,
                Expr::col(blocked_ips::Column::SpamCount).add(1),
            )
            .filter(blocked_ips::Column::IpAddress.eq(ip_address))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            // First hit from this IP: create the row flagged but inactive
            // (expiry already in the past keeps the gate open until the
            // threshold is crossed)
            let row = blocked_ips::ActiveModel {
                ip_address: Set(ip_address.to_string()),
                reason: Set(BlockReason::Spam.as_str().to_string()),
                spam_count: Set(1),
                blocked_at: Set(now),
                expires_at: Set(Some(now)),
                ..Default::default()
            };

            match row.insert(conn).await {
                Ok(model) => return Ok(model),
                Err(e) => {
                    // Unique constraint race with another spam path: fall
                    // through to increment the row the winner created
                    warn!(
                        "Insert race on blocked_ips for {}, retrying increment: {}",
                        ip_address, e
                    );
                    blocked_ips::Entity::update_many()
                        .col_expr(
                            blocked_ips::Column::SpamCount,
                            Expr::col(blocked_ips::Column::SpamCount).add(1),
                        )
                        .filter(blocked_ips::Column::IpAddress.eq(ip_address))
                        .exec(conn)
                        .await?;
                }
            }
        }

        let row = blocked_ips::Entity::find()
            .filter(blocked_ips::Column::IpAddress.eq(ip_address))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ContactError::Database(sea_orm::DbErr::RecordNotFound(
                    "blocked_ips row vanished".to_string(),
                ))
            })?;

        if row.spam_count >= AUTO_BLOCK_THRESHOLD && !row.is_active(now) {
            let expires_at = now + Duration::days(BLOCK_DURATION_DAYS);
            let mut active: blocked_ips::ActiveModel = row.into();
            active.blocked_at = Set(now);
            active.expires_at = Set(Some(expires_at));
            active.reason = Set(BlockReason::Spam.as_str().to_string());
            let updated = active.update(conn).await?;

            info!(
                "Auto-blocked {} after {} spam submissions (until {})",
                ip_address, updated.spam_count, expires_at
            );
            return Ok(updated);
        }

        Ok(row)
    }

    /// Convenience wrapper over the service's own connection
    pub async fn record_spam_hit(
        &self,
        ip_address: &str,
    ) -> Result<blocked_ips::Model, ContactError> {
        self.record_spam_hit_on(self.db.as_ref(), ip_address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mailroom_core::ManualClock;
    use mailroom_database::test_utils::TestDatabase;

    async fn setup() -> (TestDatabase, Arc<ManualClock>, BlockedIpService) {
        let db = TestDatabase::with_migrations().await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = BlockedIpService::new(db.db.clone(), clock.clone());
        (db, clock, service)
    }

    #[tokio::test]
    async fn test_unknown_ip_is_not_blocked() {
        let (_db, _clock, service) = setup().await;
        assert!(!service.is_blocked("203.0.113.7").await.unwrap());
    }

    #[tokio::test]
    async fn test_first_hit_creates_flagged_but_inactive_row() {
        let (_db, _clock, service) = setup().await;

        let row = service.record_spam_hit("203.0.113.7").await.unwrap();
        assert_eq!(row.spam_count, 1);

        // Flagged, not blocking
        assert!(!service.is_blocked("203.0.113.7").await.unwrap());
    }

    #[tokio::test]
    async fn test_hits_below_threshold_do_not_block() {
        let (_db, _clock, service) = setup().await;

        for _ in 0..(AUTO_BLOCK_THRESHOLD - 1) {
            service.record_spam_hit("203.0.113.7").await.unwrap();
        }

        assert!(!service.is_blocked("203.0.113.7").await.unwrap());
    }

    #[tokio::test]
    async fn test_fifth_hit_activates_a_thirty_day_block() {
        let (_db, clock, service) = setup().await;

        let mut last = None;
        for _ in 0..AUTO_BLOCK_THRESHOLD {
            last = Some(service.record_spam_hit("203.0.113.7").await.unwrap());
        }

        let row = last.unwrap();
        assert_eq!(row.spam_count, AUTO_BLOCK_THRESHOLD);
        let expires_at = row.expires_at.unwrap();
        assert!(expires_at > clock.now() + Duration::days(BLOCK_DURATION_DAYS - 1));
        assert!(expires_at <= clock.now() + Duration::days(BLOCK_DURATION_DAYS));

        assert!(service.is_blocked("203.0.113.7").await.unwrap());
    }

    #[tokio::test]
    async fn test_block_expires_after_window() {
        let (_db, clock, service) = setup().await;

        for _ in 0..AUTO_BLOCK_THRESHOLD {
            service.record_spam_hit("203.0.113.7").await.unwrap();
        }
        assert!(service.is_blocked("203.0.113.7").await.unwrap());

        clock.advance(Duration::days(BLOCK_DURATION_DAYS) + Duration::seconds(1));
        assert!(!service.is_blocked("203.0.113.7").await.unwrap());
    }

    #[tokio::test]
    async fn test_repeated_hits_never_duplicate_the_row() {
        let (db, _clock, service) = setup().await;

        for _ in 0..7 {
            service.record_spam_hit("203.0.113.7").await.unwrap();
        }

        let rows = blocked_ips::Entity::find()
            .filter(blocked_ips::Column::IpAddress.eq("203.0.113.7"))
            .all(db.db.as_ref())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].spam_count, 7);
    }

    #[tokio::test]
    async fn test_spam_count_keeps_incrementing_past_threshold() {
        let (_db, _clock, service) = setup().await;

        for _ in 0..AUTO_BLOCK_THRESHOLD {
            service.record_spam_hit("203.0.113.7").await.unwrap();
        }
        let row = service.record_spam_hit("203.0.113.7").await.unwrap();
        assert_eq!(row.spam_count, AUTO_BLOCK_THRESHOLD + 1);
    }
}
