//! Blocked IPs entity

use async_trait::async_trait;
use mailroom_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "blocked_ips")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub ip_address: String,
    /// One of: spam, abuse, manual
    pub reason: String,
    /// Monotonic count of spam-classified submissions from this IP
    pub spam_count: i32,
    pub blocked_at: DBDateTime,
    /// Null means the block never expires
    pub expires_at: Option<DBDateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Model {
    /// A row blocks traffic iff its expiry is unset or in the future.
    pub fn is_active(&self, now: DBDateTime) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.blocked_at.is_not_set() {
                self.blocked_at = Set(now);
            }
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn model(expires_at: Option<DBDateTime>) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            ip_address: "203.0.113.7".to_string(),
            reason: "spam".to_string(),
            spam_count: 5,
            blocked_at: now,
            expires_at,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_indefinite_block_is_active() {
        let now = Utc::now();
        assert!(model(None).is_active(now));
    }

    #[test]
    fn test_future_expiry_is_active() {
        let now = Utc::now();
        assert!(model(Some(now + Duration::days(30))).is_active(now));
    }

    #[test]
    fn test_past_expiry_is_inactive() {
        let now = Utc::now();
        assert!(!model(Some(now - Duration::seconds(1))).is_active(now));
    }
}
