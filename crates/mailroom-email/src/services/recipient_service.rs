//! Configured notification recipients

use std::sync::Arc;

use mailroom_entities::{email_recipients, NotificationPreference};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder,
};
use tracing::info;

use crate::errors::EmailError;

#[derive(Debug, Clone)]
pub struct NewRecipient {
    pub email: String,
    pub name: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub notification_preference: NotificationPreference,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRecipient {
    pub email: Option<String>,
    pub name: Option<Option<String>>,
    pub is_primary: Option<bool>,
    pub is_active: Option<bool>,
    pub notification_preference: Option<NotificationPreference>,
}

/// Service over the email_recipients table
pub struct RecipientService {
    db: Arc<DatabaseConnection>,
}

impl RecipientService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Recipients the dispatcher fans out to: active with immediate
    /// preference
    pub async fn active_immediate(&self) -> Result<Vec<email_recipients::Model>, EmailError> {
        self.active_immediate_on(self.db.as_ref()).await
    }

    /// Same query on a caller-supplied connection (used inside the intake
    /// transaction)
    pub async fn active_immediate_on<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<Vec<email_recipients::Model>, EmailError> {
        let recipients = email_recipients::Entity::find()
            .filter(email_recipients::Column::IsActive.eq(true))
            .filter(
                email_recipients::Column::NotificationPreference
                    .eq(NotificationPreference::Immediate.as_str()),
            )
            .order_by_desc(email_recipients::Column::IsPrimary)
            .all(conn)
            .await?;
        Ok(recipients)
    }

    pub async fn list(&self) -> Result<Vec<email_recipients::Model>, EmailError> {
        let recipients = email_recipients::Entity::find()
            .order_by_asc(email_recipients::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(recipients)
    }

    pub async fn get(&self, id: i32) -> Result<email_recipients::Model, EmailError> {
        email_recipients::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(EmailError::RecipientNotFound(id))
    }

    pub async fn create(
        &self,
        request: NewRecipient,
    ) -> Result<email_recipients::Model, EmailError> {
        if !request.email.contains('@') {
            return Err(EmailError::Validation(format!(
                "Invalid email address: {}",
                request.email
            )));
        }

        let recipient = email_recipients::ActiveModel {
            email: Set(request.email.to_lowercase()),
            name: Set(request.name),
            is_primary: Set(request.is_primary),
            is_active: Set(request.is_active),
            notification_preference: Set(request.notification_preference.as_str().to_string()),
            ..Default::default()
        };

        let model = recipient.insert(self.db.as_ref()).await?;
        info!("Created email recipient {} ({})", model.id, model.email);
        Ok(model)
    }

    pub async fn update(
        &self,
        id: i32,
        request: UpdateRecipient,
    ) -> Result<email_recipients::Model, EmailError> {
        let existing = self.get(id).await?;
        let mut active: email_recipients::ActiveModel = existing.into();

        if let Some(email) = request.email {
            if !email.contains('@') {
                return Err(EmailError::Validation(format!(
                    "Invalid email address: {}",
                    email
                )));
            }
            active.email = Set(email.to_lowercase());
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(is_primary) = request.is_primary {
            active.is_primary = Set(is_primary);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(preference) = request.notification_preference {
            active.notification_preference = Set(preference.as_str().to_string());
        }

        let model = active.update(self.db.as_ref()).await?;
        Ok(model)
    }

    pub async fn delete(&self, id: i32) -> Result<(), EmailError> {
        let existing = self.get(id).await?;
        let email = existing.email.clone();
        email_recipients::Entity::delete_by_id(existing.id)
            .exec(self.db.as_ref())
            .await?;
        info!("Deleted email recipient {} ({})", id, email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailroom_database::test_utils::TestDatabase;

    async fn setup() -> (TestDatabase, RecipientService) {
        let db = TestDatabase::with_migrations().await.unwrap();
        let service = RecipientService::new(db.db.clone());
        (db, service)
    }

    fn recipient(email: &str, active: bool, preference: NotificationPreference) -> NewRecipient {
        NewRecipient {
            email: email.to_string(),
            name: None,
            is_primary: false,
            is_active: active,
            notification_preference: preference,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let (_db, service) = setup().await;
        let model = service
            .create(recipient(
                "Staff@Example.COM",
                true,
                NotificationPreference::Immediate,
            ))
            .await
            .unwrap();
        assert_eq!(model.email, "staff@example.com");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_email() {
        let (_db, service) = setup().await;
        let result = service
            .create(recipient("bogus", true, NotificationPreference::Immediate))
            .await;
        assert!(matches!(result, Err(EmailError::Validation(_))));
    }

    #[tokio::test]
    async fn test_active_immediate_filters() {
        let (_db, service) = setup().await;

        service
            .create(recipient(
                "a@example.com",
                true,
                NotificationPreference::Immediate,
            ))
            .await
            .unwrap();
        service
            .create(recipient(
                "b@example.com",
                false,
                NotificationPreference::Immediate,
            ))
            .await
            .unwrap();
        service
            .create(recipient(
                "c@example.com",
                true,
                NotificationPreference::Digest,
            ))
            .await
            .unwrap();

        let active = service.active_immediate().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "a@example.com");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_db, service) = setup().await;
        let model = service
            .create(recipient(
                "a@example.com",
                true,
                NotificationPreference::Immediate,
            ))
            .await
            .unwrap();

        let updated = service
            .update(
                model.id,
                UpdateRecipient {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);

        service.delete(model.id).await.unwrap();
        assert!(matches!(
            service.get(model.id).await,
            Err(EmailError::RecipientNotFound(_))
        ));
    }
}
