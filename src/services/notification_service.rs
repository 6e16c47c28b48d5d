use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::notification::Notification;
use crate::store::{NewNotification, RecordStore};

/// In-app notifications. Rows only; any outbound delivery (email, push) is
/// someone else's job.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn RecordStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: &str,
        title: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<Notification> {
        self.store
            .insert_notification(NewNotification {
                id: Uuid::new_v4(),
                user_id,
                kind: kind.to_string(),
                title: title.to_string(),
                body: body.to_string(),
                created_at: at,
            })
            .await
    }
}
