use super::NetworkInterceptor;
use crate::domain::entities::notification::ACTION_CLOSE;
use crate::domain::entities::{NotificationData, NotificationDescriptor, PushPayload};
use crate::shared::error::InterceptError;
use chrono::Utc;
use tracing::debug;

impl NetworkInterceptor {
    pub async fn handle_push(&self, payload: &[u8]) -> Result<NotificationDescriptor, InterceptError> {
        if payload.is_empty() {
            return Err(InterceptError::InvalidPushPayload("empty payload".to_string()));
        }
        let payload: PushPayload = serde_json::from_slice(payload)
            .map_err(|err| InterceptError::InvalidPushPayload(err.to_string()))?;

        let descriptor = NotificationDescriptor::from_payload(
            payload,
            self.config.notification_icon.clone(),
            self.config.notification_badge.clone(),
            Utc::now(),
        );
        self.presenter.show(&descriptor).await?;
        debug!(target: "offline::interceptor", title = %descriptor.title, "notification shown");
        Ok(descriptor)
    }

    /// Closes the notification and, unless `action` is `close`, opens its
    /// URL (the app root when it carries none). Returns whether a window was
    /// opened.
    pub async fn handle_notification_click(
        &self,
        action: Option<&str>,
        data: &NotificationData,
    ) -> Result<bool, InterceptError> {
        self.presenter.close(data).await?;
        if action == Some(ACTION_CLOSE) {
            return Ok(false);
        }
        let url = data.url.as_deref().unwrap_or(&self.config.app_root);
        self.presenter.open_window(url).await?;
        Ok(true)
    }
}
