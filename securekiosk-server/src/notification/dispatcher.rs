//! Routes verified notifications to per-type handlers.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::{info, warn};

use super::types::{Environment, Notification, NotificationData, NotificationType};

/// Reacts to subscription lifecycle events.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn subscribed(&self, env: Environment, data: &NotificationData) -> anyhow::Result<()>;

    async fn renewed(&self, env: Environment, data: &NotificationData) -> anyhow::Result<()>;

    async fn renewal_failed(&self, env: Environment, data: &NotificationData)
        -> anyhow::Result<()>;

    async fn expired(&self, env: Environment, data: &NotificationData) -> anyhow::Result<()>;
}

/// Handler that records each event in the log and changes no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl NotificationHandler for LoggingHandler {
    async fn subscribed(&self, env: Environment, data: &NotificationData) -> anyhow::Result<()> {
        info!(
            environment = %env,
            original_transaction_id = ?data.original_transaction_id,
            product_id = ?data.product_id,
            purchase_date = ?data.purchase_date,
            "subscription_started"
        );
        Ok(())
    }

    async fn renewed(&self, env: Environment, data: &NotificationData) -> anyhow::Result<()> {
        info!(
            environment = %env,
            original_transaction_id = ?data.original_transaction_id,
            product_id = ?data.product_id,
            renewal_date = ?data.renewal_date,
            "subscription_renewed"
        );
        Ok(())
    }

    async fn renewal_failed(
        &self,
        env: Environment,
        data: &NotificationData,
    ) -> anyhow::Result<()> {
        info!(
            environment = %env,
            original_transaction_id = ?data.original_transaction_id,
            product_id = ?data.product_id,
            expiration_intent = ?data.expiration_intent,
            "subscription_renewal_failed"
        );
        Ok(())
    }

    async fn expired(&self, env: Environment, data: &NotificationData) -> anyhow::Result<()> {
        info!(
            environment = %env,
            original_transaction_id = ?data.original_transaction_id,
            product_id = ?data.product_id,
            expiration_date = ?data.expiration_date,
            "subscription_expired"
        );
        Ok(())
    }
}

/// Outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Handled(NotificationType),
    Ignored,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} notification carries no data record")]
    MissingData(NotificationType),

    #[error("{notification_type} handler failed: {source}")]
    Handler {
        notification_type: NotificationType,
        #[source]
        source: anyhow::Error,
    },
}

/// Chooses the handler for a notification's type.
#[derive(Clone)]
pub struct Dispatcher {
    handler: Arc<dyn NotificationHandler>,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn NotificationHandler>) -> Self {
        Self { handler }
    }

    /// Dispatch a verified notification.
    ///
    /// Unknown or missing types are logged and ignored.
    pub async fn dispatch(
        &self,
        env: Environment,
        notification: &Notification,
    ) -> Result<Dispatched, DispatchError> {
        let notification_type = match &notification.notification_type {
            Some(NotificationType::Other(_)) | None => {
                info!(
                    environment = %env,
                    notification_type = ?notification.notification_type.as_ref().map(|t| t.as_str()),
                    notification_uuid = ?notification.notification_uuid,
                    "notification_unhandled"
                );
                return Ok(Dispatched::Ignored);
            }
            Some(t) => t.clone(),
        };

        let data = notification
            .data
            .as_ref()
            .ok_or_else(|| DispatchError::MissingData(notification_type.clone()))?;

        if let Some(payload_env) = &data.environment {
            if !payload_env.eq_ignore_ascii_case(env.as_str()) {
                warn!(
                    route_environment = %env,
                    payload_environment = %payload_env,
                    "notification_environment_mismatch"
                );
            }
        }

        info!(
            environment = %env,
            notification_type = %notification_type,
            subtype = ?notification.subtype,
            notification_uuid = ?notification.notification_uuid,
            "notification_routing"
        );

        let result = match &notification_type {
            NotificationType::Subscribed => self.handler.subscribed(env, data).await,
            NotificationType::DidRenew => self.handler.renewed(env, data).await,
            NotificationType::DidFailToRenew => self.handler.renewal_failed(env, data).await,
            NotificationType::Expired => self.handler.expired(env, data).await,
            NotificationType::Other(_) => return Ok(Dispatched::Ignored),
        };

        result.map_err(|source| DispatchError::Handler {
            notification_type: notification_type.clone(),
            source,
        })?;

        Ok(Dispatched::Handled(notification_type))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LoggingHandler))
    }
}
