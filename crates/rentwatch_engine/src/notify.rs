use std::sync::Arc;

use rentwatch_core::Notification;
use serde::Serialize;

use crate::fetch::{Fetcher, HttpRequest};
use crate::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification delivery failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("notification target is empty")]
    MissingTarget,
}

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// One delivery attempt; success means the transport accepted it.
    async fn deliver(&self, target: &str, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Posts notifications as a single-embed chat webhook message.
pub struct WebhookSink {
    fetcher: Arc<dyn Fetcher>,
}

impl WebhookSink {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, target: &str, notification: &Notification) -> Result<(), DeliveryError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(DeliveryError::MissingTarget);
        }
        let payload = WebhookPayload::from(notification);
        self.fetcher
            .send(HttpRequest::post_json(target, &payload)?)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    url: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedImage<'a> {
    url: &'a str,
}

impl<'a> From<&'a Notification> for WebhookPayload<'a> {
    fn from(notification: &'a Notification) -> Self {
        Self {
            embeds: vec![Embed {
                title: &notification.title,
                url: &notification.url,
                description: &notification.body,
                image: notification
                    .image_url
                    .as_deref()
                    .map(|url| EmbedImage { url }),
            }],
        }
    }
}
