//! HTTP 推送服务渠道
//!
//! 按 GCM 协议向推送服务商发送消息：单次 POST，`Authorization: key=<凭证>`，
//! 仅 HTTP 200 视为成功。

use std::time::Duration;

use async_trait::async_trait;
use geo_shared::config::PushConfig;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::DeliveryChannel;
use crate::error::ChannelError;
use crate::models::Notification;

/// 推送请求体
#[derive(Debug, Serialize)]
pub struct PushPayload<'a> {
    pub registration_ids: &'a [String],
    pub data: PushPayloadData<'a>,
}

#[derive(Debug, Serialize)]
pub struct PushPayloadData<'a> {
    pub message: &'a str,
    pub image_url: &'a str,
}

/// 推送服务商渠道
pub struct PushProviderChannel {
    name: String,
    endpoint: String,
    api_key: String,
    image_url: String,
    client: reqwest::Client,
}

impl PushProviderChannel {
    pub fn new(config: &PushConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|source| ChannelError::Transport {
                channel: config.name.clone(),
                source,
            })?;

        Ok(Self {
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            image_url: config.image_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl DeliveryChannel for PushProviderChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(
        &self,
        notification: &Notification,
        device_ids: &[String],
    ) -> Result<(), ChannelError> {
        if device_ids.is_empty() {
            return Err(ChannelError::EmptyRecipients {
                channel: self.name.clone(),
            });
        }

        let payload = PushPayload {
            registration_ids: device_ids,
            data: PushPayloadData {
                message: &notification.message,
                image_url: &self.image_url,
            },
        };
        let body = serde_json::to_vec(&payload)?;

        debug!(
            channel = %self.name,
            notification_id = %notification.id,
            count = device_ids.len(),
            "sending push request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("key={}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| ChannelError::Transport {
                channel: self.name.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(
                channel = %self.name,
                notification_id = %notification.id,
                status = %status,
                body = %body,
                "push provider rejected request"
            );
            return Err(ChannelError::Provider {
                channel: self.name.clone(),
                status: status.to_string(),
            });
        }

        info!(
            channel = %self.name,
            notification_id = %notification.id,
            count = device_ids.len(),
            "push request accepted"
        );
        Ok(())
    }
}
