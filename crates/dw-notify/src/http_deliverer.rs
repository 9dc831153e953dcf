//! Webhook delivery over HTTP
//!
//! POSTs the notification payload as JSON to the subscriber URL. Any 2xx
//! response counts as delivered; everything else is a failure the dispatcher
//! logs and moves past.

use std::time::Duration;

use async_trait::async_trait;
use dw_common::NotificationPayload;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::dispatcher::{Deliverer, DeliveryResult};

#[derive(Debug, Clone)]
pub struct HttpDelivererConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpDelivererConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpDeliverer {
    client: reqwest::Client,
}

impl HttpDeliverer {
    pub fn new(config: HttpDelivererConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Deliverer for HttpDeliverer {
    async fn deliver(&self, url: &str, payload: &NotificationPayload) -> DeliveryResult {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                return DeliveryResult::Encoding {
                    error: e.to_string(),
                }
            }
        };

        debug!(url = %url, subscription_id = %payload.id, "Posting notification");

        match self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    DeliveryResult::Delivered {
                        status: status.as_u16(),
                    }
                } else {
                    DeliveryResult::Rejected {
                        status: status.as_u16(),
                    }
                }
            }
            Err(e) if e.is_timeout() => DeliveryResult::TimedOut,
            Err(e) => DeliveryResult::Unreachable {
                error: e.to_string(),
            },
        }
    }
}
