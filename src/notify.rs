use log::{debug, error};
use uuid::Uuid;

use crate::core::dispatch::NotificationPort;

/// SMS gateway client. Delivery is fire-and-forget: the request is posted
/// from a spawned task and the outcome is only logged, so a slow or dead
/// gateway never holds up ingestion or a command response. Retry, if any,
/// is the gateway's own concern.
pub struct SmsGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl SmsGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl NotificationPort for SmsGateway {
    fn deliver(&self, destination: &str, message: &str, correlation_id: Uuid) {
        let request = self.client.post(&self.endpoint).form(&[
            ("uuid", correlation_id.to_string()),
            ("to", destination.to_string()),
            ("msg", message.to_string()),
        ]);

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("delivered notification {correlation_id}");
                }
                Ok(response) => {
                    error!(
                        "gateway rejected notification {correlation_id}: {}",
                        response.status()
                    );
                }
                Err(err) => {
                    error!("failed to deliver notification {correlation_id}: {err}");
                }
            }
        });
    }
}
