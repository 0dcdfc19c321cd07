use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::publisher_confirm::Confirmation;
use lapin::{BasicProperties, Channel};
use tracing::debug;

use crate::errors::AppError;
use crate::models::TokenGenerationRequest;
use crate::services::RequestTokenGenerationPublisher;

// AMQP delivery mode 2: persist the message to disk on the broker.
const PERSISTENT: u8 = 2;

/// Publishes generation requests to the bound topic exchange and blocks until
/// the broker confirms durable acceptance.
pub struct AmqpRequestTokenGenerationPublisher {
    channel: Channel,
    topic: String,
}

impl AmqpRequestTokenGenerationPublisher {
    pub fn new(channel: Channel, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl RequestTokenGenerationPublisher for AmqpRequestTokenGenerationPublisher {
    async fn publish_request_token_generation(
        &self,
        request: &TokenGenerationRequest,
    ) -> Result<(), AppError> {
        let payload = serde_json::to_vec(request).map_err(AppError::Encode)?;

        let confirm = self
            .channel
            .basic_publish(
                &self.topic,
                "",
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await
            .map_err(|e| AppError::Publish(e.into()))?
            .await
            .map_err(|e| AppError::Publish(e.into()))?;

        if let Confirmation::Nack(_) = confirm {
            return Err(AppError::Publish(anyhow::anyhow!(
                "broker negatively acknowledged the publish"
            )));
        }

        debug!(
            topic = %self.topic,
            project_id = %request.project_id,
            "token generation request published"
        );
        Ok(())
    }
}
