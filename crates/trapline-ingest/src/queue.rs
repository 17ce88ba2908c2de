//! Batch redirection: `.zip` submissions are handed to an asynchronous queue
//! instead of being processed inline.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue lookup failed: {0}")]
    Lookup(String),

    #[error("Send failed: {0}")]
    Send(String),
}

/// Send-only message sink for batch submissions.
#[async_trait]
pub trait BatchQueue: Send + Sync {
    async fn send(&self, payload: serde_json::Value) -> Result<(), QueueError>;
}

/// SQS-backed sink. The queue is addressed by name and resolved per send.
pub struct SqsBatchQueue {
    client: aws_sdk_sqs::Client,
    queue_name: String,
}

impl SqsBatchQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_name: String) -> Self {
        Self { client, queue_name }
    }
}

#[async_trait]
impl BatchQueue for SqsBatchQueue {
    async fn send(&self, payload: serde_json::Value) -> Result<(), QueueError> {
        let queue_url = self
            .client
            .get_queue_url()
            .queue_name(&self.queue_name)
            .send()
            .await
            .map_err(|e| QueueError::Lookup(e.to_string()))?
            .queue_url
            .ok_or_else(|| QueueError::Lookup(format!("no URL for queue {}", self.queue_name)))?;

        self.client
            .send_message()
            .queue_url(&queue_url)
            .message_body(payload.to_string())
            .send()
            .await
            .map_err(|e| QueueError::Send(e.to_string()))?;

        tracing::info!(
            queue = %self.queue_name,
            "Redirected batch submission to queue"
        );

        Ok(())
    }
}
