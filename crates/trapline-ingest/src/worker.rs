//! Notification intake: long-polls the upload-notification queue and feeds
//! each message's record batch through the pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};

use trapline_core::models::Notification;

use crate::orchestrator::IngestPipeline;

const MAX_MESSAGES_PER_POLL: i32 = 10;

pub struct IngestWorker {
    sqs: aws_sdk_sqs::Client,
    pipeline: Arc<IngestPipeline>,
    queue_url: String,
    wait_time_secs: i32,
}

impl IngestWorker {
    pub fn new(
        sqs: aws_sdk_sqs::Client,
        pipeline: Arc<IngestPipeline>,
        queue_url: String,
        wait_time_secs: i32,
    ) -> Self {
        Self {
            sqs,
            pipeline,
            queue_url,
            wait_time_secs,
        }
    }

    /// Poll until ctrl-c. Poll errors are logged and the loop continues; the
    /// queue redelivers anything a failed poll left in flight.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            queue_url = %self.queue_url,
            wait_time_secs = self.wait_time_secs,
            "Ingest worker started"
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ingest worker shutting down");
                    break;
                }
                result = self.poll_once() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Notification poll failed");
                    }
                }
            }
        }

        Ok(())
    }

    async fn poll_once(&self) -> Result<()> {
        let output = self
            .sqs
            .receive_message()
            .queue_url(&self.queue_url)
            .wait_time_seconds(self.wait_time_secs)
            .max_number_of_messages(MAX_MESSAGES_PER_POLL)
            .send()
            .await
            .context("Failed to receive from notification queue")?;

        for message in output.messages.unwrap_or_default() {
            if let Some(body) = message.body() {
                match Notification::parse(body) {
                    Ok(events) => {
                        if let Err(e) = self.pipeline.process_batch(events).await {
                            tracing::error!(error = %e, "Batch processing failed");
                        }
                    }
                    Err(e) => {
                        // Deleted below anyway: an unparseable notification
                        // would otherwise poison the queue.
                        tracing::warn!(error = %e, "Unparseable notification payload");
                    }
                }
            }

            if let Some(receipt_handle) = message.receipt_handle() {
                if let Err(e) = self
                    .sqs
                    .delete_message()
                    .queue_url(&self.queue_url)
                    .receipt_handle(receipt_handle)
                    .send()
                    .await
                {
                    tracing::warn!(error = %e, "Failed to delete notification message");
                }
            }
        }

        Ok(())
    }
}
