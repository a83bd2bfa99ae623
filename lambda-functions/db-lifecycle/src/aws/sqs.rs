use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use tracing::info;

use crate::api::QueueApi;

pub struct SqsQueues {
    client: SqsClient,
}

impl SqsQueues {
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueueApi for SqsQueues {
    async fn purge(&self, queue_name: &str) -> Result<()> {
        let response = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await?;
        let queue_url = response
            .queue_url()
            .with_context(|| format!("no url returned for queue {queue_name}"))?;

        self.client.purge_queue().queue_url(queue_url).send().await?;
        info!(queue = %queue_name, "purged queue");
        Ok(())
    }
}
