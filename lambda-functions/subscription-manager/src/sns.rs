use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;

use crate::reconcile::{Subscription, SubscriptionRegistry, SubscriptionToken, EMAIL_PROTOCOL};

pub struct SnsSubscriptions {
    client: SnsClient,
}

impl SnsSubscriptions {
    pub fn new(client: SnsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionRegistry for SnsSubscriptions {
    async fn list_subscriptions(&self, topic_arn: &str) -> Result<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        let mut next_token = None;

        loop {
            let response = self
                .client
                .list_subscriptions_by_topic()
                .topic_arn(topic_arn)
                .set_next_token(next_token)
                .send()
                .await?;

            subscriptions.extend(response.subscriptions().iter().map(|s| Subscription {
                protocol: s.protocol().unwrap_or_default().to_string(),
                endpoint: s.endpoint().unwrap_or_default().to_string(),
                token: SubscriptionToken::parse(s.subscription_arn().unwrap_or_default()),
            }));

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(subscriptions)
    }

    async fn subscribe(&self, topic_arn: &str, endpoint: &str) -> Result<()> {
        self.client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(EMAIL_PROTOCOL)
            .endpoint(endpoint)
            .send()
            .await?;
        Ok(())
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<()> {
        self.client
            .unsubscribe()
            .subscription_arn(subscription_arn)
            .send()
            .await?;
        Ok(())
    }
}
