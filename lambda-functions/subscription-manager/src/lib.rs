pub mod lists;
pub mod reconcile;
pub mod sns;

pub use lists::{MailingListSource, MailingLists, SecretsManagerLists, MAILING_LISTS_SECRET};
pub use reconcile::{plan, Reconciler, Subscription, SubscriptionAction, SubscriptionToken};

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::sns::SnsSubscriptions;

const DEFAULT_REGION: &str = "us-west-2";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub status: String,
    pub message: String,
    pub action: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionConfig {
    pub region: String,
    pub terminal_errors_topic_arn: String,
    pub warnings_topic_arn: String,
    pub mailing_lists_secret: String,
}

impl SubscriptionConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            region: std::env::var("AWS_DEPLOYMENT_REGION")
                .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            terminal_errors_topic_arn: std::env::var("TERMINAL_ERRORS_TOPIC_ARN")
                .context("TERMINAL_ERRORS_TOPIC_ARN is not set")?,
            warnings_topic_arn: std::env::var("WARNINGS_TOPIC_ARN")
                .context("WARNINGS_TOPIC_ARN is not set")?,
            mailing_lists_secret: std::env::var("MAILING_LISTS_SECRET")
                .unwrap_or_else(|_| MAILING_LISTS_SECRET.to_string()),
        })
    }
}

/// Same JSON logging setup as the lifecycle functions.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new("error"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}

pub struct SubscriptionService {
    config: SubscriptionConfig,
    lists: Arc<dyn MailingListSource>,
    reconciler: Reconciler,
}

impl SubscriptionService {
    pub fn new(
        config: SubscriptionConfig,
        lists: Arc<dyn MailingListSource>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            config,
            lists,
            reconciler,
        }
    }

    pub async fn from_env() -> Result<Self> {
        let config = SubscriptionConfig::from_env()?;
        let sdk = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let lists = Arc::new(SecretsManagerLists::new(
            aws_sdk_secretsmanager::Client::new(&sdk),
            config.mailing_lists_secret.clone(),
        ));
        let reconciler = Reconciler::new(Arc::new(SnsSubscriptions::new(
            aws_sdk_sns::Client::new(&sdk),
        )));

        Ok(Self::new(config, lists, reconciler))
    }

    /// Brings both notification topics in line with the mailing lists.
    pub async fn run(&self) -> Result<Response> {
        let lists = self
            .lists
            .mailing_lists()
            .await
            .with_context(|| format!("reading {}", self.config.mailing_lists_secret))?;

        let topics = [
            ("terminal errors", &self.config.terminal_errors_topic_arn, lists.terminal_errors()),
            ("warnings", &self.config.warnings_topic_arn, lists.warnings()),
        ];

        let mut summary = Vec::new();
        for (name, topic_arn, desired) in topics {
            let Some(desired) = desired else {
                warn!(topic = %topic_arn, "no mailing list for topic, skipping");
                summary.push(format!("{name}: skipped"));
                continue;
            };

            let actions = self.reconciler.reconcile(topic_arn, &desired).await?;
            let subscribed = actions
                .iter()
                .filter(|a| matches!(a, SubscriptionAction::Subscribe { .. }))
                .count();
            let unsubscribed = actions.len() - subscribed;
            info!(topic = %topic_arn, subscribed, unsubscribed, "topic reconciled");
            summary.push(format!("{name}: {subscribed} subscribed, {unsubscribed} unsubscribed"));
        }

        Ok(Response {
            status_code: 200,
            status: "success".to_string(),
            message: format!("Reconciled subscriptions ({}).", summary.join("; ")),
            action: "reconcile_subscriptions".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}
