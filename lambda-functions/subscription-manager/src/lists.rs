use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsClient;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;

pub const MAILING_LISTS_SECRET: &str = "AQTS-CAPTURE-MAILING-LISTS";

/// Desired recipients per topic, as stored in the mailing-list secret.
/// A list missing from the secret leaves its topic untouched; an empty one
/// clears it.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct MailingLists {
    pub terminal_errors_list: Option<String>,
    pub warnings_list: Option<String>,
}

impl MailingLists {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("mailing list secret is not a JSON object of strings")
    }

    pub fn terminal_errors(&self) -> Option<Vec<String>> {
        self.terminal_errors_list.as_deref().map(split)
    }

    pub fn warnings(&self) -> Option<Vec<String>> {
        self.warnings_list.as_deref().map(split)
    }
}

fn split(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MailingListSource: Send + Sync {
    async fn mailing_lists(&self) -> Result<MailingLists>;
}

pub struct SecretsManagerLists {
    client: SecretsClient,
    secret_id: String,
}

impl SecretsManagerLists {
    pub fn new(client: SecretsClient, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
        }
    }
}

#[async_trait]
impl MailingListSource for SecretsManagerLists {
    async fn mailing_lists(&self) -> Result<MailingLists> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await?;
        let raw = response
            .secret_string()
            .with_context(|| format!("secret {} has no string value", self.secret_id))?;
        MailingLists::parse(raw)
    }
}
