use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsClient;
use serde_json::Value;

use crate::api::SecretStore;

pub struct SecretsManagerStore {
    client: SecretsClient,
}

impl SecretsManagerStore {
    pub fn new(client: SecretsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn secret_json(&self, secret_id: &str) -> Result<Value> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await?;
        let raw = response
            .secret_string()
            .with_context(|| format!("secret {secret_id} has no string value"))?;
        serde_json::from_str(raw).with_context(|| format!("secret {secret_id} is not valid JSON"))
    }
}
