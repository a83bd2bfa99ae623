use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_lambda::Client as LambdaClient;

use crate::api::TriggerRegistry;
use crate::triggers::{TriggerBinding, TriggerState};

pub struct LambdaTriggerRegistry {
    client: LambdaClient,
}

impl LambdaTriggerRegistry {
    pub fn new(client: LambdaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TriggerRegistry for LambdaTriggerRegistry {
    async fn list_mappings(&self, function_name: &str) -> Result<Vec<TriggerBinding>> {
        let mut bindings = Vec::new();
        let mut marker = None;

        loop {
            let response = self
                .client
                .list_event_source_mappings()
                .function_name(function_name)
                .set_marker(marker)
                .send()
                .await?;

            for mapping in response.event_source_mappings() {
                let Some(uuid) = mapping.uuid() else {
                    continue;
                };
                bindings.push(TriggerBinding {
                    uuid: uuid.to_string(),
                    function_name: function_name.to_string(),
                    state: TriggerState::parse(mapping.state().unwrap_or_default()),
                });
            }

            marker = response.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }

        Ok(bindings)
    }

    async fn mapping_state(&self, uuid: &str) -> Result<TriggerState> {
        let response = self
            .client
            .get_event_source_mapping()
            .uuid(uuid)
            .send()
            .await?;
        Ok(TriggerState::parse(response.state().unwrap_or_default()))
    }

    async fn set_enabled(&self, uuid: &str, enabled: bool) -> Result<()> {
        self.client
            .update_event_source_mapping()
            .uuid(uuid)
            .enabled(enabled)
            .send()
            .await?;
        Ok(())
    }
}
