use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_rds::types::Tag;
use aws_sdk_rds::Client as RdsClient;
use tracing::info;

use crate::api::{
    CreateInstanceRequest, DatabaseApi, InstanceState, Removal, RestoreClusterRequest,
    RestoreInstanceRequest,
};

const ENGINE: &str = "aurora-postgresql";
const ENGINE_VERSION: &str = "11.7";
const PORT: i32 = 5432;
const CLUSTER_PARAMETER_GROUP: &str = "aqts-capture";
const OBSERVATIONS_ENGINE: &str = "postgres";

pub struct RdsDatabaseApi {
    client: RdsClient,
}

impl RdsDatabaseApi {
    pub fn new(client: RdsClient) -> Self {
        Self { client }
    }
}

fn to_tags(pairs: Vec<(&str, String)>) -> Vec<Tag> {
    pairs
        .into_iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

fn capture_tags(environment: &str) -> Vec<Tag> {
    to_tags(vec![
        ("Name", format!("NWISWEB-CAPTURE-RDS-AURORA-{}", environment.to_uppercase())),
        ("wma:applicationId", "NWISWEB-CAPTURE".to_string()),
        ("wma:environment", environment.to_lowercase()),
        ("wma:organization", "IOW".to_string()),
        ("wma:role", "database".to_string()),
        ("wma:system", "NWIS".to_string()),
        ("wma:subSystem", "NWISWeb-Capture".to_string()),
        ("taggingVersion", "0.0.1".to_string()),
    ])
}

fn observations_tags(environment: &str) -> Vec<Tag> {
    to_tags(vec![
        ("Name", format!("OBSERVATIONS-RDS-{}", environment.to_uppercase())),
        ("wma:applicationId", "OBSERVATIONS".to_string()),
        ("wma:environment", environment.to_lowercase()),
        ("wma:organization", "IOW".to_string()),
        ("wma:role", "database".to_string()),
        ("taggingVersion", "0.0.1".to_string()),
    ])
}

#[async_trait]
impl DatabaseApi for RdsDatabaseApi {
    async fn cluster_status(&self, cluster_identifier: &str) -> Result<Option<String>> {
        let result = self
            .client
            .describe_db_clusters()
            .db_cluster_identifier(cluster_identifier)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response
                .db_clusters()
                .iter()
                .find(|cluster| cluster.db_cluster_identifier() == Some(cluster_identifier))
                .map(|cluster| cluster.status().unwrap_or("unknown").to_string())),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_db_cluster_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn instance(&self, instance_identifier: &str) -> Result<Option<InstanceState>> {
        let result = self
            .client
            .describe_db_instances()
            .db_instance_identifier(instance_identifier)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response
                .db_instances()
                .iter()
                .find(|instance| instance.db_instance_identifier() == Some(instance_identifier))
                .map(|instance| InstanceState {
                    status: instance.db_instance_status().unwrap_or("unknown").to_string(),
                    instance_class: instance.db_instance_class().unwrap_or_default().to_string(),
                })),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_db_instance_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn start_cluster(&self, cluster_identifier: &str) -> Result<()> {
        self.client
            .start_db_cluster()
            .db_cluster_identifier(cluster_identifier)
            .send()
            .await?;
        info!(cluster = %cluster_identifier, "start requested");
        Ok(())
    }

    async fn stop_cluster(&self, cluster_identifier: &str) -> Result<()> {
        self.client
            .stop_db_cluster()
            .db_cluster_identifier(cluster_identifier)
            .send()
            .await?;
        info!(cluster = %cluster_identifier, "stop requested");
        Ok(())
    }

    async fn start_instance(&self, instance_identifier: &str) -> Result<()> {
        self.client
            .start_db_instance()
            .db_instance_identifier(instance_identifier)
            .send()
            .await?;
        info!(instance = %instance_identifier, "start requested");
        Ok(())
    }

    async fn stop_instance(&self, instance_identifier: &str) -> Result<()> {
        self.client
            .stop_db_instance()
            .db_instance_identifier(instance_identifier)
            .send()
            .await?;
        info!(instance = %instance_identifier, "stop requested");
        Ok(())
    }

    async fn modify_instance_class(
        &self,
        instance_identifier: &str,
        instance_class: &str,
    ) -> Result<()> {
        self.client
            .modify_db_instance()
            .db_instance_identifier(instance_identifier)
            .db_instance_class(instance_class)
            .apply_immediately(true)
            .send()
            .await?;
        info!(instance = %instance_identifier, class = %instance_class, "resize requested");
        Ok(())
    }

    async fn delete_instance(&self, instance_identifier: &str) -> Result<Removal> {
        let result = self
            .client
            .delete_db_instance()
            .db_instance_identifier(instance_identifier)
            .skip_final_snapshot(true)
            .send()
            .await;

        match result {
            Ok(_) => Ok(Removal::Removed),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_db_instance_not_found_fault()) =>
            {
                Ok(Removal::AlreadyGone)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_cluster(&self, cluster_identifier: &str) -> Result<Removal> {
        let result = self
            .client
            .delete_db_cluster()
            .db_cluster_identifier(cluster_identifier)
            .skip_final_snapshot(true)
            .send()
            .await;

        match result {
            Ok(_) => Ok(Removal::Removed),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_db_cluster_not_found_fault()) =>
            {
                Ok(Removal::AlreadyGone)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn restore_cluster(&self, request: &RestoreClusterRequest) -> Result<()> {
        self.client
            .restore_db_cluster_from_snapshot()
            .db_cluster_identifier(&request.cluster_identifier)
            .snapshot_identifier(&request.snapshot_identifier)
            .engine(ENGINE)
            .engine_version(ENGINE_VERSION)
            .port(PORT)
            .db_subnet_group_name(&request.subnet_group_name)
            .database_name(&request.database_name)
            .enable_iam_database_authentication(false)
            .engine_mode("provisioned")
            .db_cluster_parameter_group_name(CLUSTER_PARAMETER_GROUP)
            .deletion_protection(false)
            .copy_tags_to_snapshot(false)
            .kms_key_id(&request.kms_key_id)
            .vpc_security_group_ids(&request.security_group_id)
            .set_tags(Some(capture_tags(&request.environment)))
            .send()
            .await?;
        info!(
            cluster = %request.cluster_identifier,
            snapshot = %request.snapshot_identifier,
            "restore requested"
        );
        Ok(())
    }

    async fn create_instance(&self, request: &CreateInstanceRequest) -> Result<()> {
        self.client
            .create_db_instance()
            .db_instance_identifier(&request.instance_identifier)
            .db_instance_class(&request.instance_class)
            .db_cluster_identifier(&request.cluster_identifier)
            .engine(ENGINE)
            .set_tags(Some(capture_tags(&request.environment)))
            .send()
            .await?;
        info!(instance = %request.instance_identifier, "instance creation requested");
        Ok(())
    }

    async fn set_master_password(&self, cluster_identifier: &str, password: &str) -> Result<()> {
        self.client
            .modify_db_cluster()
            .db_cluster_identifier(cluster_identifier)
            .apply_immediately(true)
            .master_user_password(password)
            .send()
            .await?;
        info!(cluster = %cluster_identifier, "master password reset requested");
        Ok(())
    }

    async fn set_instance_master_password(
        &self,
        instance_identifier: &str,
        password: &str,
    ) -> Result<()> {
        self.client
            .modify_db_instance()
            .db_instance_identifier(instance_identifier)
            .apply_immediately(true)
            .master_user_password(password)
            .send()
            .await?;
        info!(instance = %instance_identifier, "master password reset requested");
        Ok(())
    }

    async fn snapshot_status(&self, snapshot_identifier: &str) -> Result<Option<String>> {
        let result = self
            .client
            .describe_db_snapshots()
            .db_snapshot_identifier(snapshot_identifier)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response
                .db_snapshots()
                .iter()
                .find(|snapshot| snapshot.db_snapshot_identifier() == Some(snapshot_identifier))
                .map(|snapshot| snapshot.status().unwrap_or("unknown").to_string())),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_db_snapshot_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn copy_snapshot(
        &self,
        source_identifier: &str,
        target_identifier: &str,
        kms_key_id: &str,
    ) -> Result<()> {
        self.client
            .copy_db_snapshot()
            .source_db_snapshot_identifier(source_identifier)
            .target_db_snapshot_identifier(target_identifier)
            .kms_key_id(kms_key_id)
            .send()
            .await?;
        info!(source = %source_identifier, target = %target_identifier, "snapshot copy requested");
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_identifier: &str) -> Result<Removal> {
        let result = self
            .client
            .delete_db_snapshot()
            .db_snapshot_identifier(snapshot_identifier)
            .send()
            .await;

        match result {
            Ok(_) => Ok(Removal::Removed),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|err| err.is_db_snapshot_not_found_fault()) =>
            {
                Ok(Removal::AlreadyGone)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn restore_instance(&self, request: &RestoreInstanceRequest) -> Result<()> {
        self.client
            .restore_db_instance_from_db_snapshot()
            .db_instance_identifier(&request.instance_identifier)
            .db_snapshot_identifier(&request.snapshot_identifier)
            .db_instance_class(&request.instance_class)
            .engine(OBSERVATIONS_ENGINE)
            .port(PORT)
            .multi_az(false)
            .db_subnet_group_name(&request.subnet_group_name)
            .vpc_security_group_ids(&request.security_group_id)
            .set_tags(Some(observations_tags(&request.environment)))
            .send()
            .await?;
        info!(
            instance = %request.instance_identifier,
            snapshot = %request.snapshot_identifier,
            "instance restore requested"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_tags() {
        let tags = capture_tags("qa");
        let name = tags.iter().find(|tag| tag.key() == Some("Name")).unwrap();
        assert_eq!(name.value(), Some("NWISWEB-CAPTURE-RDS-AURORA-QA"));
        let env = tags
            .iter()
            .find(|tag| tag.key() == Some("wma:environment"))
            .unwrap();
        assert_eq!(env.value(), Some("qa"));
    }

    #[test]
    fn test_observations_tags() {
        let tags = observations_tags("TEST");
        let name = tags.iter().find(|tag| tag.key() == Some("Name")).unwrap();
        assert_eq!(name.value(), Some("OBSERVATIONS-RDS-TEST"));
        assert!(tags.iter().all(|tag| tag.key() != Some("wma:subSystem")));
    }
}
