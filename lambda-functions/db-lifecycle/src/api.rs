//! Interfaces to the systems the controller reads from and acts upon.
//!
//! Every collaborator is an object-safe async trait so the bootstrap binaries
//! can hand AWS-backed implementations to the controller while tests hand it
//! mocks. Implementations return `anyhow::Result`; the controller adds the
//! context of the operation it was performing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::descriptor::Tier;
use crate::secret::DatabaseSecret;
use crate::triggers::{TriggerBinding, TriggerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceState {
    pub status: String,
    pub instance_class: String,
}

/// Result of a delete call. A resource that was already absent is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyGone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreClusterRequest {
    pub cluster_identifier: String,
    pub snapshot_identifier: String,
    pub database_name: String,
    pub kms_key_id: String,
    pub subnet_group_name: String,
    pub security_group_id: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstanceRequest {
    pub instance_identifier: String,
    pub cluster_identifier: String,
    pub instance_class: String,
    pub environment: String,
}

/// Standalone instance restored from an instance snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreInstanceRequest {
    pub instance_identifier: String,
    pub snapshot_identifier: String,
    pub instance_class: String,
    pub subnet_group_name: String,
    pub security_group_id: String,
    pub environment: String,
}

/// New password for one login role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePassword {
    pub role: String,
    pub password: String,
}

/// Managed relational database control plane.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    /// `None` when no cluster with this identifier exists.
    async fn cluster_status(&self, cluster_identifier: &str) -> Result<Option<String>>;

    /// `None` when no instance with this identifier exists.
    async fn instance(&self, instance_identifier: &str) -> Result<Option<InstanceState>>;

    async fn start_cluster(&self, cluster_identifier: &str) -> Result<()>;

    async fn stop_cluster(&self, cluster_identifier: &str) -> Result<()>;

    async fn start_instance(&self, instance_identifier: &str) -> Result<()>;

    async fn stop_instance(&self, instance_identifier: &str) -> Result<()>;

    async fn modify_instance_class(
        &self,
        instance_identifier: &str,
        instance_class: &str,
    ) -> Result<()>;

    async fn delete_instance(&self, instance_identifier: &str) -> Result<Removal>;

    async fn delete_cluster(&self, cluster_identifier: &str) -> Result<Removal>;

    async fn restore_cluster(&self, request: &RestoreClusterRequest) -> Result<()>;

    async fn create_instance(&self, request: &CreateInstanceRequest) -> Result<()>;

    async fn set_master_password(&self, cluster_identifier: &str, password: &str) -> Result<()>;

    async fn set_instance_master_password(
        &self,
        instance_identifier: &str,
        password: &str,
    ) -> Result<()>;

    /// `None` when no snapshot with this identifier exists.
    async fn snapshot_status(&self, snapshot_identifier: &str) -> Result<Option<String>>;

    /// Copies an instance snapshot, re-encrypting it with `kms_key_id`.
    async fn copy_snapshot(
        &self,
        source_identifier: &str,
        target_identifier: &str,
        kms_key_id: &str,
    ) -> Result<()>;

    async fn delete_snapshot(&self, snapshot_identifier: &str) -> Result<Removal>;

    async fn restore_instance(&self, request: &RestoreInstanceRequest) -> Result<()>;
}

/// CPU utilization samples, oldest first.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn cpu_utilization(
        &self,
        instance_identifier: &str,
        period_seconds: i32,
        window: Duration,
    ) -> Result<Vec<f64>>;
}

/// Count of batch jobs that have neither completed nor failed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn count_outstanding_jobs(
        &self,
        tier: Tier,
        started_after: DateTime<Utc>,
    ) -> Result<u64>;
}

/// Login roles inside a database, changed by connecting with the credentials
/// held in `connection`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoleAdmin: Send + Sync {
    async fn set_role_passwords(
        &self,
        connection: &DatabaseSecret,
        changes: &[RolePassword],
    ) -> Result<()>;
}

/// Event-source mappings attached to a function.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TriggerRegistry: Send + Sync {
    async fn list_mappings(&self, function_name: &str) -> Result<Vec<TriggerBinding>>;

    async fn mapping_state(&self, uuid: &str) -> Result<TriggerState>;

    async fn set_enabled(&self, uuid: &str, enabled: bool) -> Result<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueueApi: Send + Sync {
    async fn purge(&self, queue_name: &str) -> Result<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The secret's string value parsed as JSON.
    async fn secret_json(&self, secret_id: &str) -> Result<Value>;
}
