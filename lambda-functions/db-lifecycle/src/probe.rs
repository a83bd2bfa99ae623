use async_trait::async_trait;
use bon::Builder;
use chrono::{Duration, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::{DatabaseApi, JobTracker, MetricsSource};
use crate::config::LifecycleConfig;
use crate::descriptor::{ResourceDescriptor, ResourceKind};
use crate::error::LifecycleError;
use crate::gate::Action;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Transitioning,
    Stopped,
    Unknown,
}

impl Availability {
    pub fn from_status(status: &str) -> Self {
        match status {
            "available" => Self::Available,
            "stopped" => Self::Stopped,
            "starting" | "stopping" | "modifying" | "rebooting" | "creating" | "deleting"
            | "backing-up" | "upgrading" | "maintenance" | "renaming"
            | "resetting-master-credentials" | "configuring-enhanced-monitoring"
            | "storage-optimization" | "failing-over" | "backtracking" | "promoting"
            | "migrating" | "update-iam-db-auth" => Self::Transitioning,
            _ => Self::Unknown,
        }
    }
}

/// Point-in-time view of one database. Built fresh for every decision.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(on(String, into))]
pub struct ProbeResult {
    pub availability: Availability,

    /// Raw status string reported by the control plane.
    #[builder(default)]
    pub status: String,

    /// Empty unless the action compares size classes.
    #[builder(default)]
    pub instance_size_class: String,

    /// Oldest first, unaveraged.
    #[builder(default)]
    pub cpu_utilization_samples: Vec<f64>,

    #[builder(default)]
    pub outstanding_job_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Found(ProbeResult),
    /// Distinct from `Transitioning`: fatal for most actions, the desired
    /// precondition for a rebuild.
    NotFound,
}

/// Read-only state query against a managed database.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Probe: Send + Sync {
    /// Reads only what the gate needs to decide `action`.
    async fn describe(
        &self,
        resource: &ResourceDescriptor,
        action: Action,
    ) -> Result<ProbeOutcome, LifecycleError>;
}

pub struct ControlPlaneProbe {
    database: Arc<dyn DatabaseApi>,
    metrics: Arc<dyn MetricsSource>,
    jobs: Arc<dyn JobTracker>,
    config: LifecycleConfig,
}

impl ControlPlaneProbe {
    pub fn new(
        database: Arc<dyn DatabaseApi>,
        metrics: Arc<dyn MetricsSource>,
        jobs: Arc<dyn JobTracker>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            database,
            metrics,
            jobs,
            config,
        }
    }

    fn evaluation_window(&self, action: Action) -> Duration {
        match action {
            Action::Shrink => Duration::seconds(self.config.shrink_window_seconds),
            _ => Duration::seconds(self.config.grow_window_seconds),
        }
    }
}

#[async_trait]
impl Probe for ControlPlaneProbe {
    async fn describe(
        &self,
        resource: &ResourceDescriptor,
        action: Action,
    ) -> Result<ProbeOutcome, LifecycleError> {
        let instance_id = resource.instance_identifier.as_str();
        let needs_size = matches!(action, Action::Grow | Action::Shrink);
        let reads_instance = needs_size || action == Action::EnableTriggers;

        let (status, instance) = match &resource.cluster_identifier {
            Some(cluster_id) => {
                let status = self.database.cluster_status(cluster_id).await.map_err(|e| {
                    LifecycleError::upstream(format!("describing cluster {cluster_id}"), e)
                })?;
                let instance = match (&status, reads_instance) {
                    (Some(_), true) => Some(self.describe_instance(instance_id).await?),
                    _ => None,
                };
                (status, instance)
            }
            None => match self.describe_instance(instance_id).await? {
                Some(state) => (Some(state.status.clone()), Some(Some(state))),
                None => (None, None),
            },
        };

        let Some(mut status) = status else {
            info!(resource = %resource.target_identifier(), "resource not found");
            return Ok(ProbeOutcome::NotFound);
        };

        let mut availability = Availability::from_status(&status);

        // A cluster reports available while its writer instance is still
        // being resized or created.
        if availability == Availability::Available {
            match &instance {
                Some(Some(state)) if state.status != "available" => {
                    info!(
                        instance = %instance_id,
                        status = %state.status,
                        "instance is not settled"
                    );
                    availability = Availability::Transitioning;
                    status = state.status.clone();
                }
                Some(None) if !needs_size => {
                    info!(instance = %instance_id, "cluster has no instance yet");
                    availability = Availability::Transitioning;
                    status = "instance-missing".to_string();
                }
                _ => {}
            }
        }

        let mut result = ProbeResult::builder()
            .availability(availability)
            .status(status)
            .build();

        if needs_size {
            let Some(Some(state)) = instance else {
                info!(instance = %instance_id, "instance not found");
                return Ok(ProbeOutcome::NotFound);
            };
            result.instance_size_class = state.instance_class;
            result.cpu_utilization_samples = self
                .metrics
                .cpu_utilization(
                    instance_id,
                    self.config.metric_period_seconds,
                    self.evaluation_window(action),
                )
                .await
                .map_err(|e| {
                    LifecycleError::upstream(format!("reading CPU utilization of {instance_id}"), e)
                })?;
        }

        // Only a running database can be asked about its batch jobs.
        if action == Action::Stop && availability == Availability::Available {
            result.outstanding_job_count = self.outstanding_jobs(resource).await?;
        }

        info!(
            resource = %resource.target_identifier(),
            action = %action,
            status = %result.status,
            instance_class = %result.instance_size_class,
            samples = ?result.cpu_utilization_samples,
            outstanding_jobs = result.outstanding_job_count,
            "probed resource"
        );

        Ok(ProbeOutcome::Found(result))
    }
}

impl ControlPlaneProbe {
    /// Jobs are recorded in the tier's observations database. When that
    /// database is not running nothing can be writing to it, so the count is
    /// zero without connecting.
    async fn outstanding_jobs(&self, resource: &ResourceDescriptor) -> Result<u64, LifecycleError> {
        if resource.kind == ResourceKind::Primary {
            let tracking_db = resource.tier.profile().observations_instance;
            let status = self.describe_instance(&tracking_db).await?.map(|state| state.status);
            if status.as_deref() != Some("available") {
                info!(
                    instance = %tracking_db,
                    status = status.as_deref().unwrap_or("missing"),
                    "job database is not running, no outstanding jobs"
                );
                return Ok(0);
            }
        }

        let cutoff = Utc::now() - self.config.etl_staleness();
        self.jobs
            .count_outstanding_jobs(resource.tier, cutoff)
            .await
            .map_err(|e| LifecycleError::upstream("counting outstanding batch jobs", e))
    }

    async fn describe_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<crate::api::InstanceState>, LifecycleError> {
        self.database
            .instance(instance_id)
            .await
            .map_err(|e| LifecycleError::upstream(format!("describing instance {instance_id}"), e))
    }
}
