pub mod api;
pub mod aws;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod gate;
pub mod postgres;
pub mod probe;
pub mod rebuild;
pub mod secret;
pub mod telemetry;
pub mod triggers;

pub use config::LifecycleConfig;
pub use controller::{ActionRequest, LifecycleController, Outcome};
pub use descriptor::{ResourceDescriptor, ResourceKind, Tier};
pub use error::LifecycleError;
pub use event::{Invocation, Response};
pub use gate::{Action, GateDecision, GatePolicy, Verdict};
pub use rebuild::{RebuildEvent, RebuildStep, Rebuilder};

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::aws::{
    CloudWatchMetrics, LambdaTriggerRegistry, RdsDatabaseApi, SecretsManagerStore, SqsQueues,
};
use crate::postgres::{PostgresJobTracker, PostgresRoleAdmin};
use crate::probe::ControlPlaneProbe;
use crate::triggers::TriggerSynchronizer;

/// Everything one warm Lambda container needs to serve invocations.
pub struct LifecycleService {
    pub config: LifecycleConfig,
    controller: LifecycleController,
    rebuilder: Rebuilder,
}

impl LifecycleService {
    pub fn new(
        config: LifecycleConfig,
        controller: LifecycleController,
        rebuilder: Rebuilder,
    ) -> Self {
        Self {
            config,
            controller,
            rebuilder,
        }
    }

    /// Reads configuration and builds AWS clients once per container.
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = LifecycleConfig::from_env()?;
        let sdk = aws::load_config(&config.region).await;

        let database = Arc::new(RdsDatabaseApi::new(aws_sdk_rds::Client::new(&sdk)));
        let metrics = Arc::new(CloudWatchMetrics::new(aws_sdk_cloudwatch::Client::new(&sdk)));
        let secrets = Arc::new(SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(
            &sdk,
        )));
        let queues = Arc::new(SqsQueues::new(aws_sdk_sqs::Client::new(&sdk)));
        let triggers = TriggerSynchronizer::new(Arc::new(LambdaTriggerRegistry::new(
            aws_sdk_lambda::Client::new(&sdk),
        )));
        let jobs = Arc::new(PostgresJobTracker::new(secrets.clone()));

        let probe = Arc::new(ControlPlaneProbe::new(
            database.clone(),
            metrics,
            jobs,
            config.clone(),
        ));
        let controller = LifecycleController::new(
            probe,
            database.clone(),
            triggers.clone(),
            GatePolicy::from(&config),
        );
        let rebuilder = Rebuilder::new(
            database,
            secrets,
            queues,
            Arc::new(PostgresRoleAdmin),
            triggers,
            config.big_instance_class.clone(),
            config.small_instance_class.clone(),
        );

        info!(stage = %config.stage, region = %config.region, "lifecycle service ready");
        Ok(Self::new(config, controller, rebuilder))
    }

    pub async fn handle(&self, invocation: Invocation) -> Result<Response, LifecycleError> {
        let label = invocation.label();
        let request = match invocation.resolve(&self.config.stage) {
            Ok(request) => request,
            Err(decision) => {
                warn!(invocation = %label, reason = %decision.reason, "invocation not actionable");
                return Ok(Response::unresolved(&label, decision));
            }
        };

        match self.controller.execute(&request).await {
            Ok(outcome) => Ok(Response::from_outcome(&request, outcome)),
            Err(LifecycleError::Validation(reason)) => {
                Ok(Response::unresolved(&label, GateDecision::invalid(reason)))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn handle_rebuild(&self, event: RebuildEvent) -> Result<Response, LifecycleError> {
        self.rebuilder
            .handle(&event, &self.config.stage, Utc::now().date_naive())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        MockDatabaseApi, MockQueueApi, MockRoleAdmin, MockSecretStore, MockTriggerRegistry,
    };
    use crate::probe::{Availability, MockProbe, ProbeOutcome, ProbeResult};
    use serde_json::json;

    fn service(probe: MockProbe, database: MockDatabaseApi) -> LifecycleService {
        let config = LifecycleConfig::builder().stage("TEST").build();
        let database = Arc::new(database);
        let triggers = TriggerSynchronizer::new(Arc::new(MockTriggerRegistry::new()));
        let controller = LifecycleController::new(
            Arc::new(probe),
            database.clone(),
            triggers.clone(),
            GatePolicy::from(&config),
        );
        let rebuilder = Rebuilder::new(
            database,
            Arc::new(MockSecretStore::new()),
            Arc::new(MockQueueApi::new()),
            Arc::new(MockRoleAdmin::new()),
            triggers,
            config.big_instance_class.clone(),
            config.small_instance_class.clone(),
        );
        LifecycleService::new(config, controller, rebuilder)
    }

    #[tokio::test]
    async fn test_unknown_action_is_a_400_without_touching_aws() {
        let mut probe = MockProbe::new();
        probe.expect_describe().never();

        let invocation: Invocation = serde_json::from_value(json!({"action": "reboot"})).unwrap();
        let response = service(probe, MockDatabaseApi::new())
            .handle(invocation)
            .await
            .unwrap();
        assert_eq!(response.status_code, 400);
        assert_eq!(response.action, "reboot");
    }

    #[tokio::test]
    async fn test_transitioning_database_is_a_503() {
        let mut probe = MockProbe::new();
        probe.expect_describe().returning(|_, _| {
            Ok(ProbeOutcome::Found(
                ProbeResult::builder()
                    .availability(Availability::Transitioning)
                    .status("starting")
                    .build(),
            ))
        });
        let mut database = MockDatabaseApi::new();
        database.expect_stop_cluster().never();

        let invocation: Invocation = serde_json::from_value(json!({"action": "stop"})).unwrap();
        let response = service(probe, database).handle(invocation).await.unwrap();
        assert_eq!(response.status_code, 503);
        assert_eq!(response.status, "not_ready");
        assert!(response.message.starts_with("Cannot stop the TEST db yet"));
    }

    #[tokio::test]
    async fn test_missing_database_is_an_error() {
        let mut probe = MockProbe::new();
        probe
            .expect_describe()
            .returning(|_, _| Ok(ProbeOutcome::NotFound));

        let invocation: Invocation =
            serde_json::from_value(json!({"action": "start", "tier": "QA"})).unwrap();
        let err = service(probe, MockDatabaseApi::new())
            .handle(invocation)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(id) if id == "nwcapture-qa"));
    }
}
