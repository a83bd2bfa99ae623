use bon::Builder;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::DatabaseApi;
use crate::descriptor::{ResourceDescriptor, ResourceKind, Tier};
use crate::error::LifecycleError;
use crate::gate::{self, Action, GateDecision, GatePolicy, Verdict};
use crate::probe::{Probe, ProbeOutcome};
use crate::triggers::TriggerSynchronizer;

#[derive(Builder, Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: Action,
    pub resource: ResourceDescriptor,
    /// Functions whose event-source mappings follow the database's availability.
    #[builder(default)]
    pub triggers: Vec<String>,
}

impl ActionRequest {
    /// Request against a tier's database, synchronizing the tier's triggers.
    pub fn for_tier(action: Action, kind: ResourceKind, tier: Tier) -> Self {
        Self {
            action,
            resource: ResourceDescriptor::for_tier(kind, tier),
            triggers: tier.profile().triggers,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed {
        message: String,
        triggers_changed: bool,
    },
    /// The gate refused. Carries `Denied` or `Invalid` verdicts.
    Denied(GateDecision),
    /// The resource is mid-transition; re-invoke later.
    NotReady(GateDecision),
    /// The mutating call went through but the trigger flip did not. Needs an
    /// operator to finish the flip; the capacity change is not rolled back.
    Partial { message: String, error: String },
}

/// Probe, gate, mutate, then bring triggers in line. Holds no state between
/// invocations; every call re-reads what it needs.
pub struct LifecycleController {
    probe: Arc<dyn Probe>,
    database: Arc<dyn DatabaseApi>,
    triggers: TriggerSynchronizer,
    policy: GatePolicy,
}

impl LifecycleController {
    pub fn new(
        probe: Arc<dyn Probe>,
        database: Arc<dyn DatabaseApi>,
        triggers: TriggerSynchronizer,
        policy: GatePolicy,
    ) -> Self {
        Self {
            probe,
            database,
            triggers,
            policy,
        }
    }

    pub async fn execute(&self, request: &ActionRequest) -> Result<Outcome, LifecycleError> {
        let resource = &request.resource;
        let action = request.action;
        info!(
            action = %action,
            resource = %resource.target_identifier(),
            "executing lifecycle action"
        );

        let probe = match self.probe.describe(resource, action).await? {
            ProbeOutcome::Found(probe) => probe,
            // Nothing to feed from a database that does not exist.
            ProbeOutcome::NotFound if action == Action::DisableTriggers => {
                warn!(
                    resource = %resource.target_identifier(),
                    "disabling triggers for a missing database"
                );
                return self.finish(request, false).await;
            }
            ProbeOutcome::NotFound => {
                return Err(LifecycleError::NotFound(resource.target_identifier().to_string()))
            }
        };

        let decision = gate::evaluate(action, &probe, &self.policy);
        match decision.verdict {
            Verdict::Allowed => {
                info!(action = %action, reason = %decision.reason, "gate allowed action");
            }
            Verdict::NotReady => {
                info!(action = %action, reason = %decision.reason, "resource not ready");
                return Ok(Outcome::NotReady(decision));
            }
            Verdict::Denied | Verdict::Invalid => {
                info!(action = %action, reason = %decision.reason, "gate denied action");
                return Ok(Outcome::Denied(decision));
            }
        }

        self.mutate(resource, action).await?;
        self.finish(request, true).await
    }

    async fn mutate(
        &self,
        resource: &ResourceDescriptor,
        action: Action,
    ) -> Result<(), LifecycleError> {
        let target = resource.target_identifier();
        let instance = resource.instance_identifier.as_str();
        let clustered = resource.cluster_identifier.is_some();

        let result = match action {
            Action::Start if clustered => self.database.start_cluster(target).await,
            Action::Start => self.database.start_instance(target).await,
            Action::Stop if clustered => self.database.stop_cluster(target).await,
            Action::Stop => self.database.stop_instance(target).await,
            Action::Grow => {
                self.database
                    .modify_instance_class(instance, &self.policy.big_instance_class)
                    .await
            }
            Action::Shrink => {
                self.database
                    .modify_instance_class(instance, &self.policy.small_instance_class)
                    .await
            }
            Action::EnableTriggers | Action::DisableTriggers => return Ok(()),
        };

        result.map_err(|e| {
            error!(action = %action, resource = %target, error = %e, "mutating call failed");
            LifecycleError::upstream(format!("{action} {target}"), e)
        })
    }

    async fn finish(
        &self,
        request: &ActionRequest,
        mutated: bool,
    ) -> Result<Outcome, LifecycleError> {
        let desired = request.action.triggers_enabled_after();
        let message = completion_message(request, &self.policy);

        match self.triggers.synchronize(&request.triggers, desired).await {
            Ok(triggers_changed) => {
                info!(
                    action = %request.action,
                    triggers_changed,
                    enabled = desired,
                    "lifecycle action complete"
                );
                Ok(Outcome::Completed {
                    message,
                    triggers_changed,
                })
            }
            Err(e) if mutated => {
                error!(
                    action = %request.action,
                    error = %e,
                    "trigger synchronization failed after mutation"
                );
                Ok(Outcome::Partial {
                    message: format!(
                        "{message} Trigger synchronization failed and must be completed manually."
                    ),
                    error: format!("{e:#}"),
                })
            }
            Err(e) => Err(LifecycleError::upstream("synchronizing triggers", e)),
        }
    }
}

fn completion_message(request: &ActionRequest, policy: &GatePolicy) -> String {
    let resource = &request.resource;
    let name = resource.display_name();
    match (request.action, resource.kind) {
        (Action::Start, ResourceKind::Primary) => format!("Started the {name}: True"),
        (Action::Stop, ResourceKind::Primary) => format!("Stopped the {name}: True"),
        (Action::Start, ResourceKind::Secondary) => format!("Started the {name}."),
        (Action::Stop, ResourceKind::Secondary) => format!("Stopped the {name}."),
        (Action::Grow, _) => format!(
            "Growing the {name} to {}, please stand by.",
            policy.big_instance_class
        ),
        (Action::Shrink, _) => format!(
            "Shrinking the {name} to {}, please stand by.",
            policy.small_instance_class
        ),
        (Action::EnableTriggers, _) => format!("Enabled triggers for the {name}."),
        (Action::DisableTriggers, _) => format!("Disabled triggers for the {name}."),
    }
}
