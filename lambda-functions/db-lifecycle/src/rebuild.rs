//! Delete and recreate a tier's databases from snapshots, one step per
//! invocation. An external state machine sequences the steps and re-invokes
//! a step that reports `not_ready`.
//!
//! The capture cluster is restored from the nightly production cluster
//! snapshot. The observations database is restored from a re-encrypted copy
//! of a production instance snapshot.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::{
    CreateInstanceRequest, DatabaseApi, QueueApi, Removal, RestoreClusterRequest,
    RestoreInstanceRequest, RoleAdmin, RolePassword, SecretStore,
};
use crate::controller::Outcome;
use crate::descriptor::{ResourceKind, Tier, TierProfile};
use crate::error::LifecycleError;
use crate::event::Response;
use crate::gate::GateDecision;
use crate::probe::Availability;
use crate::secret::DatabaseSecret;
use crate::triggers::TriggerSynchronizer;

/// Production observations snapshot copied when the event names none.
pub const DEFAULT_OBSERVATIONS_SNAPSHOT: &str = "rds:observations-prod-external-2-2020-10-26-07-01";

const SCHEMA_OWNER: &str = "capture_owner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStep {
    DeleteCluster,
    RestoreCluster,
    CreateInstance,
    ResetMasterPassword,
    ResetSchemaOwnerPassword,
    Reopen,
    DeleteObservationDb,
    CopyObservationSnapshot,
    CreateObservationDb,
    ResetObservationMasterPassword,
    ResetObservationRolePasswords,
}

impl RebuildStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteCluster => "delete_cluster",
            Self::RestoreCluster => "restore_cluster",
            Self::CreateInstance => "create_instance",
            Self::ResetMasterPassword => "reset_master_password",
            Self::ResetSchemaOwnerPassword => "reset_schema_owner_password",
            Self::Reopen => "reopen",
            Self::DeleteObservationDb => "delete_observation_db",
            Self::CopyObservationSnapshot => "copy_observation_snapshot",
            Self::CreateObservationDb => "create_observation_db",
            Self::ResetObservationMasterPassword => "reset_observation_master_password",
            Self::ResetObservationRolePasswords => "reset_observation_role_passwords",
        }
    }

    /// Which of the tier's databases the step rebuilds.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::DeleteCluster
            | Self::RestoreCluster
            | Self::CreateInstance
            | Self::ResetMasterPassword
            | Self::ResetSchemaOwnerPassword
            | Self::Reopen => ResourceKind::Primary,
            Self::DeleteObservationDb
            | Self::CopyObservationSnapshot
            | Self::CreateObservationDb
            | Self::ResetObservationMasterPassword
            | Self::ResetObservationRolePasswords => ResourceKind::Secondary,
        }
    }
}

impl FromStr for RebuildStep {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete_cluster" => Ok(Self::DeleteCluster),
            "restore_cluster" => Ok(Self::RestoreCluster),
            "create_instance" => Ok(Self::CreateInstance),
            "reset_master_password" => Ok(Self::ResetMasterPassword),
            "reset_schema_owner_password" | "modify_schema_owner_password" => {
                Ok(Self::ResetSchemaOwnerPassword)
            }
            "reopen" => Ok(Self::Reopen),
            "delete_observation_db" => Ok(Self::DeleteObservationDb),
            "copy_observation_snapshot" | "copy_observation_db_snapshot" => {
                Ok(Self::CopyObservationSnapshot)
            }
            "create_observation_db" => Ok(Self::CreateObservationDb),
            "reset_observation_master_password" | "modify_observation_postgres_password" => {
                Ok(Self::ResetObservationMasterPassword)
            }
            "reset_observation_role_passwords" | "modify_observation_passwords" => {
                Ok(Self::ResetObservationRolePasswords)
            }
            _ => Err(LifecycleError::Validation(format!(
                "unrecognized rebuild step: {s:?}"
            ))),
        }
    }
}

impl fmt::Display for RebuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RebuildEvent {
    pub step: String,
    pub tier: Option<String>,
    #[serde(default)]
    pub db_config: DbConfig,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DbConfig {
    /// Source snapshot for `restore_cluster` or `copy_observation_snapshot`.
    pub snapshot_identifier: Option<String>,
}

/// Snapshot taken by the nightly backup window two days before `today`.
pub fn default_snapshot_identifier(today: NaiveDate) -> String {
    let day = today - Duration::days(2);
    format!("rds:nwcapture-prod-external-{}-10-08", day.format("%Y-%m-%d"))
}

/// Login roles of the observations database and the secret keys holding
/// their passwords.
fn observation_roles(secret: &DatabaseSecret) -> [(&'static str, &'static str, &String); 6] {
    [
        ("wqp_core", "DB_OWNER_PASSWORD", &secret.db_owner_password),
        ("wqp_user", "WQP_READ_ONLY_PASSWORD", &secret.wqp_read_only_password),
        ("ars_owner", "ARS_SCHEMA_OWNER_PASSWORD", &secret.ars_schema_owner_password),
        ("nwis_ws_star_owner", "NWIS_SCHEMA_OWNER_PASSWORD", &secret.nwis_schema_owner_password),
        ("epa_owner", "EPA_SCHEMA_OWNER_PASSWORD", &secret.epa_schema_owner_password),
        ("wdfn_user", "WDFN_DB_READ_ONLY_PASSWORD", &secret.wdfn_db_read_only_password),
    ]
}

pub struct Rebuilder {
    database: Arc<dyn DatabaseApi>,
    secrets: Arc<dyn SecretStore>,
    queues: Arc<dyn QueueApi>,
    roles: Arc<dyn RoleAdmin>,
    triggers: TriggerSynchronizer,
    big_instance_class: String,
    small_instance_class: String,
}

impl Rebuilder {
    pub fn new(
        database: Arc<dyn DatabaseApi>,
        secrets: Arc<dyn SecretStore>,
        queues: Arc<dyn QueueApi>,
        roles: Arc<dyn RoleAdmin>,
        triggers: TriggerSynchronizer,
        big_instance_class: impl Into<String>,
        small_instance_class: impl Into<String>,
    ) -> Self {
        Self {
            database,
            secrets,
            queues,
            roles,
            triggers,
            big_instance_class: big_instance_class.into(),
            small_instance_class: small_instance_class.into(),
        }
    }

    /// Parses and runs one invocation. Malformed events become 400 responses.
    pub async fn handle(
        &self,
        event: &RebuildEvent,
        default_stage: &str,
        today: NaiveDate,
    ) -> Result<Response, LifecycleError> {
        let parsed = event.step.parse::<RebuildStep>().and_then(|step| {
            let tier: Tier = event.tier.as_deref().unwrap_or(default_stage).parse()?;
            Ok((step, tier))
        });
        let (step, tier) = match parsed {
            Ok(parsed) => parsed,
            Err(LifecycleError::Validation(reason)) => {
                warn!(step = %event.step, reason = %reason, "rejected rebuild event");
                return Ok(Response::unresolved(&event.step, GateDecision::invalid(reason)));
            }
            Err(e) => return Err(e),
        };

        let subject = match step.kind() {
            ResourceKind::Primary => format!("{tier} db cluster"),
            ResourceKind::Secondary => format!("{tier} observations db"),
        };
        match self.run(step, tier, &event.db_config, today).await {
            Ok(outcome) => Ok(Response::describe(step.as_str(), &subject, outcome)),
            Err(LifecycleError::Validation(reason)) => {
                Ok(Response::unresolved(step.as_str(), GateDecision::invalid(reason)))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn run(
        &self,
        step: RebuildStep,
        tier: Tier,
        db_config: &DbConfig,
        today: NaiveDate,
    ) -> Result<Outcome, LifecycleError> {
        let profile = tier.profile();
        let target = match step.kind() {
            ResourceKind::Primary => &profile.capture_cluster,
            ResourceKind::Secondary => &profile.observations_instance,
        };
        info!(step = %step, tier = %tier, target = %target, "running rebuild step");

        match step {
            RebuildStep::DeleteCluster => self.delete_cluster(tier, &profile).await,
            RebuildStep::RestoreCluster => {
                let snapshot = db_config
                    .snapshot_identifier
                    .clone()
                    .unwrap_or_else(|| default_snapshot_identifier(today));
                self.restore_cluster(tier, &profile, snapshot).await
            }
            RebuildStep::CreateInstance => self.create_instance(tier, &profile).await,
            RebuildStep::ResetMasterPassword => self.reset_master_password(tier, &profile).await,
            RebuildStep::ResetSchemaOwnerPassword => {
                self.reset_schema_owner_password(tier, &profile).await
            }
            RebuildStep::Reopen => self.reopen(tier, &profile).await,
            RebuildStep::DeleteObservationDb => self.delete_observation_db(tier, &profile).await,
            RebuildStep::CopyObservationSnapshot => {
                let source = db_config
                    .snapshot_identifier
                    .as_deref()
                    .unwrap_or(DEFAULT_OBSERVATIONS_SNAPSHOT);
                self.copy_observation_snapshot(&profile, source).await
            }
            RebuildStep::CreateObservationDb => self.create_observation_db(tier, &profile).await,
            RebuildStep::ResetObservationMasterPassword => {
                self.reset_observation_master_password(tier, &profile).await
            }
            RebuildStep::ResetObservationRolePasswords => {
                self.reset_observation_role_passwords(tier, &profile).await
            }
        }
    }

    async fn delete_cluster(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        let instance = self.delete_instance(&profile.capture_instance).await?;
        info!(
            instance = %profile.capture_instance,
            removal = ?instance,
            "capture instance deleted"
        );

        let cluster = self
            .database
            .delete_cluster(&profile.capture_cluster)
            .await
            .map_err(|e| {
                LifecycleError::upstream(format!("deleting {}", profile.capture_cluster), e)
            })?;
        let message = match cluster {
            Removal::Removed => {
                format!("Deleting the {tier} db cluster {}.", profile.capture_cluster)
            }
            Removal::AlreadyGone => format!(
                "The {tier} db cluster {} was already deleted.",
                profile.capture_cluster
            ),
        };

        self.sync_triggers(&profile.triggers, false, message).await
    }

    async fn restore_cluster(
        &self,
        tier: Tier,
        profile: &TierProfile,
        snapshot_identifier: String,
    ) -> Result<Outcome, LifecycleError> {
        let secret = self.provisioning_secret(&profile.capture_secret).await?;

        if let Some(status) = self.cluster_status(&profile.capture_cluster).await? {
            return Ok(Outcome::Denied(GateDecision::deny(format!(
                "cluster {} already exists ({status})",
                profile.capture_cluster
            ))));
        }

        let request = RestoreClusterRequest {
            cluster_identifier: profile.capture_cluster.clone(),
            snapshot_identifier,
            database_name: profile.capture_database.clone(),
            kms_key_id: secret.kms_key_id,
            subnet_group_name: secret.db_subgroup_name,
            security_group_id: secret.vpc_security_group_id,
            environment: tier.as_str().to_string(),
        };
        self.database.restore_cluster(&request).await.map_err(|e| {
            LifecycleError::upstream(format!("restoring {}", request.cluster_identifier), e)
        })?;

        Ok(Outcome::Completed {
            message: format!(
                "Restoring the {tier} db cluster from {}, please stand by.",
                request.snapshot_identifier
            ),
            triggers_changed: false,
        })
    }

    async fn create_instance(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        if let Some(decision) = self.require_available(&profile.capture_cluster).await? {
            return Ok(Outcome::NotReady(decision));
        }

        if let Some(existing) = self.instance_status(&profile.capture_instance).await? {
            return Ok(Outcome::Denied(GateDecision::deny(format!(
                "instance {} already exists ({existing})",
                profile.capture_instance
            ))));
        }

        let request = CreateInstanceRequest {
            instance_identifier: profile.capture_instance.clone(),
            cluster_identifier: profile.capture_cluster.clone(),
            instance_class: self.big_instance_class.clone(),
            environment: tier.as_str().to_string(),
        };
        self.database.create_instance(&request).await.map_err(|e| {
            LifecycleError::upstream(format!("creating {}", request.instance_identifier), e)
        })?;

        Ok(Outcome::Completed {
            message: format!(
                "Creating {} as {}, please stand by.",
                request.instance_identifier, request.instance_class
            ),
            triggers_changed: false,
        })
    }

    async fn reset_master_password(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        if let Some(decision) = self.require_available(&profile.capture_cluster).await? {
            return Ok(Outcome::NotReady(decision));
        }

        let secret = self.secret(&profile.capture_secret).await?;
        require_present(&profile.capture_secret, "POSTGRES_PASSWORD", &secret.postgres_password)?;

        self.database
            .set_master_password(&profile.capture_cluster, &secret.postgres_password)
            .await
            .map_err(|e| {
                LifecycleError::upstream(format!("modifying {}", profile.capture_cluster), e)
            })?;

        Ok(Outcome::Completed {
            message: format!("Reset the master password of the {tier} db cluster."),
            triggers_changed: false,
        })
    }

    async fn reset_schema_owner_password(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        if let Some(decision) = self.require_available(&profile.capture_cluster).await? {
            return Ok(Outcome::NotReady(decision));
        }

        let secret = self.connection_secret(&profile.capture_secret).await?;
        require_present(
            &profile.capture_secret,
            "SCHEMA_OWNER_PASSWORD",
            &secret.schema_owner_password,
        )?;

        let changes = [RolePassword {
            role: SCHEMA_OWNER.to_string(),
            password: secret.schema_owner_password.clone(),
        }];
        self.roles
            .set_role_passwords(&secret, &changes)
            .await
            .map_err(|e| {
                LifecycleError::upstream(format!("changing {SCHEMA_OWNER} password"), e)
            })?;

        Ok(Outcome::Completed {
            message: format!("Changed the {SCHEMA_OWNER} password in the {tier} db cluster."),
            triggers_changed: false,
        })
    }

    async fn reopen(&self, tier: Tier, profile: &TierProfile) -> Result<Outcome, LifecycleError> {
        if let Some(decision) = self.require_available(&profile.capture_cluster).await? {
            return Ok(Outcome::NotReady(decision));
        }

        for queue in &profile.queues {
            self.queues
                .purge(queue)
                .await
                .map_err(|e| LifecycleError::upstream(format!("purging {queue}"), e))?;
            info!(queue = %queue, "purged capture queue");
        }

        let message = format!("Reopened the {tier} db cluster for capture.");
        self.sync_triggers(&profile.triggers, true, message).await
    }

    /// Removes the observations instance and the re-encrypted snapshot left
    /// by an earlier rebuild. Either may already be gone.
    async fn delete_observation_db(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        let instance = self.delete_instance(&profile.observations_instance).await?;
        let snapshot = self
            .database
            .delete_snapshot(&profile.observations_snapshot)
            .await
            .map_err(|e| {
                LifecycleError::upstream(format!("deleting {}", profile.observations_snapshot), e)
            })?;
        info!(
            instance = %profile.observations_instance,
            snapshot = %profile.observations_snapshot,
            instance_removal = ?instance,
            snapshot_removal = ?snapshot,
            "observations database deleted"
        );

        let message = match instance {
            Removal::Removed => format!(
                "Deleting the {tier} observations db {}.",
                profile.observations_instance
            ),
            Removal::AlreadyGone => format!(
                "The {tier} observations db {} was already deleted.",
                profile.observations_instance
            ),
        };
        Ok(Outcome::Completed {
            message,
            triggers_changed: false,
        })
    }

    async fn copy_observation_snapshot(
        &self,
        profile: &TierProfile,
        source: &str,
    ) -> Result<Outcome, LifecycleError> {
        let secret = self.provisioning_secret(&profile.observations_secret).await?;
        let target = &profile.observations_snapshot;

        if let Some(status) = self.snapshot_status(target).await? {
            return Ok(Outcome::Denied(GateDecision::deny(format!(
                "snapshot {target} already exists ({status})"
            ))));
        }

        self.database
            .copy_snapshot(source, target, &secret.kms_key_id)
            .await
            .map_err(|e| LifecycleError::upstream(format!("copying {source} to {target}"), e))?;

        Ok(Outcome::Completed {
            message: format!("Copying {source} to {target}, please stand by."),
            triggers_changed: false,
        })
    }

    async fn create_observation_db(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        let secret = self.provisioning_secret(&profile.observations_secret).await?;
        let instance = &profile.observations_instance;
        let snapshot = &profile.observations_snapshot;

        if let Some(status) = self.instance_status(instance).await? {
            return Ok(Outcome::Denied(GateDecision::deny(format!(
                "instance {instance} already exists ({status})"
            ))));
        }

        let waiting = match self.snapshot_status(snapshot).await? {
            None => Some(format!("snapshot {snapshot} does not exist yet")),
            Some(status) if status == "available" => None,
            Some(status) => Some(format!("snapshot {snapshot} is {status}")),
        };
        if let Some(reason) = waiting {
            info!(snapshot = %snapshot, reason = %reason, "snapshot not ready for restore");
            return Ok(Outcome::NotReady(GateDecision::not_ready(reason)));
        }

        let request = RestoreInstanceRequest {
            instance_identifier: instance.clone(),
            snapshot_identifier: snapshot.clone(),
            instance_class: self.small_instance_class.clone(),
            subnet_group_name: secret.db_subgroup_name,
            security_group_id: secret.vpc_security_group_id,
            environment: tier.as_str().to_string(),
        };
        self.database
            .restore_instance(&request)
            .await
            .map_err(|e| LifecycleError::upstream(format!("restoring {instance}"), e))?;

        Ok(Outcome::Completed {
            message: format!(
                "Restoring the {tier} observations db from {snapshot}, please stand by."
            ),
            triggers_changed: false,
        })
    }

    async fn reset_observation_master_password(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        let instance = &profile.observations_instance;
        if let Some(decision) = self.require_instance_available(instance).await? {
            return Ok(Outcome::NotReady(decision));
        }

        let secret = self.secret(&profile.observations_secret).await?;
        require_present(
            &profile.observations_secret,
            "POSTGRES_PASSWORD",
            &secret.postgres_password,
        )?;

        self.database
            .set_instance_master_password(instance, &secret.postgres_password)
            .await
            .map_err(|e| LifecycleError::upstream(format!("modifying {instance}"), e))?;

        Ok(Outcome::Completed {
            message: format!("Reset the master password of the {tier} observations db."),
            triggers_changed: false,
        })
    }

    async fn reset_observation_role_passwords(
        &self,
        tier: Tier,
        profile: &TierProfile,
    ) -> Result<Outcome, LifecycleError> {
        let instance = &profile.observations_instance;
        if let Some(decision) = self.require_instance_available(instance).await? {
            return Ok(Outcome::NotReady(decision));
        }

        let secret = self.connection_secret(&profile.observations_secret).await?;
        let roles = observation_roles(&secret);
        let missing: Vec<&str> = roles
            .iter()
            .filter(|(_, _, password)| password.trim().is_empty())
            .map(|(_, key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(LifecycleError::Validation(format!(
                "secret {} is missing {}",
                profile.observations_secret,
                missing.join(", ")
            )));
        }

        let changes: Vec<RolePassword> = roles
            .iter()
            .map(|(role, _, password)| RolePassword {
                role: role.to_string(),
                password: password.to_string(),
            })
            .collect();
        self.roles
            .set_role_passwords(&secret, &changes)
            .await
            .map_err(|e| {
                LifecycleError::upstream(format!("changing role passwords on {instance}"), e)
            })?;

        Ok(Outcome::Completed {
            message: format!(
                "Changed {} role passwords in the {tier} observations db.",
                changes.len()
            ),
            triggers_changed: false,
        })
    }

    async fn sync_triggers(
        &self,
        triggers: &[String],
        enabled: bool,
        message: String,
    ) -> Result<Outcome, LifecycleError> {
        match self.triggers.synchronize(triggers, enabled).await {
            Ok(triggers_changed) => Ok(Outcome::Completed {
                message,
                triggers_changed,
            }),
            Err(e) => {
                error!(enabled, error = %e, "trigger synchronization failed during rebuild");
                Ok(Outcome::Partial {
                    message: format!(
                        "{message} Trigger synchronization failed and must be completed manually."
                    ),
                    error: format!("{e:#}"),
                })
            }
        }
    }

    async fn delete_instance(&self, instance: &str) -> Result<Removal, LifecycleError> {
        self.database
            .delete_instance(instance)
            .await
            .map_err(|e| LifecycleError::upstream(format!("deleting {instance}"), e))
    }

    async fn cluster_status(&self, cluster: &str) -> Result<Option<String>, LifecycleError> {
        self.database
            .cluster_status(cluster)
            .await
            .map_err(|e| LifecycleError::upstream(format!("describing {cluster}"), e))
    }

    async fn instance_status(&self, instance: &str) -> Result<Option<String>, LifecycleError> {
        self.database
            .instance(instance)
            .await
            .map(|state| state.map(|state| state.status))
            .map_err(|e| LifecycleError::upstream(format!("describing {instance}"), e))
    }

    async fn snapshot_status(&self, snapshot: &str) -> Result<Option<String>, LifecycleError> {
        self.database
            .snapshot_status(snapshot)
            .await
            .map_err(|e| LifecycleError::upstream(format!("describing {snapshot}"), e))
    }

    /// `Some` with the not-ready decision unless the cluster is available.
    async fn require_available(
        &self,
        cluster: &str,
    ) -> Result<Option<GateDecision>, LifecycleError> {
        let status = self.cluster_status(cluster).await?;
        Ok(not_ready_unless_available("cluster", cluster, status))
    }

    async fn require_instance_available(
        &self,
        instance: &str,
    ) -> Result<Option<GateDecision>, LifecycleError> {
        let status = self.instance_status(instance).await?;
        Ok(not_ready_unless_available("instance", instance, status))
    }

    async fn secret(&self, secret_id: &str) -> Result<DatabaseSecret, LifecycleError> {
        self.secrets
            .secret_json(secret_id)
            .await
            .and_then(DatabaseSecret::from_value)
            .map_err(|e| LifecycleError::upstream(format!("reading {secret_id}"), e))
    }

    /// The secret, rejected unless it names the key material and network
    /// placement a restore needs.
    async fn provisioning_secret(&self, secret_id: &str) -> Result<DatabaseSecret, LifecycleError> {
        let secret = self.secret(secret_id).await?;
        reject_missing(secret_id, secret.missing_provisioning_fields())?;
        Ok(secret)
    }

    /// The secret, rejected unless it can open a SQL connection.
    async fn connection_secret(&self, secret_id: &str) -> Result<DatabaseSecret, LifecycleError> {
        let secret = self.secret(secret_id).await?;
        reject_missing(secret_id, secret.missing_connection_fields())?;
        Ok(secret)
    }
}

fn not_ready_unless_available(
    noun: &str,
    identifier: &str,
    status: Option<String>,
) -> Option<GateDecision> {
    let decision = match status {
        None => GateDecision::not_ready(format!("{noun} {identifier} does not exist yet")),
        Some(status) if Availability::from_status(&status) == Availability::Available => {
            return None
        }
        Some(status) => GateDecision::not_ready(format!("{noun} {identifier} is {status}")),
    };
    info!(resource = %identifier, reason = %decision.reason, "not ready for rebuild step");
    Some(decision)
}

fn reject_missing(secret_id: &str, missing: Vec<&'static str>) -> Result<(), LifecycleError> {
    if missing.is_empty() {
        return Ok(());
    }
    Err(LifecycleError::Validation(format!(
        "secret {secret_id} is missing {}",
        missing.join(", ")
    )))
}

fn require_present(secret_id: &str, key: &'static str, value: &str) -> Result<(), LifecycleError> {
    if value.trim().is_empty() {
        reject_missing(secret_id, vec![key])
    } else {
        Ok(())
    }
}
