use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LifecycleError;

/// Deployment environment. Each tier owns its own databases, triggers and queues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Test,
    Qa,
    Prod,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Test, Tier::Qa, Tier::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "TEST",
            Self::Qa => "QA",
            Self::Prod => "PROD",
        }
    }

    pub fn profile(&self) -> TierProfile {
        match self {
            Self::Test => TierProfile::standard("TEST"),
            Self::Qa => TierProfile::standard("QA"),
            Self::Prod => TierProfile {
                capture_cluster: "nwcapture-prod-external".to_string(),
                capture_instance: "nwcapture-prod-external-instance1".to_string(),
                capture_database: "nwcapture-prod-external".to_string(),
                observations_instance: "observations-prod-external".to_string(),
                observations_snapshot: "observationSnapshotPROD-EXTERNALTemp".to_string(),
                triggers: vec![
                    "aqts-capture-trigger-PROD-EXTERNAL-aqtsCaptureTrigger".to_string()
                ],
                queues: vec!["aqts-capture-trigger-queue-PROD-EXTERNAL".to_string()],
                capture_secret: "NWCAPTURE-DB-PROD-EXTERNAL".to_string(),
                observations_secret: "WQP-EXTERNAL-PROD-EXTERNAL".to_string(),
            },
        }
    }
}

impl FromStr for Tier {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEST" => Ok(Self::Test),
            "QA" => Ok(Self::Qa),
            "PROD" | "PROD-EXTERNAL" => Ok(Self::Prod),
            _ => Err(LifecycleError::Validation(format!(
                "unrecognized environment tier: {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed naming table for a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierProfile {
    pub capture_cluster: String,
    pub capture_instance: String,
    /// Database name given to a restored capture cluster.
    pub capture_database: String,
    pub observations_instance: String,
    /// Re-encrypted copy an observations rebuild restores from.
    pub observations_snapshot: String,
    pub triggers: Vec<String>,
    pub queues: Vec<String>,
    pub capture_secret: String,
    pub observations_secret: String,
}

impl TierProfile {
    fn standard(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        let capture_cluster = format!("nwcapture-{lower}");
        Self {
            capture_instance: format!("{capture_cluster}-instance1"),
            capture_database: capture_cluster.clone(),
            capture_cluster,
            observations_instance: format!("observations-{lower}"),
            observations_snapshot: format!("observationSnapshot{label}Temp"),
            triggers: vec![format!("aqts-capture-trigger-{label}-aqtsCaptureTrigger")],
            queues: vec![
                format!("aqts-capture-trigger-queue-{label}"),
                format!("aqts-capture-error-queue-{label}"),
            ],
            capture_secret: format!("NWCAPTURE-DB-{label}"),
            observations_secret: format!("WQP-EXTERNAL-{label}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Aurora cluster that receives captured data.
    Primary,
    /// Standalone read/analytics instance loaded by the ETL pipeline.
    Secondary,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "db",
            Self::Secondary => "observations db",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "capture" => Ok(Self::Primary),
            "secondary" | "observations" => Ok(Self::Secondary),
            _ => Err(LifecycleError::Validation(format!(
                "unrecognized resource kind: {s:?}"
            ))),
        }
    }
}

/// Identifies one managed database. Built per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub tier: Tier,
    /// `None` for standalone instances that do not belong to a cluster.
    pub cluster_identifier: Option<String>,
    pub instance_identifier: String,
}

impl ResourceDescriptor {
    pub fn for_tier(kind: ResourceKind, tier: Tier) -> Self {
        let profile = tier.profile();
        match kind {
            ResourceKind::Primary => Self {
                kind,
                tier,
                cluster_identifier: Some(profile.capture_cluster),
                instance_identifier: profile.capture_instance,
            },
            ResourceKind::Secondary => Self {
                kind,
                tier,
                cluster_identifier: None,
                instance_identifier: profile.observations_instance,
            },
        }
    }

    /// The identifier start/stop calls are addressed to.
    pub fn target_identifier(&self) -> &str {
        self.cluster_identifier
            .as_deref()
            .unwrap_or(&self.instance_identifier)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.tier, self.kind.label())
    }
}
