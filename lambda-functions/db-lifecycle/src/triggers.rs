use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::TriggerRegistry;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriggerState {
    Creating,
    Enabling,
    Enabled,
    Disabling,
    Disabled,
    Updating,
    Deleting,
    Other(String),
}

impl TriggerState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Creating" => Self::Creating,
            "Enabling" => Self::Enabling,
            "Enabled" => Self::Enabled,
            "Disabling" => Self::Disabling,
            "Disabled" => Self::Disabled,
            "Updating" => Self::Updating,
            "Deleting" => Self::Deleting,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether a mapping in this state has to be flipped to reach `desired_enabled`.
    pub fn needs_flip(&self, desired_enabled: bool) -> bool {
        if desired_enabled {
            matches!(
                self,
                Self::Disabled | Self::Disabling | Self::Updating | Self::Creating
            )
        } else {
            matches!(
                self,
                Self::Enabled | Self::Enabling | Self::Updating | Self::Creating
            )
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "{raw}"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// One queue/stream-to-function binding, as last listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBinding {
    pub uuid: String,
    pub function_name: String,
    pub state: TriggerState,
}

/// Flips event-source mappings until they agree with a desired state.
/// Holds no bindings between calls.
#[derive(Clone)]
pub struct TriggerSynchronizer {
    registry: Arc<dyn TriggerRegistry>,
}

impl TriggerSynchronizer {
    pub fn new(registry: Arc<dyn TriggerRegistry>) -> Self {
        Self { registry }
    }

    /// Returns whether at least one mapping was changed.
    pub async fn synchronize(
        &self,
        function_names: &[String],
        desired_enabled: bool,
    ) -> Result<bool> {
        let mut changed = false;

        for function_name in function_names {
            let bindings = self
                .registry
                .list_mappings(function_name)
                .await
                .with_context(|| format!("listing event source mappings for {function_name}"))?;

            if bindings.is_empty() {
                warn!(function = %function_name, "no event source mappings found");
            }

            for binding in bindings {
                if !binding.state.needs_flip(desired_enabled) {
                    info!(
                        function = %function_name,
                        uuid = %binding.uuid,
                        state = %binding.state,
                        "mapping already settled"
                    );
                    continue;
                }

                self.registry
                    .set_enabled(&binding.uuid, desired_enabled)
                    .await
                    .with_context(|| format!("updating event source mapping {}", binding.uuid))?;
                changed = true;

                let confirmed = self
                    .registry
                    .mapping_state(&binding.uuid)
                    .await
                    .with_context(|| format!("re-reading event source mapping {}", binding.uuid))?;
                info!(
                    function = %function_name,
                    uuid = %binding.uuid,
                    from = %binding.state,
                    to = %confirmed,
                    enabled = desired_enabled,
                    "flipped event source mapping"
                );
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockTriggerRegistry;
    use std::sync::Mutex;

    fn triggers() -> Vec<String> {
        vec!["aqts-capture-trigger-TEST-aqtsCaptureTrigger".to_string()]
    }

    #[test]
    fn test_flip_rules() {
        assert!(TriggerState::Disabled.needs_flip(true));
        assert!(TriggerState::Disabling.needs_flip(true));
        assert!(!TriggerState::Enabled.needs_flip(true));
        assert!(!TriggerState::Enabling.needs_flip(true));

        assert!(TriggerState::Enabled.needs_flip(false));
        assert!(!TriggerState::Disabled.needs_flip(false));

        assert!(TriggerState::Updating.needs_flip(true));
        assert!(TriggerState::Creating.needs_flip(false));
        assert!(!TriggerState::Deleting.needs_flip(true));
        assert!(!TriggerState::parse("Weird").needs_flip(false));
    }

    #[tokio::test]
    async fn test_enable_flips_disabled_mapping() {
        let mut registry = MockTriggerRegistry::new();
        registry
            .expect_list_mappings()
            .withf(|name| name == "aqts-capture-trigger-TEST-aqtsCaptureTrigger")
            .returning(|name| {
                Ok(vec![TriggerBinding {
                    uuid: "uuid-1".to_string(),
                    function_name: name.to_string(),
                    state: TriggerState::Disabled,
                }])
            });
        registry
            .expect_set_enabled()
            .withf(|uuid, enabled| uuid == "uuid-1" && *enabled)
            .times(1)
            .returning(|_, _| Ok(()));
        registry
            .expect_mapping_state()
            .returning(|_| Ok(TriggerState::Enabling));

        let changed = TriggerSynchronizer::new(Arc::new(registry))
            .synchronize(&triggers(), true)
            .await
            .unwrap();
        assert!(changed);
    }

    #[tokio::test]
    async fn test_second_synchronize_is_a_no_op() {
        let state = Arc::new(Mutex::new(TriggerState::Disabled));

        let mut registry = MockTriggerRegistry::new();
        let listed = state.clone();
        registry.expect_list_mappings().returning(move |name| {
            Ok(vec![TriggerBinding {
                uuid: "uuid-1".to_string(),
                function_name: name.to_string(),
                state: listed.lock().unwrap().clone(),
            }])
        });
        let flipped = state.clone();
        registry
            .expect_set_enabled()
            .times(1)
            .returning(move |_, enabled| {
                *flipped.lock().unwrap() = if enabled {
                    TriggerState::Enabled
                } else {
                    TriggerState::Disabled
                };
                Ok(())
            });
        let confirmed = state.clone();
        registry
            .expect_mapping_state()
            .returning(move |_| Ok(confirmed.lock().unwrap().clone()));

        let synchronizer = TriggerSynchronizer::new(Arc::new(registry));
        assert!(synchronizer.synchronize(&triggers(), true).await.unwrap());
        assert!(!synchronizer.synchronize(&triggers(), true).await.unwrap());
    }

    #[tokio::test]
    async fn test_already_disabled_reports_no_change() {
        let mut registry = MockTriggerRegistry::new();
        registry.expect_list_mappings().returning(|name| {
            Ok(vec![TriggerBinding {
                uuid: "uuid-1".to_string(),
                function_name: name.to_string(),
                state: TriggerState::Disabled,
            }])
        });
        registry.expect_set_enabled().never();

        let changed = TriggerSynchronizer::new(Arc::new(registry))
            .synchronize(&triggers(), false)
            .await
            .unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_update_failure_propagates_with_context() {
        let mut registry = MockTriggerRegistry::new();
        registry.expect_list_mappings().returning(|name| {
            Ok(vec![TriggerBinding {
                uuid: "uuid-9".to_string(),
                function_name: name.to_string(),
                state: TriggerState::Enabled,
            }])
        });
        registry
            .expect_set_enabled()
            .returning(|_, _| Err(anyhow::anyhow!("ResourceInUseException")));

        let err = TriggerSynchronizer::new(Arc::new(registry))
            .synchronize(&triggers(), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("uuid-9"));
    }
}
