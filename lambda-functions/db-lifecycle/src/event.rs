//! Invocation payloads and responses at the Lambda boundary.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::controller::{ActionRequest, Outcome};
use crate::descriptor::{ResourceKind, Tier};
use crate::error::LifecycleError;
use crate::gate::{Action, GateDecision, Verdict, JOBS_RUNNING};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Invocation {
    Alarm(AlarmEvent),
    Resize(ResizeEvent),
    Action(ActionEvent),
}

/// CloudWatch alarm state-change event, as delivered by EventBridge.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AlarmEvent {
    pub detail: AlarmDetail,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AlarmDetail {
    pub state: AlarmState,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AlarmState {
    pub value: String, // "ALARM", "OK" or "INSUFFICIENT_DATA"
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ResizeEvent {
    pub resize_action: String, // "GROW" or "SHRINK"
    pub resource: Option<String>,
    pub tier: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub action: String,
    pub resource: Option<String>,
    pub tier: Option<String>,
}

impl Invocation {
    pub fn label(&self) -> String {
        match self {
            Self::Alarm(alarm) => format!("alarm:{}", alarm.detail.state.value),
            Self::Resize(resize) => resize.resize_action.to_ascii_lowercase(),
            Self::Action(event) => event.action.clone(),
        }
    }

    /// Turns the payload into a request against one database. A payload that
    /// names no action to take yields the decision explaining why.
    pub fn resolve(&self, default_stage: &str) -> Result<ActionRequest, GateDecision> {
        let (action, kind, resource, tier) = match self {
            Self::Alarm(alarm) => {
                let action = match alarm.detail.state.value.as_str() {
                    "ALARM" => Action::DisableTriggers,
                    "OK" => Action::EnableTriggers,
                    "INSUFFICIENT_DATA" => {
                        return Err(GateDecision::deny(
                            "alarm has insufficient data, leaving triggers alone",
                        ))
                    }
                    other => {
                        return Err(GateDecision::invalid(format!(
                            "unrecognized alarm state: {other:?}"
                        )))
                    }
                };
                (action, None, None, None)
            }
            Self::Resize(resize) => {
                let action = match resize.resize_action.to_ascii_uppercase().as_str() {
                    "GROW" => Action::Grow,
                    "SHRINK" => Action::Shrink,
                    other => {
                        return Err(GateDecision::invalid(format!(
                            "unrecognized resize action: {other:?}"
                        )))
                    }
                };
                (action, None, resize.resource.as_deref(), resize.tier.as_deref())
            }
            Self::Action(event) => {
                let (action, kind) = parse_action(&event.action).map_err(invalid)?;
                (action, kind, event.resource.as_deref(), event.tier.as_deref())
            }
        };

        let tier: Tier = tier.unwrap_or(default_stage).parse().map_err(invalid)?;
        let kind = match (kind, resource) {
            (Some(kind), _) => kind,
            (None, Some(raw)) => raw.parse().map_err(invalid)?,
            (None, None) => ResourceKind::Primary,
        };

        Ok(ActionRequest::for_tier(action, kind, tier))
    }
}

fn invalid(err: LifecycleError) -> GateDecision {
    GateDecision::invalid(err.to_string())
}

/// Accepts the plain action vocabulary plus the troubleshooting aliases that
/// also pin the resource kind.
pub fn parse_action(raw: &str) -> Result<(Action, Option<ResourceKind>), LifecycleError> {
    let parsed = match raw.trim().to_ascii_lowercase().as_str() {
        "start" => (Action::Start, None),
        "stop" => (Action::Stop, None),
        "grow" => (Action::Grow, None),
        "shrink" => (Action::Shrink, None),
        "enable_triggers" | "enable_trigger" => (Action::EnableTriggers, None),
        "disable_triggers" | "disable_trigger" => (Action::DisableTriggers, None),
        "start_capture_db" => (Action::Start, Some(ResourceKind::Primary)),
        "stop_capture_db" => (Action::Stop, Some(ResourceKind::Primary)),
        "start_observations_db" => (Action::Start, Some(ResourceKind::Secondary)),
        "stop_observations_db" => (Action::Stop, Some(ResourceKind::Secondary)),
        _ => {
            return Err(LifecycleError::Validation(format!(
                "unrecognized action: {raw:?}"
            )))
        }
    };
    Ok(parsed)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub status: String,
    pub message: String,
    pub action: String,
    pub timestamp: String,
}

impl Response {
    fn new(status_code: u16, status: &str, message: String, action: &str) -> Self {
        Self {
            status_code,
            status: status.to_string(),
            message,
            action: action.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Denied starts and stops answer in the fixed sentences callers match on.
    pub fn from_outcome(request: &ActionRequest, outcome: Outcome) -> Self {
        let action = request.action.as_str();
        let name = request.resource.display_name();
        if let Outcome::Denied(decision) = &outcome {
            let fixed = match (request.action, request.resource.kind) {
                _ if decision.verdict != Verdict::Denied => None,
                (Action::Start, ResourceKind::Primary) => {
                    Some(format!("Started the {name}: False"))
                }
                (Action::Stop, ResourceKind::Primary) => {
                    Some(format!("Stopped the {name}: False"))
                }
                (Action::Stop, ResourceKind::Secondary)
                    if decision.reason.ends_with(JOBS_RUNNING) =>
                {
                    Some(format!("Could not stop the {name}. It was busy."))
                }
                _ => None,
            };
            if let Some(message) = fixed {
                return Self::new(200, "denied", message, action);
            }
        }
        Self::describe(action, &name, outcome)
    }

    /// Response for `action` taken against the resource called `name`.
    pub fn describe(action: &str, name: &str, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed { message, .. } => Self::new(200, "success", message, action),
            Outcome::Denied(decision) => Self::new(
                200,
                "denied",
                format!("Did not {action} the {name}: {}", decision.reason),
                action,
            ),
            Outcome::NotReady(decision) => Self::new(
                503,
                "not_ready",
                format!("Cannot {action} the {name} yet: {}", decision.reason),
                action,
            ),
            Outcome::Partial { message, error } => {
                Self::new(207, "partial", format!("{message} ({error})"), action)
            }
        }
    }

    /// Response for a payload that never reached the controller.
    pub fn unresolved(label: &str, decision: GateDecision) -> Self {
        match decision.verdict {
            Verdict::Invalid => Self::new(400, "invalid", decision.reason, label),
            _ => Self::new(200, "denied", decision.reason, label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_event_resolves_against_default_stage() {
        let invocation: Invocation = serde_json::from_value(json!({"action": "start"})).unwrap();
        let request = invocation.resolve("QA").unwrap();
        assert_eq!(request.action, Action::Start);
        assert_eq!(request.resource.tier, Tier::Qa);
        assert_eq!(request.resource.kind, ResourceKind::Primary);
        assert_eq!(request.triggers, Tier::Qa.profile().triggers);
    }

    #[test]
    fn test_troubleshoot_alias_pins_resource() {
        let invocation: Invocation =
            serde_json::from_value(json!({"action": "stop_observations_db", "tier": "PROD"}))
                .unwrap();
        let request = invocation.resolve("TEST").unwrap();
        assert_eq!(request.action, Action::Stop);
        assert_eq!(request.resource.kind, ResourceKind::Secondary);
        assert_eq!(request.resource.instance_identifier, "observations-prod-external");
    }

    #[test]
    fn test_alarm_mapping() {
        let alarm: Invocation =
            serde_json::from_value(json!({"detail": {"state": {"value": "ALARM"}}})).unwrap();
        assert_eq!(alarm.resolve("TEST").unwrap().action, Action::DisableTriggers);

        let ok: Invocation =
            serde_json::from_value(json!({"detail": {"state": {"value": "OK"}}})).unwrap();
        assert_eq!(ok.resolve("TEST").unwrap().action, Action::EnableTriggers);

        let unknown: Invocation = serde_json::from_value(
            json!({"detail": {"state": {"value": "INSUFFICIENT_DATA"}}}),
        )
        .unwrap();
        let decision = unknown.resolve("TEST").unwrap_err();
        assert!(!decision.allowed());
    }

    #[test]
    fn test_resize_event() {
        let invocation: Invocation =
            serde_json::from_value(json!({"resize_action": "SHRINK"})).unwrap();
        assert_eq!(invocation.resolve("TEST").unwrap().action, Action::Shrink);
    }

    #[test]
    fn test_unknown_tier_is_invalid() {
        let invocation: Invocation = serde_json::from_value(json!({"action": "grow"})).unwrap();
        let decision = invocation.resolve("UNKNOWN").unwrap_err();
        assert_eq!(decision.verdict, Verdict::Invalid);
        assert!(decision.reason.contains("tier"));

        let response = Response::unresolved(&invocation.label(), decision);
        assert_eq!(response.status_code, 400);
        assert_eq!(response.status, "invalid");
    }

    #[test]
    fn test_denied_start_and_stop_use_fixed_sentences() {
        let stop = ActionRequest::for_tier(Action::Stop, ResourceKind::Primary, Tier::Test);
        let response = Response::from_outcome(
            &stop,
            Outcome::Denied(GateDecision::deny("database is already stopped")),
        );
        assert_eq!(response.status_code, 200);
        assert_eq!(response.status, "denied");
        assert_eq!(response.message, "Stopped the TEST db: False");

        let start = ActionRequest::for_tier(Action::Start, ResourceKind::Primary, Tier::Qa);
        let response = Response::from_outcome(
            &start,
            Outcome::Denied(GateDecision::deny("database is already available")),
        );
        assert_eq!(response.message, "Started the QA db: False");
    }

    #[test]
    fn test_busy_observations_db_stop_message() {
        let stop = ActionRequest::for_tier(Action::Stop, ResourceKind::Secondary, Tier::Test);
        let busy = GateDecision::deny(format!("2 batch job(s) {JOBS_RUNNING}"));
        let response = Response::from_outcome(&stop, Outcome::Denied(busy));
        assert_eq!(response.message, "Could not stop the TEST observations db. It was busy.");

        let stopped = GateDecision::deny("database is already stopped");
        let response = Response::from_outcome(&stop, Outcome::Denied(stopped));
        assert!(response.message.starts_with("Did not stop the TEST observations db"));
    }
}
