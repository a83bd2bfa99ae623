//! Allow/deny policy evaluated before any mutating call.
//!
//! Everything here is pure: the same probe and policy always yield the same
//! decision, so the rules can be exercised against synthetic probe results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LifecycleConfig;
use crate::probe::{Availability, ProbeResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    Stop,
    Grow,
    Shrink,
    EnableTriggers,
    DisableTriggers,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Grow => "grow",
            Self::Shrink => "shrink",
            Self::EnableTriggers => "enable_triggers",
            Self::DisableTriggers => "disable_triggers",
        }
    }

    /// Trigger state that must hold once the action has been carried out.
    pub fn triggers_enabled_after(&self) -> bool {
        matches!(self, Self::Start | Self::EnableTriggers)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    /// Policy said no. Expected and frequent.
    Denied,
    /// The resource is mid-transition; the scheduler should re-invoke later.
    NotReady,
    /// The request itself is malformed. Must not be retried.
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateDecision {
    pub verdict: Verdict,
    /// Always non-empty unless the verdict is `Allowed`.
    pub reason: String,
}

impl GateDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self::new(Verdict::Allowed, reason.into())
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self::new(Verdict::Denied, reason.into())
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::new(Verdict::NotReady, reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(Verdict::Invalid, reason.into())
    }

    fn new(verdict: Verdict, mut reason: String) -> Self {
        if verdict != Verdict::Allowed && reason.trim().is_empty() {
            reason = format!("{verdict:?} without a stated reason").to_lowercase();
        }
        Self { verdict, reason }
    }

    pub fn allowed(&self) -> bool {
        self.verdict == Verdict::Allowed
    }
}

/// Size classes and CPU thresholds the resize rules compare against.
#[derive(Debug, Clone, PartialEq)]
pub struct GatePolicy {
    pub small_instance_class: String,
    pub big_instance_class: String,
    pub grow_threshold: f64,
    pub shrink_threshold: f64,
}

impl From<&LifecycleConfig> for GatePolicy {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            small_instance_class: config.small_instance_class.clone(),
            big_instance_class: config.big_instance_class.clone(),
            grow_threshold: config.grow_threshold,
            shrink_threshold: config.shrink_threshold,
        }
    }
}

/// Closes the reason of a stop denied because batch jobs are running.
pub const JOBS_RUNNING: &str = "are still running";

pub fn evaluate(action: Action, probe: &ProbeResult, policy: &GatePolicy) -> GateDecision {
    match action {
        Action::Start => evaluate_start(probe),
        Action::Stop => evaluate_stop(probe),
        Action::Grow => evaluate_grow(probe, policy),
        Action::Shrink => evaluate_shrink(probe, policy),
        Action::EnableTriggers => match probe.availability {
            Availability::Available => GateDecision::allow(""),
            _ => GateDecision::not_ready(format!(
                "database is {}, triggers stay disabled until it is available",
                probe.status
            )),
        },
        Action::DisableTriggers => GateDecision::allow(""),
    }
}

fn evaluate_start(probe: &ProbeResult) -> GateDecision {
    match probe.availability {
        Availability::Available => GateDecision::deny("database is already available"),
        Availability::Transitioning => {
            GateDecision::not_ready(format!("database is {}", probe.status))
        }
        Availability::Stopped | Availability::Unknown => GateDecision::allow(""),
    }
}

fn evaluate_stop(probe: &ProbeResult) -> GateDecision {
    match probe.availability {
        Availability::Available if probe.outstanding_job_count > 0 => GateDecision::deny(format!(
            "{} batch job(s) {JOBS_RUNNING}",
            probe.outstanding_job_count
        )),
        Availability::Available => GateDecision::allow(""),
        Availability::Stopped => GateDecision::deny("database is already stopped"),
        Availability::Transitioning => {
            GateDecision::not_ready(format!("database is {}", probe.status))
        }
        Availability::Unknown => GateDecision::deny(format!(
            "database is {} and cannot be stopped",
            probe.status
        )),
    }
}

fn evaluate_grow(probe: &ProbeResult, policy: &GatePolicy) -> GateDecision {
    if probe.instance_size_class == policy.big_instance_class {
        return GateDecision::deny(format!(
            "database is already at max size {}",
            policy.big_instance_class
        ));
    }
    if probe.availability != Availability::Available {
        return GateDecision::not_ready(format!("cluster is not available ({})", probe.status));
    }

    let samples = &probe.cpu_utilization_samples;
    if samples.is_empty() {
        return GateDecision::deny("no CPU utilization samples in the evaluation window");
    }
    // A single transient spike must not trigger a resize: every sample has to clear.
    if samples.iter().all(|value| *value >= policy.grow_threshold) {
        GateDecision::allow(format!(
            "all {} samples at or above {}%",
            samples.len(),
            policy.grow_threshold
        ))
    } else {
        GateDecision::deny(format!(
            "CPU utilization did not stay at or above {}%: {samples:?}",
            policy.grow_threshold
        ))
    }
}

fn evaluate_shrink(probe: &ProbeResult, policy: &GatePolicy) -> GateDecision {
    if probe.instance_size_class == policy.small_instance_class {
        return GateDecision::deny(format!(
            "database is already shrunk to {}",
            policy.small_instance_class
        ));
    }
    if probe.availability != Availability::Available {
        return GateDecision::not_ready(format!("cluster is not available ({})", probe.status));
    }

    let samples = &probe.cpu_utilization_samples;
    if samples.is_empty() {
        return GateDecision::deny("no CPU utilization samples in the evaluation window");
    }
    if samples.iter().all(|value| *value <= policy.shrink_threshold) {
        GateDecision::allow(format!(
            "all {} samples at or below {}%",
            samples.len(),
            policy.shrink_threshold
        ))
    } else {
        GateDecision::deny(format!(
            "CPU utilization did not stay at or below {}%: {samples:?}",
            policy.shrink_threshold
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GatePolicy {
        GatePolicy::from(&LifecycleConfig::default())
    }

    fn available(class: &str, samples: Vec<f64>) -> ProbeResult {
        ProbeResult::builder()
            .availability(Availability::Available)
            .status("available")
            .instance_size_class(class)
            .cpu_utilization_samples(samples)
            .build()
    }

    #[test]
    fn test_grow_requires_every_sample_over_threshold() {
        let policy = policy();
        let steady = available("db.r5.2xlarge", vec![70.0, 85.0, 99.0]);
        assert!(evaluate(Action::Grow, &steady, &policy).allowed());

        let spike = evaluate(
            Action::Grow,
            &available("db.r5.2xlarge", vec![10.0, 95.0, 12.0]),
            &policy,
        );
        assert_eq!(spike.verdict, Verdict::Denied);
        assert!(spike.reason.contains("70"));

        let just_under = evaluate(
            Action::Grow,
            &available("db.r5.2xlarge", vec![69.99, 90.0]),
            &policy,
        );
        assert_eq!(just_under.verdict, Verdict::Denied);
    }

    #[test]
    fn test_grow_denied_at_max_size_regardless_of_cpu() {
        let decision = evaluate(
            Action::Grow,
            &available("db.r5.8xlarge", vec![100.0, 100.0]),
            &policy(),
        );
        assert_eq!(decision.verdict, Verdict::Denied);
        assert!(decision.reason.contains("already at max size"));
    }

    #[test]
    fn test_shrink_requires_every_sample_under_threshold() {
        let policy = policy();
        let quiet = available("db.r5.8xlarge", vec![1.0, 25.0, 3.0]);
        assert!(evaluate(Action::Shrink, &quiet, &policy).allowed());
        assert_eq!(
            evaluate(Action::Shrink, &available("db.r5.8xlarge", vec![1.0, 25.5]), &policy).verdict,
            Verdict::Denied
        );
        assert_eq!(
            evaluate(Action::Shrink, &available("db.r5.2xlarge", vec![0.0]), &policy).verdict,
            Verdict::Denied
        );
    }

    #[test]
    fn test_resize_without_samples_is_denied() {
        let decision = evaluate(Action::Grow, &available("db.r5.2xlarge", vec![]), &policy());
        assert_eq!(decision.verdict, Verdict::Denied);
        assert!(!decision.reason.is_empty());
    }

    #[test]
    fn test_resize_waits_for_availability() {
        let probe = ProbeResult::builder()
            .availability(Availability::Transitioning)
            .status("modifying")
            .instance_size_class("db.r5.2xlarge")
            .cpu_utilization_samples(vec![99.0])
            .build();
        let decision = evaluate(Action::Grow, &probe, &policy());
        assert_eq!(decision.verdict, Verdict::NotReady);
        assert!(decision.reason.contains("modifying"));
    }

    #[test]
    fn test_stop_blocked_by_outstanding_jobs() {
        let busy = ProbeResult::builder()
            .availability(Availability::Available)
            .status("available")
            .outstanding_job_count(4)
            .build();
        let decision = evaluate(Action::Stop, &busy, &policy());
        assert_eq!(decision.verdict, Verdict::Denied);
        assert!(decision.reason.contains("4 batch job"));

        let quiet = ProbeResult::builder()
            .availability(Availability::Available)
            .status("available")
            .build();
        assert!(evaluate(Action::Stop, &quiet, &policy()).allowed());
    }

    #[test]
    fn test_start_and_stop_states() {
        let policy = policy();
        let stopped = ProbeResult::builder()
            .availability(Availability::Stopped)
            .status("stopped")
            .build();
        assert!(evaluate(Action::Start, &stopped, &policy).allowed());
        assert_eq!(evaluate(Action::Stop, &stopped, &policy).verdict, Verdict::Denied);

        let starting = ProbeResult::builder()
            .availability(Availability::Transitioning)
            .status("starting")
            .build();
        assert_eq!(evaluate(Action::Start, &starting, &policy).verdict, Verdict::NotReady);
        assert_eq!(evaluate(Action::Stop, &starting, &policy).verdict, Verdict::NotReady);
    }

    #[test]
    fn test_enable_triggers_only_when_available() {
        let policy = policy();
        let starting = ProbeResult::builder()
            .availability(Availability::Transitioning)
            .status("starting")
            .build();
        assert_eq!(
            evaluate(Action::EnableTriggers, &starting, &policy).verdict,
            Verdict::NotReady
        );
        assert!(evaluate(Action::DisableTriggers, &starting, &policy).allowed());
    }

    #[test]
    fn test_denials_always_carry_a_reason() {
        assert!(!GateDecision::deny("").reason.is_empty());
        assert!(!GateDecision::invalid("  ").reason.is_empty());
        assert_eq!(GateDecision::allow("").reason, "");
    }
}
