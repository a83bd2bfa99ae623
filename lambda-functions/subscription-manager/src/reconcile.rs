use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

pub const EMAIL_PROTOCOL: &str = "email";

/// Identity of a subscription as reported by the topic. Only confirmed
/// subscriptions carry an ARN that can be unsubscribed; the service reports
/// `PendingConfirmation` (or `Deleted`) in its place otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionToken {
    Confirmed(String),
    Unconfirmed(String),
}

impl SubscriptionToken {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("arn:") {
            Self::Confirmed(raw.to_string())
        } else {
            Self::Unconfirmed(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub protocol: String,
    pub endpoint: String,
    pub token: SubscriptionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionAction {
    Subscribe { endpoint: String },
    Unsubscribe { endpoint: String, subscription_arn: String },
}

fn normalize(endpoint: &str) -> String {
    endpoint.trim().to_ascii_lowercase()
}

/// Actions that converge `current` on `desired`. Endpoints compare after
/// trimming, ignoring ASCII case. Unconfirmed subscriptions count as present
/// but are never unsubscribed.
pub fn plan(desired: &[String], current: &[Subscription]) -> Vec<SubscriptionAction> {
    let mut wanted = BTreeSet::new();
    let mut to_subscribe = Vec::new();
    for endpoint in desired {
        let trimmed = endpoint.trim();
        if !trimmed.is_empty() && wanted.insert(normalize(trimmed)) {
            to_subscribe.push(trimmed.to_string());
        }
    }

    let emails: Vec<&Subscription> = current
        .iter()
        .filter(|s| s.protocol.eq_ignore_ascii_case(EMAIL_PROTOCOL))
        .collect();
    let present: BTreeSet<String> = emails.iter().map(|s| normalize(&s.endpoint)).collect();

    let mut actions: Vec<SubscriptionAction> = to_subscribe
        .into_iter()
        .filter(|endpoint| !present.contains(&normalize(endpoint)))
        .map(|endpoint| SubscriptionAction::Subscribe { endpoint })
        .collect();

    for subscription in emails {
        if wanted.contains(&normalize(&subscription.endpoint)) {
            continue;
        }
        match &subscription.token {
            SubscriptionToken::Confirmed(arn) => actions.push(SubscriptionAction::Unsubscribe {
                endpoint: subscription.endpoint.clone(),
                subscription_arn: arn.clone(),
            }),
            SubscriptionToken::Unconfirmed(token) => {
                info!(
                    endpoint = %subscription.endpoint,
                    token = %token,
                    "leaving unconfirmed subscription alone"
                );
            }
        }
    }

    actions
}

/// Email subscriptions on a notification topic.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Every subscription on the topic, all pages.
    async fn list_subscriptions(&self, topic_arn: &str) -> Result<Vec<Subscription>>;

    async fn subscribe(&self, topic_arn: &str, endpoint: &str) -> Result<()>;

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<()>;
}

pub struct Reconciler {
    registry: Arc<dyn SubscriptionRegistry>,
}

impl Reconciler {
    pub fn new(registry: Arc<dyn SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Reads the topic, applies [`plan`], and returns the actions taken.
    /// Stops at the first failed call; actions already issued stay issued.
    pub async fn reconcile(
        &self,
        topic_arn: &str,
        desired: &[String],
    ) -> Result<Vec<SubscriptionAction>> {
        let current = self
            .registry
            .list_subscriptions(topic_arn)
            .await
            .with_context(|| format!("listing subscriptions for {topic_arn}"))?;

        let actions = plan(desired, &current);
        if actions.is_empty() {
            info!(topic = %topic_arn, subscriptions = current.len(), "subscriptions already match");
            return Ok(actions);
        }

        for action in &actions {
            match action {
                SubscriptionAction::Subscribe { endpoint } => {
                    self.registry
                        .subscribe(topic_arn, endpoint)
                        .await
                        .with_context(|| format!("subscribing {endpoint} to {topic_arn}"))?;
                    info!(topic = %topic_arn, endpoint = %endpoint, "subscribed");
                }
                SubscriptionAction::Unsubscribe {
                    endpoint,
                    subscription_arn,
                } => {
                    self.registry
                        .unsubscribe(subscription_arn)
                        .await
                        .with_context(|| format!("unsubscribing {endpoint} from {topic_arn}"))?;
                    warn!(topic = %topic_arn, endpoint = %endpoint, "unsubscribed");
                }
            }
        }

        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn email(endpoint: &str, token: &str) -> Subscription {
        Subscription {
            protocol: "email".to_string(),
            endpoint: endpoint.to_string(),
            token: SubscriptionToken::parse(token),
        }
    }

    fn desired(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_token_parsing() {
        assert!(matches!(
            SubscriptionToken::parse("arn:aws:sns:us-west-2:1:topic:abc"),
            SubscriptionToken::Confirmed(_)
        ));
        assert!(matches!(
            SubscriptionToken::parse("PendingConfirmation"),
            SubscriptionToken::Unconfirmed(_)
        ));
        assert!(matches!(
            SubscriptionToken::parse("Deleted"),
            SubscriptionToken::Unconfirmed(_)
        ));
    }

    #[test]
    fn test_unsubscribes_only_confirmed_strays() {
        let current = vec![
            email("a@x.com", "arn:aws:sns:us-west-2:1:t:a"),
            email("b@x.com", "arn:aws:sns:us-west-2:1:t:b"),
            email("c@x.com", "PendingConfirmation"),
        ];

        let actions = plan(&desired(&["a@x.com"]), &current);
        assert_eq!(
            actions,
            vec![SubscriptionAction::Unsubscribe {
                endpoint: "b@x.com".to_string(),
                subscription_arn: "arn:aws:sns:us-west-2:1:t:b".to_string(),
            }]
        );
    }

    #[test]
    fn test_matching_is_exact_after_trim_and_case_fold() {
        let current = vec![email("Alice@Example.com", "arn:aws:sns:us-west-2:1:t:a")];

        assert!(plan(&desired(&["  alice@example.com "]), &current).is_empty());

        // No substring matching: a longer address is a different endpoint.
        let actions = plan(&desired(&["ice@example.com"]), &current);
        assert_eq!(actions.len(), 2);
        assert!(actions.contains(&SubscriptionAction::Subscribe {
            endpoint: "ice@example.com".to_string()
        }));
    }

    #[test]
    fn test_pending_desired_address_is_not_resubscribed() {
        let current = vec![email("new@x.com", "PendingConfirmation")];
        assert!(plan(&desired(&["new@x.com"]), &current).is_empty());
    }

    #[test]
    fn test_blank_and_duplicate_entries_collapse() {
        let actions = plan(&desired(&["", "  ", "d@x.com", "D@x.com "]), &[]);
        assert_eq!(
            actions,
            vec![SubscriptionAction::Subscribe {
                endpoint: "d@x.com".to_string()
            }]
        );
    }

    #[test]
    fn test_non_email_subscriptions_are_ignored() {
        let current = vec![Subscription {
            protocol: "sqs".to_string(),
            endpoint: "arn:aws:sqs:us-west-2:1:queue".to_string(),
            token: SubscriptionToken::parse("arn:aws:sns:us-west-2:1:t:q"),
        }];
        assert!(plan(&[], &current).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_twice_is_a_no_op() {
        let state = Arc::new(Mutex::new(vec![
            email("keep@x.com", "arn:aws:sns:us-west-2:1:t:keep"),
            email("drop@x.com", "arn:aws:sns:us-west-2:1:t:drop"),
        ]));

        let mut registry = MockSubscriptionRegistry::new();
        let listed = state.clone();
        registry
            .expect_list_subscriptions()
            .times(2)
            .returning(move |_| Ok(listed.lock().unwrap().clone()));
        let subscribed = state.clone();
        registry
            .expect_subscribe()
            .withf(|topic, endpoint| topic == "arn:topic" && endpoint == "add@x.com")
            .times(1)
            .returning(move |_, endpoint| {
                subscribed
                    .lock()
                    .unwrap()
                    .push(email(endpoint, "PendingConfirmation"));
                Ok(())
            });
        let unsubscribed = state.clone();
        registry
            .expect_unsubscribe()
            .withf(|arn| arn == "arn:aws:sns:us-west-2:1:t:drop")
            .times(1)
            .returning(move |arn| {
                unsubscribed
                    .lock()
                    .unwrap()
                    .retain(|s| s.token != SubscriptionToken::Confirmed(arn.to_string()));
                Ok(())
            });

        let reconciler = Reconciler::new(Arc::new(registry));
        let wanted = desired(&["keep@x.com", "add@x.com"]);
        assert_eq!(reconciler.reconcile("arn:topic", &wanted).await.unwrap().len(), 2);
        assert!(reconciler.reconcile("arn:topic", &wanted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_carries_topic() {
        let mut registry = MockSubscriptionRegistry::new();
        registry
            .expect_list_subscriptions()
            .returning(|_| Err(anyhow::anyhow!("AuthorizationError")));
        registry.expect_subscribe().never();

        let err = Reconciler::new(Arc::new(registry))
            .reconcile("arn:topic", &desired(&["a@x.com"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("arn:topic"));
    }
}
