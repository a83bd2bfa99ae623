//! AWS-backed implementations of the collaborator traits.

mod cloudwatch;
mod lambda;
mod rds;
mod secrets;
mod sqs;

pub use cloudwatch::CloudWatchMetrics;
pub use lambda::LambdaTriggerRegistry;
pub use rds::RdsDatabaseApi;
pub use secrets::SecretsManagerStore;
pub use sqs::SqsQueues;

use aws_config::{BehaviorVersion, Region, SdkConfig};

pub async fn load_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}
