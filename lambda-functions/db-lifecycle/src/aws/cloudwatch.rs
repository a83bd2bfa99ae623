use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_cloudwatch::{
    primitives::DateTime,
    types::{Dimension, Metric, MetricDataQuery, MetricStat, ScanBy},
    Client as CloudWatchClient,
};
use chrono::{Duration, Utc};

use crate::api::MetricsSource;

pub struct CloudWatchMetrics {
    client: CloudWatchClient,
}

impl CloudWatchMetrics {
    pub fn new(client: CloudWatchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsSource for CloudWatchMetrics {
    async fn cpu_utilization(
        &self,
        instance_identifier: &str,
        period_seconds: i32,
        window: Duration,
    ) -> Result<Vec<f64>> {
        let end = Utc::now();
        let start = end - window;

        let metric = Metric::builder()
            .namespace("AWS/RDS")
            .metric_name("CPUUtilization")
            .dimensions(
                Dimension::builder()
                    .name("DBInstanceIdentifier")
                    .value(instance_identifier)
                    .build(),
            )
            .build();

        let query = MetricDataQuery::builder()
            .id("cpuUtilization")
            .metric_stat(
                MetricStat::builder()
                    .metric(metric)
                    .period(period_seconds)
                    .stat("Average")
                    .build(),
            )
            .build();

        let response = self
            .client
            .get_metric_data()
            .metric_data_queries(query)
            .start_time(DateTime::from_secs(start.timestamp()))
            .end_time(DateTime::from_secs(end.timestamp()))
            .scan_by(ScanBy::TimestampAscending)
            .send()
            .await?;

        Ok(response
            .metric_data_results()
            .first()
            .map(|result| result.values().to_vec())
            .unwrap_or_default())
    }
}
