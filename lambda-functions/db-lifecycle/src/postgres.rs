//! SQL access to the tier databases: the batch job count read before a stop
//! and the login role passwords set after a rebuild.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::{Client, NoTls};
use tracing::{info, warn};

use crate::api::{JobTracker, RoleAdmin, RolePassword, SecretStore};
use crate::descriptor::Tier;
use crate::secret::DatabaseSecret;

pub const OUTSTANDING_JOBS_SQL: &str = "select count(1) from batch_job_execution \
     where status not in ('COMPLETED', 'FAILED') and start_time > $1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SUPERUSER: &str = "postgres";

/// Opens a connection as the superuser named in `secret`. Fails without
/// touching the network when a connection field is blank.
async fn connect(secret: &DatabaseSecret) -> Result<Client> {
    let missing = secret.missing_connection_fields();
    if !missing.is_empty() {
        bail!("secret is missing {}", missing.join(", "));
    }

    let mut config = tokio_postgres::Config::new();
    config
        .host(&secret.database_address)
        .dbname(&secret.database_name)
        .user(SUPERUSER)
        .password(&secret.postgres_password)
        .connect_timeout(CONNECT_TIMEOUT);

    let (client, connection) = config
        .connect(NoTls)
        .await
        .with_context(|| format!("connecting to {}", secret.database_address))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("postgres connection closed with error: {}", e);
        }
    });
    Ok(client)
}

/// `ALTER USER` takes no bind parameters, so the password is inlined as a
/// string literal.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn alter_password_sql(change: &RolePassword) -> String {
    format!(
        "alter user {} with password {}",
        quote_identifier(&change.role),
        quote_literal(&change.password)
    )
}

/// Counts running ETL batch jobs in the job-tracking tables of a tier's
/// observations database. Connects per query; nothing is pooled across
/// invocations.
pub struct PostgresJobTracker {
    secrets: Arc<dyn SecretStore>,
}

impl PostgresJobTracker {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl JobTracker for PostgresJobTracker {
    async fn count_outstanding_jobs(
        &self,
        tier: Tier,
        started_after: DateTime<Utc>,
    ) -> Result<u64> {
        let secret_id = tier.profile().observations_secret;
        let secret = self
            .secrets
            .secret_json(&secret_id)
            .await
            .and_then(DatabaseSecret::from_value)
            .with_context(|| format!("reading {secret_id}"))?;
        let client = connect(&secret)
            .await
            .with_context(|| format!("opening the job database named by {secret_id}"))?;

        let row = client
            .query_one(OUTSTANDING_JOBS_SQL, &[&started_after.naive_utc()])
            .await
            .context("querying batch_job_execution")?;
        let count: i64 = row.get(0);

        info!(count, tier = %tier, started_after = %started_after, "outstanding batch jobs");
        Ok(count.max(0) as u64)
    }
}

pub struct PostgresRoleAdmin;

#[async_trait]
impl RoleAdmin for PostgresRoleAdmin {
    async fn set_role_passwords(
        &self,
        connection: &DatabaseSecret,
        changes: &[RolePassword],
    ) -> Result<()> {
        let client = connect(connection).await?;
        for change in changes {
            client
                .batch_execute(&alter_password_sql(change))
                .await
                .with_context(|| format!("changing the password of {}", change.role))?;
            info!(
                role = %change.role,
                database = %connection.database_name,
                "role password changed"
            );
        }
        Ok(())
    }
}
