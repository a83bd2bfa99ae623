use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Connection and provisioning parameters stored alongside a database.
/// Values are passed through to the control plane without interpretation.
#[derive(Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct DatabaseSecret {
    pub database_address: String,
    pub database_name: String,
    pub postgres_password: String,
    pub kms_key_id: String,
    pub db_subgroup_name: String,
    pub vpc_security_group_id: String,

    // Login role passwords, only present where the roles exist.
    pub schema_owner_password: String,
    pub db_owner_password: String,
    pub wqp_read_only_password: String,
    pub ars_schema_owner_password: String,
    pub nwis_schema_owner_password: String,
    pub epa_schema_owner_password: String,
    pub wdfn_db_read_only_password: String,
}

impl DatabaseSecret {
    /// Only a JSON object is accepted. Serde would otherwise fill the struct
    /// positionally from an array.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            bail!("secret is not a JSON object");
        }
        serde_json::from_value(value).context("secret does not have the expected shape")
    }

    /// Names of the provisioning fields that are missing or blank.
    pub fn missing_provisioning_fields(&self) -> Vec<&'static str> {
        blank_fields([
            ("KMS_KEY_ID", &self.kms_key_id),
            ("DB_SUBGROUP_NAME", &self.db_subgroup_name),
            ("VPC_SECURITY_GROUP_ID", &self.vpc_security_group_id),
        ])
    }

    /// Names of the fields a SQL connection needs that are missing or blank.
    pub fn missing_connection_fields(&self) -> Vec<&'static str> {
        blank_fields([
            ("DATABASE_ADDRESS", &self.database_address),
            ("DATABASE_NAME", &self.database_name),
            ("POSTGRES_PASSWORD", &self.postgres_password),
        ])
    }
}

fn blank_fields<const N: usize>(fields: [(&'static str, &String); N]) -> Vec<&'static str> {
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
}
