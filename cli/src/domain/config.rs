//! Stack configuration schema, defaults and validators.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "stage",
    "network.max_azs",
    "database.deletion_protection",
    "database.allocated_storage_gb",
    "database.engine_version",
    "database.instance_size",
    "environment.solution_stack",
];
pub const VALID_STAGES: &[&str] = &["development", "production"];
pub const VALID_BOOLEANS: &[&str] = &["true", "false"];
pub const VALID_INSTANCE_SIZES: &[&str] = &[
    "micro", "small", "medium", "large", "xlarge", "2xlarge", "4xlarge",
];

/// Upper bound on AZs a single region offers.
pub const MAX_AZS: u8 = 6;
pub const MIN_STORAGE_GB: u32 = 20;
pub const MAX_STORAGE_GB: u32 = 65_536;

/// RDS instance identifiers: letter first, then letters, digits or hyphens,
/// at most 63 characters.
static DB_IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{0,62}$").expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level stack configuration stored in `threetier.yaml`.
///
/// Every section is defaulted, so an empty file declares the reference
/// topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StackConfig {
    pub stack_name: StackName,
    pub stage: Stage,
    pub application: ApplicationConfig,
    pub network: NetworkConfig,
    pub secret: SecretConfig,
    pub database: DatabaseConfig,
    pub role: RoleConfig,
    pub environment: EnvironmentConfig,
}

/// Stack (deployment unit) name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(pub String);

impl Default for StackName {
    fn default() -> Self {
        Self("ThreeTierAppStack".to_string())
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deployment stage. Production requires deletion protection on the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Development,
    Production,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Application-wide grouping and tagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub tag_key: String,
    pub tag_value: String,
    pub resource_group_name: String,
    /// Explicit Elastic Beanstalk application name; engine-generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            tag_key: "Application".to_string(),
            tag_value: "ThreeTierApp".to_string(),
            resource_group_name: "ThreeTierAppResources".to_string(),
            application_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub max_azs: u8,
    pub cidr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "ThreeTierAppVpc".to_string(),
            max_azs: 2,
            cidr: "10.0.0.0/16".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    pub name: String,
    pub username: String,
    pub generate_string_key: String,
    pub exclude_punctuation: bool,
    pub include_space: bool,
    pub password_length: u32,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            name: "PostgreSQLCreds".to_string(),
            username: "postgreAdmin".to_string(),
            generate_string_key: "password".to_string(),
            exclude_punctuation: true,
            include_space: false,
            password_length: 32,
        }
    }
}

/// Relational engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Postgres,
    Mysql,
    Mariadb,
}

impl EngineKind {
    /// Engine name as the RDS API spells it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
        }
    }

    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mysql | Self::Mariadb => 3306,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub engine: EngineKind,
    pub engine_version: String,
    pub instance_class: String,
    pub instance_size: String,
    pub allocated_storage_gb: u32,
    pub identifier: String,
    pub deletion_protection: bool,
    /// Listener port; the engine's default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Postgres,
            engine_version: "12".to_string(),
            instance_class: "t3".to_string(),
            instance_size: "micro".to_string(),
            allocated_storage_gb: 20,
            identifier: "three-tier-db".to_string(),
            deletion_protection: false,
            port: None,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub trusted_service: String,
    pub managed_policies: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            trusted_service: "elasticbeanstalk.amazonaws.com".to_string(),
            managed_policies: vec![
                "AWSElasticBeanstalkWebTier".to_string(),
                "AWSElasticBeanstalkWorkerTier".to_string(),
                "AWSElasticBeanstalkMulticontainerDocker".to_string(),
            ],
        }
    }
}

/// Additional option setting supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraSetting {
    pub namespace: String,
    pub option_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub solution_stack: String,
    pub tier_name: String,
    pub tier_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_settings: Vec<ExtraSetting>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            solution_stack: "64bit Amazon Linux 2023 v6.1.1 running Node.js 20".to_string(),
            tier_name: "WebServer".to_string(),
            tier_type: "Standard".to_string(),
            extra_settings: Vec::new(),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |valid: String| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid,
    };
    match key {
        "stage" if !VALID_STAGES.contains(&value) => Err(invalid(VALID_STAGES.join(", ")).into()),
        "database.deletion_protection" if !VALID_BOOLEANS.contains(&value) => {
            Err(invalid(VALID_BOOLEANS.join(", ")).into())
        }
        "database.instance_size" if !VALID_INSTANCE_SIZES.contains(&value) => {
            Err(invalid(VALID_INSTANCE_SIZES.join(", ")).into())
        }
        "network.max_azs" => match value.parse::<u8>() {
            Ok(n) if (1..=MAX_AZS).contains(&n) => Ok(()),
            _ => Err(invalid(format!("1..={MAX_AZS}")).into()),
        },
        "database.allocated_storage_gb" => match value.parse::<u32>() {
            Ok(n) if (MIN_STORAGE_GB..=MAX_STORAGE_GB).contains(&n) => Ok(()),
            _ => Err(invalid(format!("{MIN_STORAGE_GB}..={MAX_STORAGE_GB}")).into()),
        },
        "database.engine_version" | "environment.solution_stack" if value.trim().is_empty() => {
            Err(invalid("a non-empty string".to_string()).into())
        }
        _ => Ok(()),
    }
}

impl StackConfig {
    /// Apply a validated `key = value` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid for it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;

        match key {
            "stage" => {
                self.stage = if value == "production" {
                    Stage::Production
                } else {
                    Stage::Development
                };
            }
            "network.max_azs" => self.network.max_azs = value.parse()?,
            "database.deletion_protection" => self.database.deletion_protection = value == "true",
            "database.allocated_storage_gb" => self.database.allocated_storage_gb = value.parse()?,
            "database.engine_version" => self.database.engine_version = value.to_string(),
            "database.instance_size" => self.database.instance_size = value.to_string(),
            "environment.solution_stack" => self.environment.solution_stack = value.to_string(),
            _ => anyhow::bail!("Unknown setting: {key}"),
        }
        Ok(())
    }

    /// Current value of a settable key, rendered as a string.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "stage" => self.stage.to_string(),
            "network.max_azs" => self.network.max_azs.to_string(),
            "database.deletion_protection" => self.database.deletion_protection.to_string(),
            "database.allocated_storage_gb" => self.database.allocated_storage_gb.to_string(),
            "database.engine_version" => self.database.engine_version.clone(),
            "database.instance_size" => self.database.instance_size.clone(),
            "environment.solution_stack" => self.environment.solution_stack.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Declaration validity: every violation is reported, not just the first.
    ///
    /// Stage/deletion-protection consistency is a topology check, not a
    /// validity error, so development stacks may still be synthesized.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` listing all violations.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.stack_name.0.trim().is_empty() {
            errors.push("stack_name must not be empty".to_string());
        }
        if self.application.tag_key.is_empty() || self.application.tag_value.is_empty() {
            errors.push("application tag key and value must not be empty".to_string());
        }

        if !(1..=MAX_AZS).contains(&self.network.max_azs) {
            errors.push(format!(
                "network.max_azs must be between 1 and {MAX_AZS} (got {})",
                self.network.max_azs
            ));
        }
        match parse_cidr(&self.network.cidr) {
            Some((_, prefix)) if (16..=24).contains(&prefix) => {}
            Some((_, prefix)) => errors.push(format!(
                "network.cidr prefix must be between /16 and /24 (got /{prefix})"
            )),
            None => errors.push(format!("network.cidr '{}' is not an IPv4 CIDR", self.network.cidr)),
        }

        if self.secret.username.is_empty() {
            errors.push("secret.username must not be empty".to_string());
        }
        if self.secret.generate_string_key.is_empty() {
            errors.push("secret.generate_string_key must not be empty".to_string());
        }
        if self.secret.generate_string_key == "username" {
            errors.push("secret.generate_string_key must differ from the username field".to_string());
        }
        if !(8..=4096).contains(&self.secret.password_length) {
            errors.push("secret.password_length must be between 8 and 4096".to_string());
        }

        if let Err(reason) = validate_db_identifier(&self.database.identifier) {
            errors.push(format!("database.identifier {reason}"));
        }
        if !(MIN_STORAGE_GB..=MAX_STORAGE_GB).contains(&self.database.allocated_storage_gb) {
            errors.push(format!(
                "database.allocated_storage_gb must be between {MIN_STORAGE_GB} and {MAX_STORAGE_GB}"
            ));
        }
        if self.database.engine_version.trim().is_empty() {
            errors.push("database.engine_version must not be empty".to_string());
        }
        if self.database.instance_class.is_empty() || self.database.instance_size.is_empty() {
            errors.push("database.instance_class and instance_size must not be empty".to_string());
        }

        if self.role.trusted_service.is_empty() {
            errors.push("role.trusted_service must not be empty".to_string());
        }
        if self.role.managed_policies.is_empty() {
            errors.push("role.managed_policies must list at least one policy".to_string());
        }

        if self.environment.solution_stack.trim().is_empty() {
            errors.push("environment.solution_stack must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed(format!("  - {}", errors.join("\n  - "))).into())
        }
    }
}

/// Check an RDS instance identifier.
///
/// # Errors
///
/// Returns a human-readable reason when the identifier is rejected.
pub fn validate_db_identifier(id: &str) -> std::result::Result<(), String> {
    if !DB_IDENTIFIER_RE.is_match(id) {
        return Err(format!(
            "'{id}' must start with a letter and contain 1-63 letters, digits or hyphens"
        ));
    }
    if id.ends_with('-') || id.contains("--") {
        return Err(format!(
            "'{id}' must not end with a hyphen or contain two consecutive hyphens"
        ));
    }
    Ok(())
}

/// Parse `a.b.c.d/n` into its network address and prefix length.
#[must_use]
pub fn parse_cidr(cidr: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, prefix) = cidr.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((addr, prefix))
}

// ── Unit tests ───────────────────────────────────────────────────────────────
