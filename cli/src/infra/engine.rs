//! In-process provisioning engine used for local rehearsal.
//!
//! Visits resources in the order it is given, mints deterministic locators,
//! resolves intrinsics against what it has already provisioned, and generates
//! secret values under the declared policy. Generated values live in memory
//! only and never reach the deployment record.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::Utc;
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use threetier_common::{RetentionPolicy, Template, namespaces, resource_types as rt};

use crate::application::ports::ProvisioningEngine;
use crate::domain::config::EngineKind;
use crate::domain::deployment::{DeployedResource, DeploymentRecord, TeardownOutcome};
use crate::domain::error::DeploymentError;
use crate::domain::resources::secret::GenerationPolicy;
use crate::domain::synth::{hex_encode, template_digest};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";

const DYNAMIC_REFERENCE_PREFIX: &str = "{{resolve:secretsmanager:";

/// Generated secret values, keyed by secret ARN.
type SecretVault = BTreeMap<String, Map<String, Value>>;

pub struct LocalEngine {
    region: String,
    account_id: String,
    rng: Mutex<ChaCha20Rng>,
    vault: Mutex<SecretVault>,
}

impl LocalEngine {
    /// Engine whose generator is seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(ChaCha20Rng::from_entropy())
    }

    /// Engine with a fixed seed, for reproducible secret generation.
    #[must_use]
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_rng(ChaCha20Rng::from_seed(seed))
    }

    fn with_rng(rng: ChaCha20Rng) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            rng: Mutex::new(rng),
            vault: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    /// Read one field of a generated secret, the way a consumer holding
    /// `GetSecretValue` on `locator` would.
    #[must_use]
    pub fn secret_field(&self, locator: &str, key: &str) -> Option<String> {
        let vault = self.vault.lock().ok()?;
        vault
            .get(locator)
            .and_then(|fields| fields.get(key))
            .and_then(scalar_string)
    }

    fn availability_zones(&self) -> Vec<Value> {
        ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|s| Value::String(format!("{}{s}", self.region)))
            .collect()
    }

    fn provision(
        &self,
        ctx: &Resolver<'_>,
        logical_id: &str,
        resource_type: &str,
        props: &Map<String, Value>,
    ) -> Result<Provisioned> {
        let hash = |n: usize| short_hash(ctx.stack_name, logical_id, n);
        let named = || format!("{}-{logical_id}-{}", ctx.stack_name, hash(12).to_uppercase());
        let mut out = Provisioned::default();

        match resource_type {
            rt::VPC => {
                out.physical_id = format!("vpc-{}", hash(17));
                if let Some(cidr) = props.get("CidrBlock").and_then(scalar_string) {
                    out.attributes.insert("CidrBlock".to_string(), cidr);
                }
            }
            rt::SUBNET => {
                out.physical_id = format!("subnet-{}", hash(17));
                if let Some(az) = props.get("AvailabilityZone").and_then(scalar_string) {
                    out.attributes.insert("AvailabilityZone".to_string(), az);
                }
            }
            rt::INTERNET_GATEWAY => out.physical_id = format!("igw-{}", hash(17)),
            rt::ROUTE_TABLE => out.physical_id = format!("rtb-{}", hash(17)),
            rt::SUBNET_ROUTE_TABLE_ASSOCIATION => out.physical_id = format!("rtbassoc-{}", hash(17)),
            rt::EIP => {
                let octets = Sha256::digest(format!("{}/{logical_id}", ctx.stack_name).as_bytes());
                out.physical_id = format!("52.{}.{}.{}", octets[0], octets[1], octets[2]);
                out.attributes
                    .insert("AllocationId".to_string(), format!("eipalloc-{}", hash(17)));
                out.attributes
                    .insert("PublicIp".to_string(), out.physical_id.clone());
            }
            rt::NAT_GATEWAY => out.physical_id = format!("nat-{}", hash(17)),
            rt::SECURITY_GROUP => {
                out.physical_id = format!("sg-{}", hash(17));
                out.attributes
                    .insert("GroupId".to_string(), out.physical_id.clone());
            }
            rt::SECRET => {
                let name = props
                    .get("Name")
                    .and_then(scalar_string)
                    .unwrap_or_else(named);
                out.physical_id = format!(
                    "arn:aws:secretsmanager:{}:{}:secret:{name}-{}",
                    self.region,
                    self.account_id,
                    hash(6)
                );
                let fields = self.generate_secret(logical_id, props)?;
                self.vault
                    .lock()
                    .map_err(|_| anyhow!("secret vault lock poisoned"))?
                    .insert(out.physical_id.clone(), fields);
            }
            rt::SECRET_ATTACHMENT => {
                out.physical_id = props
                    .get("SecretId")
                    .and_then(scalar_string)
                    .unwrap_or_else(named);
            }
            rt::DB_SUBNET_GROUP => out.physical_id = named().to_lowercase(),
            rt::DB_INSTANCE => {
                self.check_credentials(logical_id, props)?;
                out.physical_id = props
                    .get("DBInstanceIdentifier")
                    .and_then(scalar_string)
                    .unwrap_or_else(|| named().to_lowercase());
                let port = props
                    .get("Port")
                    .and_then(scalar_string)
                    .or_else(|| {
                        props
                            .get("Engine")
                            .cloned()
                            .and_then(|e| serde_json::from_value::<EngineKind>(e).ok())
                            .map(|e| e.default_port().to_string())
                    })
                    .unwrap_or_else(|| EngineKind::default().default_port().to_string());
                out.attributes.insert(
                    "Endpoint.Address".to_string(),
                    format!("{}.{}.{}.rds.amazonaws.com", out.physical_id, hash(12), self.region),
                );
                out.attributes.insert("Endpoint.Port".to_string(), port);
                out.deletion_protected = props
                    .get("DeletionProtection")
                    .is_some_and(|v| v == &Value::Bool(true) || v == "true");
            }
            rt::ROLE => {
                out.physical_id = named();
                out.attributes.insert(
                    "Arn".to_string(),
                    format!("arn:aws:iam::{}:role/{}", self.account_id, out.physical_id),
                );
            }
            rt::INSTANCE_PROFILE => {
                out.physical_id = named();
                out.attributes.insert(
                    "Arn".to_string(),
                    format!(
                        "arn:aws:iam::{}:instance-profile/{}",
                        self.account_id, out.physical_id
                    ),
                );
            }
            rt::EB_APPLICATION => {
                out.physical_id = props
                    .get("ApplicationName")
                    .and_then(scalar_string)
                    .unwrap_or_else(named);
            }
            rt::EB_ENVIRONMENT => {
                out.physical_id = format!("e-{}", hash(10));
                out.attributes.insert(
                    "EndpointURL".to_string(),
                    format!("{}.{}.elasticbeanstalk.com", out.physical_id, self.region),
                );
                out.environment = environment_variables(logical_id, props)?;
            }
            rt::RESOURCE_GROUP => {
                out.physical_id = props
                    .get("Name")
                    .and_then(scalar_string)
                    .unwrap_or_else(named);
                out.attributes.insert(
                    "Arn".to_string(),
                    format!(
                        "arn:aws:resource-groups:{}:{}:group/{}",
                        self.region, self.account_id, out.physical_id
                    ),
                );
            }
            _ => out.physical_id = named(),
        }
        Ok(out)
    }

    fn generate_secret(
        &self,
        logical_id: &str,
        props: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let unresolved = |reason: &str| DeploymentError::Unresolved {
            logical_id: logical_id.to_string(),
            reason: reason.to_string(),
        };
        let Some(spec) = props.get("GenerateSecretString") else {
            return Ok(Map::new());
        };
        let mut fields: Map<String, Value> = match spec.get("SecretStringTemplate") {
            Some(Value::String(text)) => serde_json::from_str(text)
                .map_err(|_| unresolved("SecretStringTemplate is not a JSON object"))?,
            _ => Map::new(),
        };
        let flag = |key: &str| spec.get(key).and_then(Value::as_bool).unwrap_or(false);
        let policy = GenerationPolicy {
            generate_string_key: spec
                .get("GenerateStringKey")
                .and_then(Value::as_str)
                .unwrap_or("password")
                .to_string(),
            exclude_punctuation: flag("ExcludePunctuation"),
            include_space: flag("IncludeSpace"),
            password_length: spec
                .get("PasswordLength")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(32),
        };
        let value = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| anyhow!("generator lock poisoned"))?;
            policy.generate(&mut *rng)
        };
        fields.insert(policy.generate_string_key, Value::String(value));
        Ok(fields)
    }

    /// Master credentials must have resolved to non-empty values.
    fn check_credentials(&self, logical_id: &str, props: &Map<String, Value>) -> Result<()> {
        for field in ["MasterUsername", "MasterUserPassword"] {
            let value = props.get(field).and_then(scalar_string).unwrap_or_default();
            if value.is_empty() || value.contains(DYNAMIC_REFERENCE_PREFIX) {
                return Err(DeploymentError::Unresolved {
                    logical_id: logical_id.to_string(),
                    reason: format!("{field} did not resolve"),
                }
                .into());
            }
        }
        Ok(())
    }

    fn lookup_secret(&self, secret_id: &str, key: &str) -> Option<String> {
        let vault = self.vault.lock().ok()?;
        let fields = vault.get(secret_id).or_else(|| {
            vault
                .iter()
                .find(|(arn, _)| arn.contains(&format!(":secret:{secret_id}-")))
                .map(|(_, f)| f)
        })?;
        fields.get(key).and_then(scalar_string)
    }

    /// Expand `{{resolve:secretsmanager:<id>:SecretString:<key>::}}` in place.
    fn expand_dynamic_references(&self, text: &str) -> Result<String, String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(DYNAMIC_REFERENCE_PREFIX) {
            out.push_str(&rest[..start]);
            let body_start = start + DYNAMIC_REFERENCE_PREFIX.len();
            let Some(len) = rest[body_start..].find("}}") else {
                return Err("unterminated dynamic reference".to_string());
            };
            let body = &rest[body_start..body_start + len];
            let (secret_id, tail) = body
                .split_once(":SecretString:")
                .ok_or_else(|| "dynamic reference has no SecretString field".to_string())?;
            let key = tail.split(':').next().unwrap_or_default();
            let value = self
                .lookup_secret(secret_id, key)
                .ok_or_else(|| format!("secret {secret_id} has no field '{key}'"))?;
            out.push_str(&value);
            rest = &rest[body_start + len + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn resolve(&self, ctx: &Resolver<'_>, value: &Value) -> Result<Value, String> {
        match value {
            Value::Object(map) if map.len() == 1 => {
                let (key, arg) = map.iter().next().ok_or_else(String::new)?;
                match key.as_str() {
                    "Ref" => ctx.reference(arg.as_str().unwrap_or_default()).map(Value::String),
                    "Fn::GetAtt" => {
                        let (target, attr) = match arg {
                            Value::Array(items) => (
                                items.first().and_then(Value::as_str).unwrap_or_default(),
                                items.get(1).and_then(Value::as_str).unwrap_or_default(),
                            ),
                            Value::String(dotted) => dotted.split_once('.').unwrap_or((dotted, "")),
                            _ => return Err("malformed Fn::GetAtt".to_string()),
                        };
                        ctx.attribute(target, attr).map(Value::String)
                    }
                    "Fn::Join" => {
                        let sep = arg.get(0).and_then(Value::as_str).unwrap_or_default();
                        let parts = arg
                            .get(1)
                            .and_then(Value::as_array)
                            .ok_or_else(|| "malformed Fn::Join".to_string())?;
                        let mut strings = Vec::with_capacity(parts.len());
                        for part in parts {
                            let resolved = self.resolve(ctx, part)?;
                            strings.push(
                                scalar_string(&resolved)
                                    .ok_or_else(|| "Fn::Join part is not a string".to_string())?,
                            );
                        }
                        let joined = strings.join(sep);
                        if joined.contains(DYNAMIC_REFERENCE_PREFIX) {
                            self.expand_dynamic_references(&joined).map(Value::String)
                        } else {
                            Ok(Value::String(joined))
                        }
                    }
                    "Fn::Select" => {
                        let index = arg
                            .get(0)
                            .and_then(Value::as_u64)
                            .and_then(|i| usize::try_from(i).ok())
                            .ok_or_else(|| "malformed Fn::Select".to_string())?;
                        let list = self.resolve(ctx, arg.get(1).unwrap_or(&Value::Null))?;
                        list.get(index)
                            .cloned()
                            .ok_or_else(|| format!("Fn::Select index {index} out of range"))
                    }
                    "Fn::GetAZs" => Ok(Value::Array(self.availability_zones())),
                    _ => self.resolve_map(ctx, map),
                }
            }
            Value::Object(map) => self.resolve_map(ctx, map),
            Value::Array(items) => items
                .iter()
                .map(|v| self.resolve(ctx, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::String(s) if s.contains(DYNAMIC_REFERENCE_PREFIX) => {
                self.expand_dynamic_references(s).map(Value::String)
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_map(&self, ctx: &Resolver<'_>, map: &Map<String, Value>) -> Result<Value, String> {
        let mut out = Map::new();
        for (k, v) in map {
            out.insert(k.clone(), self.resolve(ctx, v)?);
        }
        Ok(Value::Object(out))
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Provisioned {
    physical_id: String,
    attributes: BTreeMap<String, String>,
    deletion_protected: bool,
    environment: BTreeMap<String, String>,
}

/// Lookup context for intrinsic resolution: what has been provisioned so far.
struct Resolver<'a> {
    stack_name: &'a str,
    region: &'a str,
    account_id: &'a str,
    provisioned: BTreeMap<String, DeployedResource>,
}

impl Resolver<'_> {
    fn reference(&self, target: &str) -> Result<String, String> {
        if let Some(pseudo) = target.strip_prefix("AWS::") {
            return match pseudo {
                "Partition" => Ok("aws".to_string()),
                "Region" => Ok(self.region.to_string()),
                "AccountId" => Ok(self.account_id.to_string()),
                "StackName" => Ok(self.stack_name.to_string()),
                "URLSuffix" => Ok("amazonaws.com".to_string()),
                _ => Err(format!("unsupported pseudo parameter {target}")),
            };
        }
        self.provisioned
            .get(target)
            .map(|r| r.physical_id.clone())
            .ok_or_else(|| format!("{target} is not provisioned yet"))
    }

    fn attribute(&self, target: &str, attr: &str) -> Result<String, String> {
        let resource = self
            .provisioned
            .get(target)
            .ok_or_else(|| format!("{target} is not provisioned yet"))?;
        resource
            .attributes
            .get(attr)
            .cloned()
            .ok_or_else(|| format!("{target} has no attribute {attr}"))
    }
}

impl ProvisioningEngine for LocalEngine {
    async fn apply(
        &self,
        stack_name: &str,
        template: &Template,
        order: &[String],
    ) -> Result<DeploymentRecord> {
        check_order_covers(template.resources.keys(), order)?;

        let mut ctx = Resolver {
            stack_name,
            region: &self.region,
            account_id: &self.account_id,
            provisioned: BTreeMap::new(),
        };
        let mut resources = Vec::with_capacity(order.len());
        let mut environment = BTreeMap::new();

        for logical_id in order {
            let decl = template
                .resource(logical_id)
                .ok_or_else(|| anyhow!("{logical_id} is not in the template"))?;
            let unresolved = |reason: String| DeploymentError::Unresolved {
                logical_id: logical_id.clone(),
                reason,
            };
            for dep in &decl.depends_on {
                if !ctx.provisioned.contains_key(dep) {
                    return Err(unresolved(format!("depends on {dep}, which is not provisioned yet")).into());
                }
            }
            let props = match self.resolve(&ctx, &Value::Object(decl.properties.clone())) {
                Ok(Value::Object(map)) => map,
                Ok(_) => Map::new(),
                Err(reason) => return Err(unresolved(reason).into()),
            };

            let created = self.provision(&ctx, logical_id, &decl.resource_type, &props)?;
            tracing::debug!(
                resource = %logical_id,
                kind = %decl.resource_type,
                physical_id = %created.physical_id,
                "provisioned"
            );
            environment.extend(created.environment);
            let deployed = DeployedResource {
                logical_id: logical_id.clone(),
                resource_type: decl.resource_type.clone(),
                physical_id: created.physical_id,
                attributes: created.attributes,
                deletion_protected: created.deletion_protected,
            };
            ctx.provisioned.insert(logical_id.clone(), deployed.clone());
            resources.push(deployed);
        }

        let mut outputs = BTreeMap::new();
        for (name, output) in &template.outputs {
            let value = self
                .resolve(&ctx, &output.value)
                .map_err(|reason| unresolved_output(name, reason))?;
            outputs.insert(name.clone(), scalar_string(&value).unwrap_or_default());
        }

        Ok(DeploymentRecord {
            stack_name: stack_name.to_string(),
            template_digest: template_digest(template),
            deployed_at: Utc::now(),
            template: template.clone(),
            resources,
            environment,
            outputs,
        })
    }

    async fn destroy(&self, record: &DeploymentRecord, order: &[String]) -> Result<TeardownOutcome> {
        if let Some(protected) = record.protected_resources().first() {
            return Err(DeploymentError::DeletionProtected {
                logical_id: protected.logical_id.clone(),
                physical_id: protected.physical_id.clone(),
            }
            .into());
        }
        check_order_covers(record.resources.iter().map(|r| &r.logical_id), order)?;

        let mut outcome = TeardownOutcome::default();
        let mut removed: BTreeSet<&str> = BTreeSet::new();
        for logical_id in order {
            let Some(resource) = record.resource(logical_id) else {
                continue;
            };
            // Anything still depending on this resource must already be gone.
            let blocked = record.template.resources.iter().find(|(id, decl)| {
                !removed.contains(id.as_str())
                    && id.as_str() != logical_id
                    && decl.dependencies().contains(logical_id)
            });
            if let Some((dependent, _)) = blocked {
                anyhow::bail!("cannot delete {logical_id}: {dependent} still depends on it");
            }

            let policy = record
                .template
                .resource(logical_id)
                .and_then(|d| d.deletion_policy);
            match policy {
                Some(RetentionPolicy::Retain) => outcome.retained.push(logical_id.clone()),
                Some(RetentionPolicy::Snapshot) => {
                    outcome.snapshots.push(logical_id.clone());
                    outcome.deleted.push(logical_id.clone());
                }
                _ => outcome.deleted.push(logical_id.clone()),
            }
            if resource.resource_type == rt::SECRET {
                self.vault
                    .lock()
                    .map_err(|_| anyhow!("secret vault lock poisoned"))?
                    .remove(&resource.physical_id);
            }
            removed.insert(logical_id.as_str());
            tracing::debug!(resource = %logical_id, "deleted");
        }
        Ok(outcome)
    }
}

fn unresolved_output(name: &str, reason: String) -> DeploymentError {
    DeploymentError::Unresolved {
        logical_id: format!("Outputs.{name}"),
        reason,
    }
}

fn check_order_covers<'a>(ids: impl Iterator<Item = &'a String>, order: &[String]) -> Result<()> {
    let expected: BTreeSet<&String> = ids.collect();
    let given: BTreeSet<&String> = order.iter().collect();
    if given.len() != order.len() {
        anyhow::bail!("provisioning order lists a resource twice");
    }
    if let Some(missing) = expected.difference(&given).next() {
        anyhow::bail!("provisioning order omits {missing}");
    }
    if let Some(extra) = given.difference(&expected).next() {
        anyhow::bail!("provisioning order names unknown resource {extra}");
    }
    Ok(())
}

/// Option settings of the application-environment namespace, as strings.
fn environment_variables(
    logical_id: &str,
    props: &Map<String, Value>,
) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    let mut has_profile = false;
    for setting in props
        .get("OptionSettings")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let namespace = setting.get("Namespace").and_then(Value::as_str);
        let name = setting.get("OptionName").and_then(Value::as_str);
        let value = setting.get("Value").and_then(scalar_string);
        match (namespace, name, value) {
            (Some(namespaces::APPLICATION_ENVIRONMENT), Some(name), Some(value)) => {
                vars.insert(name.to_string(), value);
            }
            (Some(namespaces::LAUNCH_CONFIGURATION), Some(namespaces::IAM_INSTANCE_PROFILE), Some(v)) => {
                has_profile = !v.is_empty();
            }
            _ => {}
        }
    }
    if !has_profile {
        tracing::warn!(resource = %logical_id, "environment launches without an instance profile");
    }
    Ok(vars)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn short_hash(stack_name: &str, logical_id: &str, len: usize) -> String {
    let digest = Sha256::digest(format!("{stack_name}/{logical_id}").as_bytes());
    let mut hex = hex_encode(&digest);
    hex.truncate(len);
    hex
}
