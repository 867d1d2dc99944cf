//! Managed relational database placed in the private subnets and
//! authenticated by the credential secret.

use std::fmt;

use serde_json::json;
use threetier_common::{Expr, ResourceDecl, RetentionPolicy, resource_types as rt};

use crate::domain::config::{DatabaseConfig, EngineKind};
use crate::domain::error::DeclarationError;
use crate::domain::resources::network::NetworkHandle;
use crate::domain::resources::secret::SecretHandle;
use crate::domain::topology::Topology;

pub const DATABASE_ID: &str = "Database";
pub const SUBNET_GROUP_ID: &str = "DatabaseSubnetGroup";
pub const SECURITY_GROUP_ID: &str = "DatabaseSecurityGroup";
pub const SECRET_ATTACHMENT_ID: &str = "DatabaseSecretAttachment";

/// RDS instance class: family plus size, rendered as `db.<family>.<size>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceClass {
    pub family: String,
    pub size: String,
}

impl fmt::Display for InstanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db.{}.{}", self.family, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub engine: EngineKind,
    pub engine_version: String,
    pub instance_class: InstanceClass,
    pub storage_gb: u32,
    pub identifier: String,
    pub deletion_protection: bool,
    pub port: u16,
}

/// Deferred endpoint of the provisioned instance.
#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    pub logical_id: String,
    pub endpoint_address: Expr,
    pub endpoint_port: Expr,
}

impl From<&DatabaseConfig> for DatabaseSpec {
    fn from(cfg: &DatabaseConfig) -> Self {
        Self {
            engine: cfg.engine,
            engine_version: cfg.engine_version.clone(),
            instance_class: InstanceClass {
                family: cfg.instance_class.clone(),
                size: cfg.instance_size.clone(),
            },
            storage_gb: cfg.allocated_storage_gb,
            identifier: cfg.identifier.clone(),
            deletion_protection: cfg.deletion_protection,
            port: cfg.effective_port(),
        }
    }
}

impl DatabaseSpec {
    /// Declare the subnet group, security group, instance and secret
    /// attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if a logical id collides.
    pub fn declare(
        &self,
        topo: &mut Topology,
        network: &NetworkHandle,
        secret: &SecretHandle,
    ) -> Result<DatabaseHandle, DeclarationError> {
        let subnets: Vec<_> = network.private_subnets.iter().map(Expr::to_value).collect();
        let subnet_group = topo.declare(
            SUBNET_GROUP_ID,
            ResourceDecl::new(rt::DB_SUBNET_GROUP)
                .with_property(
                    "DBSubnetGroupDescription",
                    format!("Private subnets for {}", self.identifier),
                )
                .with_property("SubnetIds", subnets),
        )?;

        topo.declare(
            SECURITY_GROUP_ID,
            ResourceDecl::new(rt::SECURITY_GROUP)
                .with_property(
                    "GroupDescription",
                    format!("Access to {} from inside the VPC", self.identifier),
                )
                .with_property("VpcId", network.vpc.clone())
                .with_property(
                    "SecurityGroupIngress",
                    json!([{
                        "IpProtocol": "tcp",
                        "CidrIp": network.cidr,
                        "FromPort": self.port,
                        "ToPort": self.port,
                        "Description": format!("{} clients", self.engine.as_str()),
                    }]),
                ),
        )?;
        let group_id = Expr::get_att(SECURITY_GROUP_ID, "GroupId");

        let mut instance = ResourceDecl::new(rt::DB_INSTANCE)
            .with_property("Engine", self.engine.as_str())
            .with_property("EngineVersion", self.engine_version.as_str())
            .with_property("DBInstanceClass", self.instance_class.to_string())
            .with_property("AllocatedStorage", self.storage_gb.to_string())
            .with_property("DBInstanceIdentifier", self.identifier.as_str())
            .with_property("DeletionProtection", self.deletion_protection)
            .with_property("DBSubnetGroupName", subnet_group)
            .with_property("VPCSecurityGroups", json!([group_id.to_value()]))
            .with_property("MasterUsername", secret.username())
            .with_property("MasterUserPassword", secret.password())
            .with_property("Port", self.port.to_string())
            .with_property("PubliclyAccessible", false)
            .with_property("StorageType", "gp2")
            .with_property("CopyTagsToSnapshot", true);
        // A final snapshot is kept on teardown whether or not deletion
        // protection is on.
        instance.deletion_policy = Some(RetentionPolicy::Snapshot);
        instance.update_replace_policy = Some(RetentionPolicy::Snapshot);
        let db = topo.declare(DATABASE_ID, instance)?;

        topo.declare(
            SECRET_ATTACHMENT_ID,
            ResourceDecl::new(rt::SECRET_ATTACHMENT)
                .with_property("SecretId", secret.locator.clone())
                .with_property("TargetId", db)
                .with_property("TargetType", "AWS::RDS::DBInstance"),
        )?;

        Ok(DatabaseHandle {
            logical_id: DATABASE_ID.to_string(),
            endpoint_address: Expr::get_att(DATABASE_ID, "Endpoint.Address"),
            endpoint_port: Expr::get_att(DATABASE_ID, "Endpoint.Port"),
        })
    }
}
