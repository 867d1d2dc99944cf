//! Access role for the compute tier, its secret-read policy, and the
//! instance profile that surfaces the role to instances.

use serde_json::{Value, json};
use threetier_common::{Expr, ResourceDecl, resource_types as rt};

use crate::domain::config::RoleConfig;
use crate::domain::error::DeclarationError;
use crate::domain::topology::Topology;

pub const ROLE_ID: &str = "EBRole";
pub const POLICY_ID: &str = "EBRoleDefaultPolicy";
pub const INSTANCE_PROFILE_ID: &str = "CustomInstanceProfile";

pub const GET_SECRET_VALUE: &str = "secretsmanager:GetSecretValue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// One fine-grained permission statement. Its resource scope is always a
/// non-empty list of concrete locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<Expr>,
}

impl PolicyStatement {
    /// # Errors
    ///
    /// Returns `EmptyScope` when `resources` is empty and `WildcardScope`
    /// when any entry is a literal containing `*`.
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Result<Self, DeclarationError> {
        let actions: Vec<String> = actions.iter().map(ToString::to_string).collect();
        if resources.is_empty() {
            return Err(DeclarationError::EmptyScope {
                actions: actions.join(", "),
            });
        }
        if resources
            .iter()
            .any(|r| matches!(r, Expr::Literal(s) if s.contains('*')))
        {
            return Err(DeclarationError::WildcardScope {
                actions: actions.join(", "),
            });
        }
        Ok(Self {
            effect: Effect::Allow,
            actions,
            resources,
        })
    }

    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    #[must_use]
    pub fn resources(&self) -> &[Expr] {
        &self.resources
    }

    fn to_value(&self) -> Value {
        let resource = match self.resources.as_slice() {
            [single] => single.to_value(),
            many => Value::Array(many.iter().map(Expr::to_value).collect()),
        };
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        json!({
            "Effect": self.effect.as_str(),
            "Action": action,
            "Resource": resource,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub trusted_service: String,
    pub managed_policies: Vec<String>,
    pub statements: Vec<PolicyStatement>,
}

#[derive(Debug, Clone)]
pub struct RoleHandle {
    pub logical_id: String,
    pub role: Expr,
    /// Logical id of the inline policy, when the role has statements.
    pub policy_id: Option<String>,
}

impl RoleSpec {
    #[must_use]
    pub fn from_config(cfg: &RoleConfig, statements: Vec<PolicyStatement>) -> Self {
        Self {
            trusted_service: cfg.trusted_service.clone(),
            managed_policies: cfg.managed_policies.clone(),
            statements,
        }
    }

    /// Declare the role and, when it has statements, its inline policy.
    ///
    /// # Errors
    ///
    /// Returns an error if a logical id collides.
    pub fn declare(&self, topo: &mut Topology) -> Result<RoleHandle, DeclarationError> {
        let managed: Vec<Value> = self
            .managed_policies
            .iter()
            .map(|name| managed_policy_arn(name).to_value())
            .collect();
        let role = topo.declare(
            ROLE_ID,
            ResourceDecl::new(rt::ROLE)
                .with_property(
                    "AssumeRolePolicyDocument",
                    json!({
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": { "Service": self.trusted_service },
                            "Action": "sts:AssumeRole",
                        }],
                    }),
                )
                .with_property("ManagedPolicyArns", managed),
        )?;

        let policy_id = if self.statements.is_empty() {
            None
        } else {
            let statements: Vec<Value> =
                self.statements.iter().map(PolicyStatement::to_value).collect();
            topo.declare(
                POLICY_ID,
                ResourceDecl::new(rt::POLICY)
                    .with_property("PolicyName", POLICY_ID)
                    .with_property(
                        "PolicyDocument",
                        json!({ "Version": "2012-10-17", "Statement": statements }),
                    )
                    .with_property("Roles", json!([role.to_value()])),
            )?;
            Some(POLICY_ID.to_string())
        };

        Ok(RoleHandle {
            logical_id: ROLE_ID.to_string(),
            role,
            policy_id,
        })
    }
}

/// ARN of a provider-managed policy in the current partition.
#[must_use]
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::join(
        "",
        vec![
            Expr::literal("arn:"),
            Expr::pseudo("Partition"),
            Expr::literal(format!(":iam::aws:policy/{name}")),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct InstanceProfileSpec<'a> {
    pub role: &'a RoleHandle,
}

#[derive(Debug, Clone)]
pub struct InstanceProfileHandle {
    pub logical_id: String,
    pub arn: Expr,
}

impl InstanceProfileSpec<'_> {
    /// # Errors
    ///
    /// Returns an error if the logical id collides.
    pub fn declare(&self, topo: &mut Topology) -> Result<InstanceProfileHandle, DeclarationError> {
        topo.declare(
            INSTANCE_PROFILE_ID,
            ResourceDecl::new(rt::INSTANCE_PROFILE)
                .with_property("Roles", json!([self.role.role.to_value()])),
        )?;
        Ok(InstanceProfileHandle {
            logical_id: INSTANCE_PROFILE_ID.to_string(),
            arn: Expr::get_att(INSTANCE_PROFILE_ID, "Arn"),
        })
    }
}
