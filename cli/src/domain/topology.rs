//! In-memory declaration set built by a single pass over the stack inputs.

use std::collections::BTreeMap;

use threetier_common::{Expr, OutputDecl, ResourceDecl};

use crate::domain::error::DeclarationError;

/// Resources and outputs declared so far, keyed by logical id.
///
/// Declaration order is remembered for display only; provisioning order is
/// always derived from the reference graph.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub description: Option<String>,
    resources: BTreeMap<String, ResourceDecl>,
    outputs: BTreeMap<String, OutputDecl>,
    declared: Vec<String>,
}

impl Topology {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Declare a resource and return a `Ref` to it.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError::DuplicateLogicalId` if the id is taken.
    pub fn declare(
        &mut self,
        logical_id: &str,
        decl: ResourceDecl,
    ) -> Result<Expr, DeclarationError> {
        if self.resources.contains_key(logical_id) {
            return Err(DeclarationError::DuplicateLogicalId(logical_id.to_string()));
        }
        self.resources.insert(logical_id.to_string(), decl);
        self.declared.push(logical_id.to_string());
        Ok(Expr::reference(logical_id))
    }

    pub fn output(&mut self, name: &str, value: &Expr, description: &str) {
        self.outputs.insert(
            name.to_string(),
            OutputDecl {
                value: value.to_value(),
                description: Some(description.to_string()),
            },
        );
    }

    #[must_use]
    pub fn get(&self, logical_id: &str) -> Option<&ResourceDecl> {
        self.resources.get(logical_id)
    }

    pub fn resources_mut(&mut self) -> impl Iterator<Item = (&String, &mut ResourceDecl)> {
        self.resources.iter_mut()
    }

    #[must_use]
    pub fn resources(&self) -> &BTreeMap<String, ResourceDecl> {
        &self.resources
    }

    #[must_use]
    pub fn outputs(&self) -> &BTreeMap<String, OutputDecl> {
        &self.outputs
    }

    /// Logical ids in the order they were declared.
    #[must_use]
    pub fn declared_order(&self) -> &[String] {
        &self.declared
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Build a logical id from name fragments, keeping only ASCII alphanumerics.
#[must_use]
pub fn logical_id(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect()
}
