use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::expr::references;

/// Template format version understood by the provisioning engine.
pub const FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported template format version '{0}' (expected {FORMAT_VERSION})")]
    FormatVersion(String),
}

/// A synthesized stack template: the whole structured description handed to
/// the provisioning engine.
///
/// Resources and outputs are kept in `BTreeMap`s so serialization is stable:
/// the same declaration always produces byte-identical JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDecl>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, OutputDecl>,
}

/// What the engine does with a resource when the stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDecl {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RetentionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RetentionPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDecl {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Template {
    #[must_use]
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Parse a template previously written by `to_json_pretty`.
    pub fn from_json(text: &str) -> Result<Self, TemplateError> {
        let template: Self = serde_json::from_str(text)?;
        if template.format_version != FORMAT_VERSION {
            return Err(TemplateError::FormatVersion(template.format_version));
        }
        Ok(template)
    }

    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&ResourceDecl> {
        self.resources.get(logical_id)
    }

    /// All resources of the given CloudFormation type, ordered by logical id.
    pub fn resources_of_type<'a, 'b>(
        &'a self,
        resource_type: &'b str,
    ) -> impl Iterator<Item = (&'a str, &'a ResourceDecl)> + 'b
    where
        'a: 'b,
    {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
            .map(|(id, r)| (id.as_str(), r))
    }

    #[must_use]
    pub fn count_of_type(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).count()
    }

    /// First resource of a type, for types the stack declares exactly once.
    #[must_use]
    pub fn single_of_type(&self, resource_type: &str) -> Option<(&str, &ResourceDecl)> {
        let mut it = self.resources_of_type(resource_type);
        let first = it.next()?;
        if it.next().is_some() {
            return None;
        }
        Some(first)
    }
}

impl ResourceDecl {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    /// Look up a nested property by dotted path, e.g.
    /// `GenerateSecretString.GenerateStringKey`.
    #[must_use]
    pub fn property(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.properties.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Logical ids this resource depends on: intrinsic references in its
    /// properties plus explicit `DependsOn` entries.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        for value in self.properties.values() {
            deps.extend(references(value));
        }
        deps.extend(self.depends_on.iter().cloned());
        deps
    }
}
