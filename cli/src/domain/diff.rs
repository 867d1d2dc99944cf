//! Structural comparison of two templates.

use std::collections::BTreeSet;

use serde::Serialize;
use threetier_common::{Template, resource_types as rt};

/// Properties whose change forces the engine to replace the resource rather
/// than update it in place.
const REPLACEMENT_PROPERTIES: &[(&str, &[&str])] = &[
    (rt::VPC, &["CidrBlock", "InstanceTenancy"]),
    (rt::SUBNET, &["CidrBlock", "AvailabilityZone", "VpcId"]),
    (rt::SECRET, &["Name"]),
    (rt::DB_INSTANCE, &["DBInstanceIdentifier", "Engine", "DBSubnetGroupName"]),
    (rt::DB_SUBNET_GROUP, &["DBSubnetGroupName"]),
    (rt::SECURITY_GROUP, &["GroupDescription", "VpcId"]),
    (rt::EB_APPLICATION, &["ApplicationName"]),
    (rt::EB_ENVIRONMENT, &["ApplicationName", "SolutionStackName", "Tier"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub logical_id: String,
    pub resource_type: String,
    pub kind: ChangeKind,
    /// Top-level properties (plus `Type`, `DependsOn`, `DeletionPolicy`)
    /// that differ. Empty for additions and removals.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_properties: Vec<String>,
    pub replacement: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
    /// Output names whose value or presence changed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.outputs.is_empty()
    }

    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }

    #[must_use]
    pub fn replacements(&self) -> Vec<&Change> {
        self.changes.iter().filter(|c| c.replacement).collect()
    }
}

#[must_use]
pub fn requires_replacement(resource_type: &str, property: &str) -> bool {
    if property == "Type" {
        return true;
    }
    REPLACEMENT_PROPERTIES
        .iter()
        .find(|(ty, _)| *ty == resource_type)
        .is_some_and(|(_, props)| props.contains(&property))
}

/// Compare `old` against `new`. Changes are ordered by logical id.
#[must_use]
pub fn diff(old: &Template, new: &Template) -> ChangeSet {
    let ids: BTreeSet<&String> = old.resources.keys().chain(new.resources.keys()).collect();
    let mut changes = Vec::new();

    for id in ids {
        match (old.resources.get(id), new.resources.get(id)) {
            (None, Some(added)) => changes.push(Change {
                logical_id: id.clone(),
                resource_type: added.resource_type.clone(),
                kind: ChangeKind::Added,
                changed_properties: Vec::new(),
                replacement: false,
            }),
            (Some(removed), None) => changes.push(Change {
                logical_id: id.clone(),
                resource_type: removed.resource_type.clone(),
                kind: ChangeKind::Removed,
                changed_properties: Vec::new(),
                replacement: false,
            }),
            (Some(before), Some(after)) if before != after => {
                let mut changed: Vec<String> = Vec::new();
                if before.resource_type != after.resource_type {
                    changed.push("Type".to_string());
                }
                let keys: BTreeSet<&String> = before
                    .properties
                    .keys()
                    .chain(after.properties.keys())
                    .collect();
                for key in keys {
                    if before.properties.get(key) != after.properties.get(key) {
                        changed.push(key.clone());
                    }
                }
                if before.depends_on != after.depends_on {
                    changed.push("DependsOn".to_string());
                }
                if before.deletion_policy != after.deletion_policy {
                    changed.push("DeletionPolicy".to_string());
                }
                if before.update_replace_policy != after.update_replace_policy {
                    changed.push("UpdateReplacePolicy".to_string());
                }
                let replacement = changed
                    .iter()
                    .any(|p| requires_replacement(&before.resource_type, p));
                changes.push(Change {
                    logical_id: id.clone(),
                    resource_type: after.resource_type.clone(),
                    kind: ChangeKind::Modified,
                    changed_properties: changed,
                    replacement,
                });
            }
            _ => {}
        }
    }

    let output_names: BTreeSet<&String> = old.outputs.keys().chain(new.outputs.keys()).collect();
    let outputs = output_names
        .into_iter()
        .filter(|name| old.outputs.get(*name) != new.outputs.get(*name))
        .cloned()
        .collect();

    ChangeSet { changes, outputs }
}
