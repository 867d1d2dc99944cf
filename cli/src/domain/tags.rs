//! Application tagging: the tag set, the cross-cutting tagging pass, and the
//! tag-query resource group.

use serde_json::{Value, json};
use threetier_common::{ResourceDecl, Tag, resource_types as rt};

use crate::domain::config::ApplicationConfig;
use crate::domain::error::DeclarationError;
use crate::domain::topology::Topology;

/// Resource types that do not accept a `Tags` property.
const UNTAGGABLE: &[&str] = &[
    rt::GATEWAY_ATTACHMENT,
    rt::SUBNET_ROUTE_TABLE_ASSOCIATION,
    rt::ROUTE,
    rt::SECRET_ATTACHMENT,
    rt::POLICY,
    rt::INSTANCE_PROFILE,
    rt::EB_APPLICATION,
];

pub const RESOURCE_GROUP_ID: &str = "ResourceGroup";

/// Tags applied to every taggable resource in the stack. Later entries with
/// the same key replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    /// The application grouping tag (`Application=ThreeTierApp` by default).
    #[must_use]
    pub fn application(app: &ApplicationConfig) -> Self {
        let mut set = Self::default();
        set.insert(Tag::new(&app.tag_key, &app.tag_value));
        set
    }

    pub fn insert(&mut self, tag: Tag) {
        if let Some(existing) = self.tags.iter_mut().find(|t| t.key == tag.key) {
            existing.value = tag.value;
        } else {
            self.tags.push(tag);
        }
    }

    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[must_use]
pub fn supports_tags(resource_type: &str) -> bool {
    !UNTAGGABLE.contains(&resource_type)
}

/// Merge `tags` into one resource's `Tags` list, keeping tags it already
/// carries under other keys (e.g. `Name`).
///
/// # Errors
///
/// Returns `MalformedTags` if the resource already has a `Tags` property
/// that is not a list of `Key`/`Value` pairs.
pub fn tag_resource(
    logical_id: &str,
    decl: &mut ResourceDecl,
    tags: &TagSet,
) -> Result<(), DeclarationError> {
    if !supports_tags(&decl.resource_type) || tags.is_empty() {
        return Ok(());
    }
    let mut merged: Vec<Tag> = match decl.properties.get("Tags") {
        None => Vec::new(),
        Some(existing) => serde_json::from_value(existing.clone()).map_err(|_| {
            DeclarationError::MalformedTags {
                logical_id: logical_id.to_string(),
            }
        })?,
    };
    for tag in tags.tags() {
        if let Some(existing) = merged.iter_mut().find(|t| t.key == tag.key) {
            existing.value.clone_from(&tag.value);
        } else {
            merged.push(tag.clone());
        }
    }
    merged.sort();
    let list: Vec<Value> = merged
        .iter()
        .map(|t| json!({ "Key": t.key, "Value": t.value }))
        .collect();
    decl.properties.insert("Tags".to_string(), Value::Array(list));
    Ok(())
}

/// The tagging pass: applied to every declared resource after construction.
///
/// # Errors
///
/// Returns the first `MalformedTags` error encountered.
pub fn apply_tags(topology: &mut Topology, tags: &TagSet) -> Result<(), DeclarationError> {
    for (logical_id, decl) in topology.resources_mut() {
        tag_resource(logical_id, decl, tags)?;
    }
    Ok(())
}

/// Whether a resource carries `key=value` in its `Tags` list.
#[must_use]
pub fn has_tag(decl: &ResourceDecl, key: &str, value: &str) -> bool {
    decl.properties
        .get("Tags")
        .and_then(Value::as_array)
        .is_some_and(|list| {
            list.iter()
                .any(|t| t.get("Key") == Some(&json!(key)) && t.get("Value") == Some(&json!(value)))
        })
}

/// Declare the resource group that collects every resource carrying the
/// application tag.
///
/// # Errors
///
/// Returns an error if the logical id is already taken.
pub fn declare_resource_group(
    topology: &mut Topology,
    app: &ApplicationConfig,
) -> Result<(), DeclarationError> {
    let decl = ResourceDecl::new(rt::RESOURCE_GROUP)
        .with_property("Name", app.resource_group_name.as_str())
        .with_property(
            "ResourceQuery",
            json!({
                "Type": "TAG_FILTERS_1_0",
                "Query": {
                    "TagFilters": [
                        { "Key": app.tag_key, "Values": [app.tag_value] }
                    ]
                }
            }),
        );
    topology.declare(RESOURCE_GROUP_ID, decl)?;
    Ok(())
}
