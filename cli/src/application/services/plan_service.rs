//! Application service: provisioning and teardown plans.

use anyhow::Result;
use serde::Serialize;
use threetier_common::Template;

use crate::domain::error::TopologyError;
use crate::domain::graph::DependencyGraph;

/// One resource in provisioning order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub position: usize,
    pub logical_id: String,
    pub resource_type: String,
    pub depends_on: Vec<String>,
    /// Index of the layer this step belongs to; steps sharing a layer are
    /// independent.
    pub layer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub provisioning: Vec<PlanStep>,
    pub teardown: Vec<String>,
    pub layers: usize,
}

impl Plan {
    /// Logical ids in provisioning order.
    #[must_use]
    pub fn order(&self) -> Vec<String> {
        self.provisioning.iter().map(|s| s.logical_id.clone()).collect()
    }
}

/// Derive the plan purely from the template's reference graph.
///
/// # Errors
///
/// Returns an error on dangling references or cycles.
pub fn plan(template: &Template) -> Result<Plan> {
    let graph = DependencyGraph::from_template(template);
    if let Some(first) = graph.dangling().into_iter().next() {
        return Err(first.into());
    }
    let layers = graph.layers()?;

    let mut provisioning = Vec::with_capacity(graph.len());
    for (layer_index, layer) in layers.iter().enumerate() {
        for id in layer {
            let decl = template
                .resource(id)
                .ok_or_else(|| TopologyError::UnknownResource(id.clone()))?;
            provisioning.push(PlanStep {
                position: provisioning.len() + 1,
                logical_id: id.clone(),
                resource_type: decl.resource_type.clone(),
                depends_on: graph.dependencies_of(id)?.iter().cloned().collect(),
                layer: layer_index,
            });
        }
    }
    let mut teardown: Vec<String> = provisioning.iter().map(|s| s.logical_id.clone()).collect();
    teardown.reverse();

    tracing::debug!(steps = provisioning.len(), layers = layers.len(), "plan computed");
    Ok(Plan {
        provisioning,
        teardown,
        layers: layers.len(),
    })
}
