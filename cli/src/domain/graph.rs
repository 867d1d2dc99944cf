//! Reference graph of a synthesized template.
//!
//! Edges come only from intrinsic references and explicit `DependsOn`:
//! `A` references `B` means `B` is provisioned before `A`. Declaration order
//! plays no part.

use std::collections::{BTreeMap, BTreeSet};

use threetier_common::Template;

use crate::domain::error::TopologyError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// id -> ids it depends on (only ids declared in the template).
    dependencies: BTreeMap<String, BTreeSet<String>>,
    /// id -> ids that depend on it.
    dependents: BTreeMap<String, BTreeSet<String>>,
    /// (from, to) pairs whose target is not declared.
    dangling: Vec<(String, String)>,
}

impl DependencyGraph {
    #[must_use]
    pub fn from_template(template: &Template) -> Self {
        let mut graph = Self::default();
        for id in template.resources.keys() {
            graph.dependencies.entry(id.clone()).or_default();
            graph.dependents.entry(id.clone()).or_default();
        }
        for (id, decl) in &template.resources {
            for dep in decl.dependencies() {
                if template.resources.contains_key(&dep) {
                    graph.dependents.entry(dep.clone()).or_default().insert(id.clone());
                    graph.dependencies.entry(id.clone()).or_default().insert(dep);
                } else {
                    graph.dangling.push((id.clone(), dep));
                }
            }
        }
        for output in template.outputs.values() {
            for dep in threetier_common::references(&output.value) {
                if !template.resources.contains_key(&dep) {
                    graph.dangling.push(("Outputs".to_string(), dep));
                }
            }
        }
        graph
    }

    /// References to undeclared logical ids.
    #[must_use]
    pub fn dangling(&self) -> Vec<TopologyError> {
        self.dangling
            .iter()
            .map(|(from, to)| TopologyError::Dangling {
                from: from.clone(),
                to: to.clone(),
            })
            .collect()
    }

    /// Kahn's algorithm over a sorted ready set, so ties resolve by logical id
    /// and the order is stable across runs.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::Cycle` naming every resource left unordered.
    pub fn provisioning_order(&self) -> Result<Vec<String>, TopologyError> {
        Ok(self.layers()?.into_iter().flatten().collect())
    }

    /// Reverse of the provisioning order: dependents go first.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::Cycle` when the graph has a cycle.
    pub fn teardown_order(&self) -> Result<Vec<String>, TopologyError> {
        let mut order = self.provisioning_order()?;
        order.reverse();
        Ok(order)
    }

    /// Groups of resources whose dependencies are all in earlier groups.
    /// Members of one layer are independent of each other.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::Cycle` when the graph has a cycle.
    pub fn layers(&self) -> Result<Vec<Vec<String>>, TopologyError> {
        let mut remaining: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|&(_, n)| *n == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut layers = Vec::new();

        while !ready.is_empty() {
            let layer: Vec<&str> = ready.iter().copied().collect();
            ready.clear();
            for id in &layer {
                remaining.remove(id);
                for dependent in self.dependents.get(*id).into_iter().flatten() {
                    if let Some(n) = remaining.get_mut(dependent.as_str()) {
                        *n -= 1;
                        if *n == 0 {
                            ready.insert(dependent.as_str());
                        }
                    }
                }
            }
            layers.push(layer.into_iter().map(str::to_string).collect());
        }

        if remaining.is_empty() {
            Ok(layers)
        } else {
            Err(TopologyError::Cycle(
                remaining.keys().map(|s| (*s).to_string()).collect(),
            ))
        }
    }

    /// Direct dependencies of `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if `id` is not declared.
    pub fn dependencies_of(&self, id: &str) -> Result<&BTreeSet<String>, TopologyError> {
        self.dependencies
            .get(id)
            .ok_or_else(|| TopologyError::UnknownResource(id.to_string()))
    }

    /// Direct dependents of `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if `id` is not declared.
    pub fn dependents_of(&self, id: &str) -> Result<&BTreeSet<String>, TopologyError> {
        self.dependents
            .get(id)
            .ok_or_else(|| TopologyError::UnknownResource(id.to_string()))
    }

    /// Every resource `id` transitively depends on.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = vec![id];
        while let Some(current) = stack.pop() {
            for dep in self.dependencies.get(current).into_iter().flatten() {
                if seen.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }
        seen
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
