// src/plan/graph.rs

//! Package dependency graph for install ordering
//!
//! Local packages are installed in editable mode, and a package's build step
//! imports its dependencies, so a package can only be installed after
//! everything it depends on. The graph carries one implicit edge per package:
//! every package depends on the foundational package (the lowest rank).
//!
//! # Example
//!
//! ```
//! use patchbay::plan::graph::PackageGraph;
//!
//! let mut graph = PackageGraph::new();
//! graph.add_package("server", 2, &["common", "broker"]);
//! graph.add_package("broker", 1, &[]);
//! graph.add_package("common", 0, &[]);
//!
//! let order = graph.install_order().unwrap();
//! assert_eq!(order, ["common", "broker", "server"]);
//! ```

use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A node in the package graph
#[derive(Debug, Clone)]
struct Node {
    rank: u32,
    /// Declaration index, the final tie-breaker
    index: usize,
}

/// A directed graph of local package dependencies
#[derive(Debug, Default)]
pub struct PackageGraph {
    nodes: HashMap<String, Node>,
    /// Key: package name, Value: packages it depends on
    edges: HashMap<String, HashSet<String>>,
    /// Key: package name, Value: packages that depend on it
    reverse_edges: HashMap<String, HashSet<String>>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package with its rank and explicit dependencies
    ///
    /// Adding the same name twice merges dependencies; the first rank wins.
    pub fn add_package(&mut self, name: &str, rank: u32, dependencies: &[&str]) {
        let index = self.nodes.len();
        self.nodes
            .entry(name.to_string())
            .or_insert(Node { rank, index });
        self.edges.entry(name.to_string()).or_default();
        self.reverse_edges.entry(name.to_string()).or_default();

        for dep in dependencies {
            self.edges
                .entry(name.to_string())
                .or_default()
                .insert(dep.to_string());
            self.reverse_edges
                .entry(dep.to_string())
                .or_default()
                .insert(name.to_string());
        }
    }

    /// The package with the lowest rank
    ///
    /// Errors when the graph is empty or when several packages share the
    /// lowest rank, since the foundational package must be unambiguous.
    pub fn foundational(&self) -> Result<&str> {
        let lowest = self
            .nodes
            .values()
            .map(|n| n.rank)
            .min()
            .ok_or_else(|| Error::InvalidPlan("plan declares no packages".to_string()))?;

        let mut candidates: Vec<(&String, &Node)> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.rank == lowest)
            .collect();
        candidates.sort_by_key(|(_, n)| n.index);

        if candidates.len() > 1 {
            let names: Vec<&str> = candidates.iter().map(|(name, _)| name.as_str()).collect();
            return Err(Error::InvalidPlan(format!(
                "ambiguous foundational package: {} share rank {}",
                names.join(", "),
                lowest
            )));
        }

        Ok(candidates[0].0.as_str())
    }

    /// Check that every dependency names a package in the graph
    pub fn validate(&self) -> Result<()> {
        let mut names: Vec<&String> = self.edges.keys().collect();
        names.sort();

        for name in names {
            let mut deps: Vec<&String> = self.edges[name].iter().collect();
            deps.sort();
            for dep in deps {
                if dep == name {
                    return Err(Error::InvalidPlan(format!(
                        "package '{}' depends on itself",
                        name
                    )));
                }
                if !self.nodes.contains_key(dep) {
                    return Err(Error::InvalidPlan(format!(
                        "package '{}' depends on unknown package '{}'",
                        name, dep
                    )));
                }
            }
        }

        Ok(())
    }

    /// Compute the install order using Kahn's algorithm
    ///
    /// The foundational package comes first; every other package follows
    /// its dependencies. Among packages that are ready at the same time the
    /// lower rank goes first, then the earlier declaration.
    pub fn install_order(&self) -> Result<Vec<String>> {
        self.validate()?;
        let foundational = self.foundational()?.to_string();

        let mut in_degrees: HashMap<&str, usize> = HashMap::new();
        for (name, deps) in &self.edges {
            let mut degree = deps.len();
            if *name != foundational && !deps.contains(&foundational) {
                degree += 1;
            }
            in_degrees.insert(name.as_str(), degree);
        }

        let key = |name: &str| {
            let node = &self.nodes[name];
            (node.rank, node.index, name.to_string())
        };

        let mut ready: BTreeSet<(u32, usize, String)> = in_degrees
            .iter()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(name, _)| key(name))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            let name = next.2;

            let mut released: Vec<&str> = self
                .reverse_edges
                .get(&name)
                .map(|deps| deps.iter().map(String::as_str).collect())
                .unwrap_or_default();

            if name == foundational {
                // Implicit edge: everything waits for the foundational package
                for other in self.nodes.keys() {
                    if *other != foundational && !self.edges[other].contains(&foundational) {
                        released.push(other.as_str());
                    }
                }
            }

            for dependent in released {
                if let Some(deg) = in_degrees.get_mut(dependent) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.insert(key(dependent));
                    }
                }
            }

            order.push(name);
        }

        if order.len() != self.nodes.len() {
            let mut remaining: Vec<&str> = self
                .nodes
                .keys()
                .filter(|k| !order.contains(k))
                .map(String::as_str)
                .collect();
            remaining.sort();

            return Err(Error::InvalidPlan(format!(
                "circular dependency between packages: {}",
                remaining.join(", ")
            )));
        }

        Ok(order)
    }
}
