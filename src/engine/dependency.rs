// ABOUTME: Static dependency graph over plan steps built on petgraph
// ABOUTME: Finds dangling edges and cycles and layers acyclic plans into parallel batches

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use super::error::DependencyError;
use crate::plan::{Plan, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingEdge {
    pub step_id: String,
    pub missing: String,
}

pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    step_indices: HashMap<String, NodeIndex>,
    dangling: Vec<DanglingEdge>,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub batches: Vec<Vec<String>>,
    pub total_steps: usize,
}

impl DependencyGraph {
    pub fn from_plan(plan: &Plan) -> Self {
        Self::from_steps(plan.steps())
    }

    /// Build a graph over an arbitrary subset of steps. Dependencies on steps
    /// outside the subset are recorded as dangling edges.
    pub fn from_steps<'a, I>(steps: I) -> Self
    where
        I: IntoIterator<Item = &'a Step>,
    {
        let steps: Vec<&Step> = steps.into_iter().collect();
        let mut graph = DiGraph::new();
        let mut step_indices = HashMap::new();

        for step in &steps {
            let node = graph.add_node(step.id.clone());
            step_indices.insert(step.id.clone(), node);
        }

        let mut dangling = Vec::new();
        for step in &steps {
            let step_node = step_indices[&step.id];
            for dependency in &step.dependencies {
                match step_indices.get(dependency) {
                    // Edge runs dependency -> dependent; update_edge keeps it single.
                    Some(&dep_node) => {
                        graph.update_edge(dep_node, step_node, ());
                    }
                    None => dangling.push(DanglingEdge {
                        step_id: step.id.clone(),
                        missing: dependency.clone(),
                    }),
                }
            }
        }

        Self {
            graph,
            step_indices,
            dangling,
        }
    }

    pub fn step_count(&self) -> usize {
        self.step_indices.len()
    }

    pub fn dangling_edges(&self) -> &[DanglingEdge] {
        &self.dangling
    }

    /// Every dependency cycle, as sorted member lists. Self-dependencies count.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut members: Vec<String> = component
                    .into_iter()
                    .map(|node| self.graph[node].clone())
                    .collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Layer an acyclic, fully resolved graph into batches whose members do
    /// not depend on each other. Batches keep the steps' input order.
    pub fn create_execution_plan(&self) -> Result<ExecutionPlan, DependencyError> {
        if let Some(edge) = self.dangling.first() {
            return Err(DependencyError::DanglingDependency {
                step_id: edge.step_id.clone(),
                missing: edge.missing.clone(),
            });
        }

        if toposort(&self.graph, None).is_err() {
            return Err(DependencyError::CircularDependency {
                cycles: self.cycles(),
            });
        }

        Ok(ExecutionPlan {
            batches: self.create_execution_batches(),
            total_steps: self.step_count(),
        })
    }

    fn create_execution_batches(&self) -> Vec<Vec<String>> {
        let mut batches = Vec::new();
        let mut done: HashSet<NodeIndex> = HashSet::new();
        // Node indices follow insertion order, which is the plan's input order.
        let mut remaining: Vec<NodeIndex> = self.graph.node_indices().collect();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<NodeIndex>, Vec<NodeIndex>) =
                remaining.into_iter().partition(|&node| {
                    self.graph
                        .neighbors_directed(node, Direction::Incoming)
                        .all(|dep| done.contains(&dep))
                });

            if ready.is_empty() {
                break;
            }

            done.extend(ready.iter().copied());
            batches.push(ready.into_iter().map(|n| self.graph[n].clone()).collect());
            remaining = blocked;
        }

        batches
    }

    /// Steps with no resolvable dependencies, in input order.
    pub fn get_root_steps(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&node| {
                self.graph
                    .neighbors_directed(node, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|node| self.graph[node].clone())
            .collect()
    }
}

impl ExecutionPlan {
    pub fn max_parallelism(&self) -> usize {
        self.batches.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn execution_depth(&self) -> usize {
        self.batches.len()
    }

    pub fn batch_index_of(&self, step_id: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|id| id == step_id))
    }
}
