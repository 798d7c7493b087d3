use super::node::{NodeId, NodeKind, NodeStatus, TaskNode};
use crate::document::Document;
use crate::engine::Criterion;
use crate::error::ConfigurationError;
use std::collections::HashSet;

/// Immutable DAG for one invocation
///
/// Edges live on the nodes as predecessor sets. A node is ready once every predecessor is
/// `Done`; nothing about the fan-out/fan-in shape is hardcoded outside [`TaskGraph::build`].
#[derive(Debug, Clone)]
pub struct TaskGraph {
    document: Document,
    criteria: Vec<Criterion>,
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    /// Source → one branch per criterion → aggregate → terminal
    pub fn build(document: Document, criteria: &[Criterion]) -> Result<Self, ConfigurationError> {
        check_criteria(criteria)?;

        let source = NodeId(0);
        let mut nodes = vec![TaskNode::new(source, "source", NodeKind::Source)];

        let branches: Vec<NodeId> = (0..criteria.len()).map(|i| NodeId(i + 1)).collect();
        for (idx, criterion) in criteria.iter().enumerate() {
            nodes.push(
                TaskNode::new(
                    branches[idx],
                    criterion.id(),
                    NodeKind::Branch { criterion: idx },
                )
                .after([source]),
            );
        }

        let aggregate = NodeId(criteria.len() + 1);
        nodes.push(
            TaskNode::new(aggregate, "aggregate", NodeKind::Aggregate)
                .after(branches.iter().copied()),
        );

        let terminal = NodeId(criteria.len() + 2);
        nodes.push(TaskNode::new(terminal, "end", NodeKind::Terminal).after([aggregate]));

        Self::from_nodes(document, criteria.to_vec(), nodes)
    }

    /// Arbitrary DAG
    ///
    /// Node ids must equal their position and predecessors must exist, with no cycles. Every
    /// criterion needs exactly one branch, and every branch must precede the single aggregate
    /// node.
    pub fn from_nodes(
        document: Document,
        criteria: Vec<Criterion>,
        nodes: Vec<TaskNode>,
    ) -> Result<Self, ConfigurationError> {
        for (position, node) in nodes.iter().enumerate() {
            if node.id != NodeId(position) {
                return Err(ConfigurationError::NodeIdMismatch {
                    position,
                    id: node.id.0,
                });
            }
            if let Some(missing) = node.predecessors.iter().find(|p| p.0 >= nodes.len()) {
                return Err(ConfigurationError::UnknownPredecessor {
                    node: node.name.clone(),
                    predecessor: missing.0,
                });
            }
        }

        let graph = Self {
            document,
            criteria,
            nodes,
        };
        graph.topological_levels()?;
        check_criteria(&graph.criteria)?;
        graph.check_branches()?;
        Ok(graph)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &TaskNode {
        &self.nodes[id.0]
    }

    pub fn branch_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Branch { .. }))
            .count()
    }

    /// Every `Pending` node whose predecessors are all `Done`
    pub fn ready_nodes(&self, statuses: &[NodeStatus]) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| statuses[n.id.0] == NodeStatus::Pending)
            .filter(|n| {
                n.predecessors
                    .iter()
                    .all(|p| statuses[p.0] == NodeStatus::Done)
            })
            .map(|n| n.id)
            .collect()
    }

    fn check_branches(&self) -> Result<(), ConfigurationError> {
        let aggregates: Vec<&TaskNode> = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Aggregate)
            .collect();
        let aggregate = match aggregates.as_slice() {
            [aggregate] => *aggregate,
            other => return Err(ConfigurationError::AggregateCount(other.len())),
        };
        let guarded = self.ancestors(aggregate.id);

        let mut covered = vec![false; self.criteria.len()];
        for node in &self.nodes {
            let NodeKind::Branch { criterion } = node.kind else {
                continue;
            };
            let slot = covered
                .get_mut(criterion)
                .ok_or_else(|| ConfigurationError::UnknownCriterion {
                    node: node.name.clone(),
                    criterion,
                })?;
            if *slot {
                return Err(ConfigurationError::DuplicateBranch(
                    self.criteria[criterion].id().to_string(),
                ));
            }
            *slot = true;

            if !guarded.contains(&node.id) {
                return Err(ConfigurationError::UnguardedBranch(node.name.clone()));
            }
        }

        if let Some(idx) = covered.iter().position(|c| !c) {
            return Err(ConfigurationError::MissingBranch(
                self.criteria[idx].id().to_string(),
            ));
        }
        Ok(())
    }

    /// Every node `id` transitively depends on
    fn ancestors(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = self.node(id).predecessors.iter().copied().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.node(next).predecessors.iter().copied());
            }
        }
        seen
    }

    /// Kahn's algorithm, grouped so that each level only depends on earlier levels
    pub fn topological_levels(&self) -> Result<Vec<Vec<NodeId>>, ConfigurationError> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.predecessors.len()).collect();
        let mut current: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.predecessors.is_empty())
            .map(|n| n.id)
            .collect();

        let mut levels = Vec::new();
        let mut visited = 0;

        while !current.is_empty() {
            visited += current.len();
            let mut next = Vec::new();
            for node in &self.nodes {
                let hits = node
                    .predecessors
                    .iter()
                    .filter(|p| current.contains(p))
                    .count();
                if hits > 0 {
                    in_degree[node.id.0] -= hits;
                    if in_degree[node.id.0] == 0 {
                        next.push(node.id);
                    }
                }
            }
            levels.push(std::mem::replace(&mut current, next));
        }

        if visited < self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .find(|n| in_degree[n.id.0] > 0)
                .map(|n| n.name.clone())
                .unwrap_or_default();
            return Err(ConfigurationError::Cycle(stuck));
        }

        Ok(levels)
    }
}

fn check_criteria(criteria: &[Criterion]) -> Result<(), ConfigurationError> {
    if criteria.is_empty() {
        return Err(ConfigurationError::NoCriteria);
    }

    let mut seen = HashSet::new();
    for criterion in criteria {
        if !seen.insert(criterion.id()) {
            return Err(ConfigurationError::DuplicateCriterion(
                criterion.id().to_string(),
            ));
        }
    }
    Ok(())
}
