use std::collections::BTreeSet;
use std::fmt;

/// Index of a node inside its [`TaskGraph`](super::TaskGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document available; no predecessors
    Source,
    /// Evaluates `criteria[criterion]`
    Branch { criterion: usize },
    /// Reduces the scored state into the final result
    Aggregate,
    /// Marks the run complete
    Terminal,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => write!(f, "source"),
            NodeKind::Branch { .. } => write!(f, "branch"),
            NodeKind::Aggregate => write!(f, "aggregate"),
            NodeKind::Terminal => write!(f, "terminal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl NodeStatus {
    /// `Pending → Running → Done | Failed`, nothing else
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Running, NodeStatus::Done)
                | (NodeStatus::Running, NodeStatus::Failed)
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Done => write!(f, "done"),
            NodeStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub predecessors: BTreeSet<NodeId>,
}

impl TaskNode {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            predecessors: BTreeSet::new(),
        }
    }

    pub fn after(mut self, predecessors: impl IntoIterator<Item = NodeId>) -> Self {
        self.predecessors.extend(predecessors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use NodeStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Done));
        assert!(Running.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Done));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Done.can_transition_to(Failed));
    }
}
