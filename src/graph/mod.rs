//! Task graph: typed nodes with predecessor sets and structural readiness

mod dag;
mod node;

pub use dag::TaskGraph;
pub use node::{NodeId, NodeKind, NodeStatus, TaskNode};
