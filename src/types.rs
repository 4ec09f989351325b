/// Identifier for a node in a [`crate::graph::GrowthGraph`].
///
/// This is an index into `GrowthGraph::nodes`, and is only meaningful
/// within the lifetime of a given graph instance.
pub type NodeId = usize;
