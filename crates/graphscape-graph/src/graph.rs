use crate::edge_router::assign_curve_offsets;
use graphscape_core::{EdgeId, EdgeInput, NodeId, NodeInput, Pin, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

// Shared across models so a revision never repeats after a rebuild.
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub parents: Vec<NodeId>,
    pub data: serde_json::Value,
    pub label: Option<String>,

    // Computed by sizing and layout
    pub size: f32,
    pub position: Option<Vec3>,
    pub pin: Pin,
}

impl GraphNode {
    pub const DEFAULT_SIZE: f32 = 7.0;

    fn from_input(input: NodeInput) -> Self {
        Self {
            id: input.id,
            parents: input.parents,
            data: input.data,
            label: input.label,
            size: Self::DEFAULT_SIZE,
            position: None,
            pin: Pin::NONE,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.as_object().and_then(|fields| fields.get(name))
    }

    /// The attribute rendered as a grouping label. Strings are used verbatim,
    /// numbers and booleans are stringified, anything else is ignored.
    pub fn attribute_label(&self, name: &str) -> Option<String> {
        match self.attribute(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The attribute as a number, accepting numeric strings.
    pub fn attribute_number(&self, name: &str) -> Option<f64> {
        match self.attribute(name)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: Option<f32>,
    /// Lateral offset for edges sharing endpoints with a sibling; `None` otherwise.
    pub curve_offset: Option<f32>,
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    MissingSource,
    MissingTarget,
    MissingBoth,
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedEdge {
    pub id: EdgeId,
    pub reason: DropReason,
}

/// Problems found while normalizing input. None of them are fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub dropped_edges: Vec<DroppedEdge>,
    pub duplicate_nodes: Vec<NodeId>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_edges.is_empty() && self.duplicate_nodes.is_empty()
    }
}

/// Arena of nodes and edges with directed adjacency indices.
#[derive(Debug, Clone)]
pub struct GraphModel {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_map: HashMap<NodeId, NodeIndex>,
    edge_map: HashMap<EdgeId, EdgeIndex>,
    incoming: Vec<Vec<NodeIndex>>,
    outgoing: Vec<Vec<NodeIndex>>,
    revision: u64,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            node_map: HashMap::new(),
            edge_map: HashMap::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            revision: next_revision(),
        }
    }

    /// Normalize caller input into a fresh model. Positions are not carried over
    /// from any previous model.
    pub fn build(nodes: Vec<NodeInput>, edges: Vec<EdgeInput>) -> (Self, BuildReport) {
        let mut model = Self::new();
        let mut report = BuildReport::default();
        model.insert_nodes(nodes, &mut report);
        model.insert_edges(edges, &mut report);
        assign_curve_offsets(&mut model.edges);
        (model, report)
    }

    /// Add nodes to an existing model, keeping the positions already computed.
    pub fn add_nodes(&mut self, nodes: Vec<NodeInput>) -> BuildReport {
        let mut report = BuildReport::default();
        self.insert_nodes(nodes, &mut report);
        self.revision = next_revision();
        report
    }

    /// Add edges to an existing model, keeping the positions already computed.
    pub fn add_edges(&mut self, edges: Vec<EdgeInput>) -> BuildReport {
        let mut report = BuildReport::default();
        self.insert_edges(edges, &mut report);
        assign_curve_offsets(&mut self.edges);
        self.revision = next_revision();
        report
    }

    fn insert_nodes(&mut self, nodes: Vec<NodeInput>, report: &mut BuildReport) {
        for input in nodes {
            if self.node_map.contains_key(&input.id) {
                tracing::warn!("Ignoring duplicate node id {}", input.id);
                report.duplicate_nodes.push(input.id);
                continue;
            }
            let idx = NodeIndex(self.nodes.len());
            self.node_map.insert(input.id.clone(), idx);
            self.nodes.push(GraphNode::from_input(input));
            self.incoming.push(Vec::new());
            self.outgoing.push(Vec::new());
        }
    }

    fn insert_edges(&mut self, edges: Vec<EdgeInput>, report: &mut BuildReport) {
        for input in edges {
            if self.edge_map.contains_key(&input.id) {
                tracing::warn!("Dropping edge {} because its id is already in use", input.id);
                report.dropped_edges.push(DroppedEdge {
                    id: input.id,
                    reason: DropReason::DuplicateId,
                });
                continue;
            }

            let source = self.node_map.get(&input.source).copied();
            let target = self.node_map.get(&input.target).copied();
            let (src, tgt) = match (source, target) {
                (Some(src), Some(tgt)) => (src, tgt),
                (source, target) => {
                    let reason = match (source, target) {
                        (None, None) => DropReason::MissingBoth,
                        (None, _) => DropReason::MissingSource,
                        _ => DropReason::MissingTarget,
                    };
                    tracing::warn!(
                        "Dropping edge {} ({} -> {}): {:?}",
                        input.id,
                        input.source,
                        input.target,
                        reason
                    );
                    report.dropped_edges.push(DroppedEdge {
                        id: input.id,
                        reason,
                    });
                    continue;
                }
            };

            let idx = EdgeIndex(self.edges.len());
            self.edge_map.insert(input.id.clone(), idx);
            self.outgoing[src.0].push(tgt);
            self.incoming[tgt.0].push(src);
            self.edges.push(GraphEdge {
                id: input.id,
                source: input.source,
                target: input.target,
                weight: input.weight,
                curve_offset: None,
                source_idx: src,
                target_idx: tgt,
            });
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + use<> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> + use<> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index_of(id).map(|idx| &self.nodes[idx.0])
    }

    pub fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
        self.node_map.get(id).map(|&idx| &mut self.nodes[idx.0])
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&GraphEdge> {
        self.edge_map.get(id).map(|&idx| &self.edges[idx.0])
    }

    pub fn incoming(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.incoming[idx.0]
    }

    pub fn outgoing(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.outgoing[idx.0]
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.incoming[idx.0].len()
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.outgoing[idx.0].len()
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.in_degree(idx) + self.out_degree(idx)
    }

    /// Parent ids of a node that resolve to nodes in this model, in listed order.
    pub fn parents_of(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes[idx.0]
            .parents
            .iter()
            .filter_map(|parent| self.node_map.get(parent).copied())
    }

    /// Changes every time positions or structure change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn position(&self, idx: NodeIndex) -> Option<Vec3> {
        self.nodes[idx.0].position
    }

    pub fn set_positions<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = (NodeIndex, Vec3)>,
    {
        for (idx, pos) in positions {
            if let Some(node) = self.nodes.get_mut(idx.0) {
                node.position = Some(pos);
            }
        }
        self.revision = next_revision();
    }

    pub fn set_size(&mut self, idx: NodeIndex, size: f32) {
        self.nodes[idx.0].size = size;
        self.revision = next_revision();
    }

    /// Record a drag override; layouts built afterwards honour it.
    pub fn pin_node(&mut self, id: &NodeId, pin: Pin) -> bool {
        match self.get_node_mut(id) {
            Some(node) => {
                node.pin = pin;
                true
            }
            None => false,
        }
    }
}

impl Index<NodeIndex> for GraphModel {
    type Output = GraphNode;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<NodeIndex> for GraphModel {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

impl Index<EdgeIndex> for GraphModel {
    type Output = GraphEdge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}
