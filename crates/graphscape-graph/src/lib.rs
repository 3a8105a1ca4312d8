pub mod cancellation;
pub mod cluster;
pub mod collapse;
pub mod depth;
pub mod edge_router;
pub mod graph;
pub mod layout;
pub mod paths;
pub mod pipeline;
pub mod sizing;

pub use cancellation::CancellationToken;
pub use cluster::{ClusterGroup, ClusterKey, ClusterResolver, convex_hull};
pub use collapse::{CollapseResolver, VisibleEntities};
pub use depth::{DepthMap, node_depths};
pub use edge_router::{CURVE_OFFSET_STEP, assign_curve_offsets, curve_offset, parallel_groups};
pub use graph::{
    BuildReport, DropReason, DroppedEdge, EdgeIndex, GraphEdge, GraphModel, GraphNode, NodeIndex,
};
pub use layout::{
    CircularLayout, ConcentricLayout, CustomLayout, ForceLayout, ForceParams, HierarchicalLayout,
    Layout, LayoutKind, LayoutRecommendation, LayoutRunner, LayoutStrategy, NoOverlapLayout,
    NoOverlapOptions, NoOverlapOutcome, PositionProvider, PositionTable, RunStats,
    recommend_layout, remove_overlaps,
};
pub use paths::shortest_path;
pub use pipeline::{LayoutOutput, compute_custom_layout, compute_layout};
pub use sizing::{
    MIN_SIZE_FLOOR, SizingOptions, apply_sizes, betweenness_centrality, degree_centrality,
    node_sizes, pagerank,
};
