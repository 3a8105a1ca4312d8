//! One-shot layout: build, size, lay out, cluster and filter a graph input.

use crate::cluster::{ClusterGroup, ClusterKey, ClusterResolver};
use crate::collapse::{CollapseResolver, VisibleEntities};
use crate::graph::{DroppedEdge, GraphModel};
use crate::layout::{
    Layout, LayoutKind, LayoutRunner, NoOverlapOutcome, PositionProvider, RunStats,
};
use crate::sizing::{SizingOptions, apply_sizes, node_sizes};
use graphscape_core::{ConfigError, EdgeId, GraphInput, LayoutConfig, NodeId, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOutput {
    pub layout: LayoutKind,
    pub positions: BTreeMap<NodeId, Vec3>,
    pub sizes: BTreeMap<NodeId, f32>,
    pub curve_offsets: BTreeMap<EdgeId, f32>,
    pub clusters: Vec<ClusterGroup>,
    pub visible: VisibleEntities,
    pub dropped_edges: Vec<DroppedEdge>,
    pub stats: RunStats,
    /// Set when the overlap post-pass ran.
    pub overlap: Option<NoOverlapOutcome>,
}

pub fn compute_layout(
    input: GraphInput,
    config: &LayoutConfig,
    collapsed: &[NodeId],
) -> Result<LayoutOutput, ConfigError> {
    run_pipeline(input, config, collapsed, None)
}

/// Same as [`compute_layout`] with caller-supplied positions for `custom` mode.
pub fn compute_custom_layout(
    input: GraphInput,
    config: &LayoutConfig,
    collapsed: &[NodeId],
    provider: &dyn PositionProvider,
) -> Result<LayoutOutput, ConfigError> {
    run_pipeline(input, config, collapsed, Some(provider))
}

fn run_pipeline(
    input: GraphInput,
    config: &LayoutConfig,
    collapsed: &[NodeId],
    provider: Option<&dyn PositionProvider>,
) -> Result<LayoutOutput, ConfigError> {
    config.validate()?;
    let (mut model, report) = GraphModel::build(input.nodes, input.edges);

    let sizes = node_sizes(&model, &SizingOptions::from_config(config));
    apply_sizes(&mut model, &sizes);

    let layout = match provider {
        Some(provider) => Layout::custom(&model, config, provider)?,
        None => Layout::from_config(&model, config)?,
    };
    let kind = layout.kind();
    let mut runner = LayoutRunner::new(layout, config);
    let stats = runner.run();
    let overlap = runner.layout().overlap_outcome();
    runner.apply(&mut model);

    let clusters = match &config.cluster_attribute {
        Some(attribute) => ClusterResolver::new(ClusterKey::Attribute(attribute.clone()))
            .with_padding(config.cluster_padding)
            .clusters(&model)
            .to_vec(),
        None => Vec::new(),
    };
    let visible = CollapseResolver::new(collapsed.iter().cloned()).visible_entities(&model);

    Ok(LayoutOutput {
        layout: kind,
        positions: model
            .nodes()
            .iter()
            .filter_map(|n| Some((n.id.clone(), n.position?)))
            .collect(),
        sizes: model.nodes().iter().map(|n| (n.id.clone(), n.size)).collect(),
        curve_offsets: model
            .edges()
            .iter()
            .filter_map(|e| Some((e.id.clone(), e.curve_offset?)))
            .collect(),
        clusters,
        visible,
        dropped_edges: report.dropped_edges,
        stats,
        overlap,
    })
}
