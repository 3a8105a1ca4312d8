use crate::depth::node_depths;
use crate::graph::GraphModel;
use graphscape_core::{DagMode, LayoutConfig, LayoutMode};
use serde::{Deserialize, Serialize};

const TREE_NODE_LIMIT: usize = 150;
const SPARSE_DAG_NODE_LIMIT: usize = 60;
const SPARSE_DAG_MAX_DENSITY: f64 = 0.15;
const LARGE_GRAPH_NODES: usize = 1500;

/// Advisory layout choice derived from the graph's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecommendation {
    pub mode: LayoutMode,
    pub dag_mode: Option<DagMode>,
    pub barnes_hut: bool,
    pub reason: String,
}

impl LayoutRecommendation {
    fn new(mode: LayoutMode, dag_mode: Option<DagMode>, barnes_hut: bool, reason: impl Into<String>) -> Self {
        Self {
            mode,
            dag_mode,
            barnes_hut,
            reason: reason.into(),
        }
    }

    /// Overwrite the layout selection of `config`, leaving tuning fields alone.
    pub fn apply_to(&self, config: &mut LayoutConfig) {
        config.mode = self.mode;
        config.dag_mode = self.dag_mode;
        config.barnes_hut_optimize = self.barnes_hut;
    }
}

/// Directed density `E / (N * (N - 1))`.
fn density(model: &GraphModel) -> f64 {
    let n = model.node_count() as f64;
    if n < 2.0 {
        return 0.0;
    }
    model.edge_count() as f64 / (n * (n - 1.0))
}

pub fn recommend_layout(model: &GraphModel) -> LayoutRecommendation {
    let n = model.node_count();
    if n == 0 {
        return LayoutRecommendation::new(LayoutMode::Physics, None, false, "empty graph");
    }
    if model.edge_count() == 0 {
        return LayoutRecommendation::new(
            LayoutMode::Circular,
            None,
            false,
            format!("{n} nodes without edges"),
        );
    }

    let acyclic = !node_depths(model).invalid;
    let tree_shaped = model.node_indices().all(|idx| model.in_degree(idx) <= 1);
    let density = density(model);

    if acyclic && tree_shaped && n <= TREE_NODE_LIMIT {
        return LayoutRecommendation::new(
            LayoutMode::Hierarchical,
            Some(DagMode::Td),
            false,
            format!("tree with {n} nodes"),
        );
    }
    if acyclic && n <= SPARSE_DAG_NODE_LIMIT && density <= SPARSE_DAG_MAX_DENSITY {
        return LayoutRecommendation::new(
            LayoutMode::Hierarchical,
            Some(DagMode::Lr),
            false,
            format!("sparse DAG with {n} nodes (density {density:.3})"),
        );
    }
    if n > LARGE_GRAPH_NODES {
        return LayoutRecommendation::new(
            LayoutMode::Physics,
            None,
            true,
            format!("{n} nodes; approximating repulsion with Barnes-Hut"),
        );
    }
    let shape = if acyclic { "DAG" } else { "cyclic graph" };
    LayoutRecommendation::new(
        LayoutMode::Physics,
        None,
        false,
        format!("{shape} with {n} nodes (density {density:.3})"),
    )
}
