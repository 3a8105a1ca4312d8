pub mod barnes_hut;
pub mod circular;
pub mod custom;
pub mod force;
pub mod hierarchical;
pub mod no_overlap;
pub mod recommend;
pub mod runner;

use crate::depth::node_depths;
use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::{ConfigError, LayoutConfig, LayoutMode, NodeId, Pin, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use circular::{CircularLayout, ConcentricLayout};
pub use custom::{CustomLayout, PositionProvider};
pub use force::{ForceLayout, ForceParams};
pub use hierarchical::HierarchicalLayout;
pub use no_overlap::{NoOverlapLayout, NoOverlapOptions, NoOverlapOutcome, remove_overlaps};

use no_overlap::LayoutConstraints;
pub use recommend::{LayoutRecommendation, recommend_layout};
pub use runner::{LayoutRunner, RunStats};

/// Positions owned by one layout run, addressed by arena index or node id.
#[derive(Debug, Clone, Default)]
pub struct PositionTable {
    ids: Vec<NodeId>,
    lookup: HashMap<NodeId, usize>,
    positions: Vec<Vec3>,
}

impl PositionTable {
    pub fn from_model(model: &GraphModel, positions: Vec<Vec3>) -> Self {
        debug_assert_eq!(positions.len(), model.node_count());
        let ids: Vec<NodeId> = model.nodes().iter().map(|n| n.id.clone()).collect();
        let lookup = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            ids,
            lookup,
            positions,
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<Vec3> {
        self.lookup.get(id).map(|&i| self.positions[i])
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Vec3)> + '_ {
        self.ids.iter().zip(self.positions.iter().copied())
    }

    /// Pairs ready for `GraphModel::set_positions`.
    pub fn indexed(&self) -> impl Iterator<Item = (NodeIndex, Vec3)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, p)| (NodeIndex(i), *p))
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }
}

/// Shared contract of every layout algorithm.
///
/// `step` performs one bounded unit of work and returns `true` while the layout
/// is still converging. Positions read after a step reflect exactly that step.
pub trait LayoutStrategy {
    fn step(&mut self) -> bool;

    fn positions(&self) -> &PositionTable;

    fn node_position(&self, id: &NodeId) -> Option<Vec3> {
        self.positions().get(id)
    }

    /// Hold some or all axes of a node fixed (a drag). Closed-form layouts ignore it.
    fn pin(&mut self, _id: &NodeId, _pin: Pin) {}

    fn unpin(&mut self, _id: &NodeId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Force,
    Hierarchical,
    Circular,
    Concentric,
    Custom,
}

pub enum Layout {
    Force(ForceLayout),
    Hierarchical(HierarchicalLayout),
    Circular(CircularLayout),
    Concentric(ConcentricLayout),
    Custom(CustomLayout),
    NoOverlap(NoOverlapLayout),
}

impl Layout {
    /// Choose and construct the layout a configuration asks for.
    ///
    /// Hierarchical and radial requests on a cyclic graph fall back to the
    /// force-directed layout. `custom` needs a provider, see [`Layout::custom`].
    pub fn from_config(model: &GraphModel, config: &LayoutConfig) -> Result<Layout, ConfigError> {
        config.validate()?;

        let base = match config.mode {
            LayoutMode::Custom => return Err(ConfigError::MissingPositionProvider),
            LayoutMode::Circular => Layout::Circular(CircularLayout::new(model, config)),
            LayoutMode::Concentric => Layout::Concentric(ConcentricLayout::new(model, config)),
            LayoutMode::Physics | LayoutMode::Hierarchical | LayoutMode::Radial => {
                Self::physical(model, config)
            }
        };

        Ok(Self::with_post_pass(base, model, config))
    }

    pub fn custom(
        model: &GraphModel,
        config: &LayoutConfig,
        provider: &dyn PositionProvider,
    ) -> Result<Layout, ConfigError> {
        config.validate()?;
        let base = Layout::Custom(CustomLayout::new(model, provider));
        Ok(Self::with_post_pass(base, model, config))
    }

    fn physical(model: &GraphModel, config: &LayoutConfig) -> Layout {
        let params = ForceParams::from_config(config);
        let clusters = cluster_assignment(model, config);

        if let Some(dag_mode) = config.effective_dag_mode() {
            let depths = node_depths(model);
            if !depths.invalid {
                let layout = HierarchicalLayout::new(model, params, dag_mode, &depths, config.level_ratio);
                return Layout::Hierarchical(layout.with_clusters(clusters));
            }
            tracing::warn!(
                "Graph contains a cycle; {:?} layout falls back to force-directed",
                dag_mode
            );
        }

        Layout::Force(ForceLayout::new(model, params).with_clusters(clusters))
    }

    fn with_post_pass(base: Layout, model: &GraphModel, config: &LayoutConfig) -> Layout {
        if config.no_overlap {
            Layout::NoOverlap(NoOverlapLayout::new(
                base,
                model,
                NoOverlapOptions::from_config(config),
            ))
        } else {
            base
        }
    }

    pub fn kind(&self) -> LayoutKind {
        match self {
            Layout::Force(_) => LayoutKind::Force,
            Layout::Hierarchical(_) => LayoutKind::Hierarchical,
            Layout::Circular(_) => LayoutKind::Circular,
            Layout::Concentric(_) => LayoutKind::Concentric,
            Layout::Custom(_) => LayoutKind::Custom,
            Layout::NoOverlap(inner) => inner.inner().kind(),
        }
    }

    /// How the overlap post-pass ended; `None` when no post-pass is attached.
    pub fn overlap_outcome(&self) -> Option<NoOverlapOutcome> {
        match self {
            Layout::NoOverlap(layout) => Some(layout.outcome()),
            _ => None,
        }
    }

    /// Axes and rings the overlap post-pass must leave alone.
    pub(crate) fn constraints(&self) -> LayoutConstraints {
        match self {
            Layout::Force(layout) => LayoutConstraints {
                planar: layout.dimensions() < 3,
                ..Default::default()
            },
            Layout::Hierarchical(layout) => LayoutConstraints {
                locks: layout.axis_locks().to_vec(),
                rings: layout.ring_radii().to_vec(),
                planar: layout.dimensions() < 3,
            },
            Layout::Circular(_) | Layout::Concentric(_) => LayoutConstraints {
                planar: true,
                ..Default::default()
            },
            Layout::Custom(_) => LayoutConstraints::default(),
            Layout::NoOverlap(layout) => layout.inner().constraints(),
        }
    }

    fn strategy(&self) -> &dyn LayoutStrategy {
        match self {
            Layout::Force(layout) => layout,
            Layout::Hierarchical(layout) => layout,
            Layout::Circular(layout) => layout,
            Layout::Concentric(layout) => layout,
            Layout::Custom(layout) => layout,
            Layout::NoOverlap(layout) => layout,
        }
    }

    fn strategy_mut(&mut self) -> &mut dyn LayoutStrategy {
        match self {
            Layout::Force(layout) => layout,
            Layout::Hierarchical(layout) => layout,
            Layout::Circular(layout) => layout,
            Layout::Concentric(layout) => layout,
            Layout::Custom(layout) => layout,
            Layout::NoOverlap(layout) => layout,
        }
    }
}

impl LayoutStrategy for Layout {
    fn step(&mut self) -> bool {
        self.strategy_mut().step()
    }

    fn positions(&self) -> &PositionTable {
        self.strategy().positions()
    }

    fn pin(&mut self, id: &NodeId, pin: Pin) {
        self.strategy_mut().pin(id, pin);
    }

    fn unpin(&mut self, id: &NodeId) {
        self.strategy_mut().unpin(id);
    }
}

/// Dense cluster index per node, in first-seen label order.
fn cluster_assignment(model: &GraphModel, config: &LayoutConfig) -> Vec<Option<usize>> {
    let Some(attribute) = config.cluster_attribute.as_deref() else {
        return Vec::new();
    };
    let mut labels: HashMap<String, usize> = HashMap::new();
    model
        .nodes()
        .iter()
        .map(|node| {
            let label = node.attribute_label(attribute)?;
            let next = labels.len();
            Some(*labels.entry(label).or_insert(next))
        })
        .collect()
}

/// Deterministic starting spiral (d3's phyllotaxis arrangement).
pub(crate) fn phyllotaxis(index: usize, dimensions: usize) -> Vec3 {
    const INITIAL_RADIUS: f32 = 10.0;
    let i = index as f32;
    let roll = i * std::f32::consts::PI * (3.0 - 5f32.sqrt());
    if dimensions == 3 {
        let yaw = i * std::f32::consts::PI * 20.0 / (9.0 + 221f32.sqrt());
        let radius = INITIAL_RADIUS * (0.5 + i).cbrt();
        Vec3::new(
            radius * roll.cos(),
            radius * roll.sin() * yaw.cos(),
            radius * roll.sin() * yaw.sin(),
        )
    } else {
        let radius = INITIAL_RADIUS * (0.5 + i).sqrt();
        Vec3::planar(radius * roll.cos(), radius * roll.sin())
    }
}
