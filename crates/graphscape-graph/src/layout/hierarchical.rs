use super::force::{ForceLayout, ForceParams};
use super::{LayoutStrategy, PositionTable};
use crate::depth::DepthMap;
use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::{DagMode, NodeId, Pin, Vec3};

/// Radial rings are packed tighter than straight levels.
const RADIAL_LEVEL_FACTOR: f32 = 0.7;

/// Force simulation constrained by depth levels.
///
/// Axis modes lock one coordinate per node to its level; radial modes project
/// every node back onto its level's sphere (or circle) after each step. The
/// remaining axes are spread by the simulation.
pub struct HierarchicalLayout {
    force: ForceLayout,
    dag_mode: DagMode,
    level_distance: f32,
    /// Target distance from the origin per node, radial modes only.
    radii: Vec<f32>,
}

impl HierarchicalLayout {
    /// `depths` must be valid; the factory falls back to force-directed otherwise.
    pub fn new(
        model: &GraphModel,
        mut params: ForceParams,
        dag_mode: DagMode,
        depths: &DepthMap,
        level_ratio: f32,
    ) -> Self {
        if dag_mode.needs_depth_axis() {
            params.dimensions = 3;
        }
        let radial = dag_mode.is_radial();
        let level_distance = depths.level_distance(model.node_count(), level_ratio)
            * if radial { RADIAL_LEVEL_FACTOR } else { 1.0 };
        let max_depth = depths.max_depth as f32;
        let depth_of = |idx: NodeIndex| depths.depth_at(idx).unwrap_or(0) as f32;

        let mut force = ForceLayout::new(model, params);
        let mut radii = Vec::new();

        if let Some((axis, positive)) = dag_mode.level_axis() {
            let sign = if positive { 1.0 } else { -1.0 };
            for idx in model.node_indices() {
                let value = sign * (depth_of(idx) - max_depth / 2.0) * level_distance;
                force.set_lock(idx.0, axis, value);
            }
        } else {
            radii = model
                .node_indices()
                .map(|idx| {
                    let level = if dag_mode == DagMode::RadialIn {
                        max_depth - depth_of(idx)
                    } else {
                        depth_of(idx)
                    };
                    level * level_distance
                })
                .collect();
        }

        let mut layout = Self {
            force,
            dag_mode,
            level_distance,
            radii,
        };
        layout.project_radial();
        layout
    }

    pub fn with_clusters(mut self, clusters: Vec<Option<usize>>) -> Self {
        self.force = self.force.with_clusters(clusters);
        self
    }

    pub fn dag_mode(&self) -> DagMode {
        self.dag_mode
    }

    pub fn level_distance(&self) -> f32 {
        self.level_distance
    }

    pub fn energy(&self) -> f32 {
        self.force.energy()
    }

    /// Per-node axis locks holding each node on its level. Empty axes are free.
    pub(crate) fn axis_locks(&self) -> &[Pin] {
        self.force.locks()
    }

    /// Target distance from the origin per node; empty outside radial modes.
    pub(crate) fn ring_radii(&self) -> &[f32] {
        &self.radii
    }

    pub(crate) fn dimensions(&self) -> usize {
        self.force.dimensions()
    }

    fn project_radial(&mut self) {
        if self.radii.is_empty() {
            return;
        }
        let pinned: Vec<bool> = (0..self.radii.len())
            .map(|i| self.force.is_pinned(i))
            .collect();
        let planar = self.force.dimensions() < 3;
        project_onto_rings(self.force.positions_mut(), &self.radii, &pinned, planar);
    }
}

/// Put every node not marked `skip` at its ring radius, keeping its direction.
pub(crate) fn project_onto_rings(
    positions: &mut [Vec3],
    radii: &[f32],
    skip: &[bool],
    planar: bool,
) {
    for ((p, &target), &skipped) in positions.iter_mut().zip(radii).zip(skip) {
        if skipped {
            continue;
        }
        if target == 0.0 {
            *p = Vec3::ZERO;
            continue;
        }
        let flat = if planar { Vec3::planar(p.x, p.y) } else { *p };
        *p = match flat.normalized() {
            Some(dir) => dir * target,
            None => Vec3::planar(target, 0.0),
        };
    }
}

impl LayoutStrategy for HierarchicalLayout {
    fn step(&mut self) -> bool {
        let running = self.force.step();
        self.project_radial();
        running
    }

    fn positions(&self) -> &PositionTable {
        self.force.positions()
    }

    fn pin(&mut self, id: &NodeId, pin: Pin) {
        self.force.pin(id, pin);
    }

    fn unpin(&mut self, id: &NodeId) {
        self.force.unpin(id);
    }
}
