//! Overlap removal run after another layout has settled.
//!
//! Nodes are treated as spheres of radius `size`. Each sweep buckets nodes into a
//! uniform grid, checks neighboring cells only, and pushes every overlapping pair
//! apart by half the overlap each. Pushes never move a node along an axis the
//! wrapped layout has locked, and radial layouts are put back on their rings
//! after every sweep.

use super::hierarchical::project_onto_rings;
use super::{Layout, LayoutStrategy, PositionTable};
use crate::graph::GraphModel;
use graphscape_core::{LayoutConfig, NodeId, Pin, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tolerance under which a pair counts as separated.
const SEPARATION_EPSILON: f32 = 1e-4;
/// Pushes slightly past the exact overlap so pairs do not stay touching.
const PUSH_FACTOR: f32 = 1.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoOverlapOptions {
    pub margin: f32,
    pub grid_size: f32,
    pub max_iterations: usize,
}

impl NoOverlapOptions {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            margin: config.margin,
            grid_size: config.grid_size,
            max_iterations: config.overlap_iterations,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoOverlapOutcome {
    pub sweeps: usize,
    pub cap_reached: bool,
}

/// What a wrapped layout holds in place besides drag pins.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LayoutConstraints {
    /// Locked axes per node; empty when nothing is locked.
    pub locks: Vec<Pin>,
    /// Ring radius per node for radial layouts; empty otherwise.
    pub rings: Vec<f32>,
    /// The layout lives in the xy plane.
    pub planar: bool,
}

impl LayoutConstraints {
    fn free_axes(&self, i: usize, j: usize) -> [bool; 3] {
        let locked = |node: usize, axis: usize| {
            self.locks
                .get(node)
                .is_some_and(|lock| lock.axis(axis).is_some())
        };
        std::array::from_fn(|axis| {
            !(self.planar && axis == 2) && !locked(i, axis) && !locked(j, axis)
        })
    }
}

/// Run sweeps until no pair overlaps or `max_iterations` is hit.
///
/// `fixed` nodes are never moved; a pair of two fixed nodes is ignored.
pub fn remove_overlaps(
    positions: &mut [Vec3],
    radii: &[f32],
    fixed: &[bool],
    options: &NoOverlapOptions,
) -> NoOverlapOutcome {
    let unconstrained = LayoutConstraints::default();
    let mut outcome = NoOverlapOutcome::default();
    loop {
        if sweep(positions, radii, fixed, &unconstrained, options) == 0 {
            return outcome;
        }
        outcome.sweeps += 1;
        if outcome.sweeps >= options.max_iterations {
            outcome.cap_reached = true;
            return outcome;
        }
    }
}

type Cell = (i32, i32, i32);

fn cell_of(p: Vec3, cell_size: f32) -> Cell {
    (
        (p.x / cell_size).floor() as i32,
        (p.y / cell_size).floor() as i32,
        (p.z / cell_size).floor() as i32,
    )
}

fn masked(v: Vec3, free: [bool; 3]) -> Vec3 {
    let mut out = Vec3::ZERO;
    for (axis, _) in free.iter().enumerate().filter(|(_, keep)| **keep) {
        out.set_axis(axis, v.axis(axis));
    }
    out
}

/// Unit direction on the free axes for pairs with no usable separating axis.
fn fallback_direction(angle: f32, free: [bool; 3]) -> Option<Vec3> {
    let axes: Vec<usize> = (0..3).filter(|&axis| free[axis]).collect();
    let mut dir = Vec3::ZERO;
    match axes.as_slice() {
        [] => return None,
        [only] => dir.set_axis(*only, if angle.cos() >= 0.0 { 1.0 } else { -1.0 }),
        [first, second, ..] => {
            dir.set_axis(*first, angle.cos());
            dir.set_axis(*second, angle.sin());
        }
    }
    Some(dir)
}

/// One pass over all nearby pairs. Returns how many overlapping pairs were found.
fn sweep(
    positions: &mut [Vec3],
    radii: &[f32],
    fixed: &[bool],
    constraints: &LayoutConstraints,
    options: &NoOverlapOptions,
) -> usize {
    let max_radius = radii.iter().copied().fold(0.0f32, f32::max);
    // Any overlapping pair is at most one cell apart.
    let cell_size = options.grid_size.max(2.0 * max_radius + options.margin);

    let mut grid: HashMap<Cell, Vec<usize>> = HashMap::new();
    for (i, p) in positions.iter().enumerate() {
        grid.entry(cell_of(*p, cell_size)).or_default().push(i);
    }

    let mut overlaps = 0;
    for i in 0..positions.len() {
        let (cx, cy, cz) = cell_of(positions[i], cell_size);
        let mut neighbors = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        neighbors.extend(bucket.iter().copied().filter(|&j| j > i));
                    }
                }
            }
        }
        neighbors.sort_unstable();

        for j in neighbors {
            if fixed[i] && fixed[j] {
                continue;
            }
            let required = radii[i] + radii[j] + options.margin;
            let delta = positions[i] - positions[j];
            let distance = delta.length();
            if distance + SEPARATION_EPSILON >= required {
                continue;
            }
            overlaps += 1;

            let free = constraints.free_axes(i, j);
            let along = masked(delta, free);
            let direction = match along.normalized() {
                Some(dir) => dir,
                None => {
                    let angle = (i * 31 + j) as f32 * 2.399_963;
                    match fallback_direction(angle, free) {
                        Some(dir) => dir,
                        None => continue,
                    }
                }
            };
            let push = (required - distance) * PUSH_FACTOR;
            let (share_i, share_j) = match (fixed[i], fixed[j]) {
                (true, _) => (0.0, 1.0),
                (_, true) => (1.0, 0.0),
                _ => (0.5, 0.5),
            };
            positions[i] += direction * (push * share_i);
            positions[j] -= direction * (push * share_j);
        }
    }
    overlaps
}

/// Wraps another layout and removes overlaps once it has settled.
pub struct NoOverlapLayout {
    inner: Box<Layout>,
    table: PositionTable,
    radii: Vec<f32>,
    pins: Vec<Pin>,
    constraints: LayoutConstraints,
    options: NoOverlapOptions,
    inner_done: bool,
    outcome: NoOverlapOutcome,
    finished: bool,
}

impl NoOverlapLayout {
    pub fn new(inner: Layout, model: &GraphModel, options: NoOverlapOptions) -> Self {
        Self {
            table: inner.positions().clone(),
            constraints: inner.constraints(),
            inner: Box::new(inner),
            radii: model.nodes().iter().map(|n| n.size).collect(),
            pins: model.nodes().iter().map(|n| n.pin).collect(),
            options,
            inner_done: false,
            outcome: NoOverlapOutcome::default(),
            finished: false,
        }
    }

    pub fn inner(&self) -> &Layout {
        &self.inner
    }

    pub fn outcome(&self) -> NoOverlapOutcome {
        self.outcome
    }

    /// A drag invalidates the settled state; run the inner layout and sweeps again.
    fn resume(&mut self) {
        self.inner_done = false;
        self.finished = false;
        self.outcome = NoOverlapOutcome::default();
    }
}

impl LayoutStrategy for NoOverlapLayout {
    fn step(&mut self) -> bool {
        if !self.inner_done {
            let running = self.inner.step();
            self.table = self.inner.positions().clone();
            let positions = self.table.as_mut_slice();
            for (p, pin) in positions.iter_mut().zip(&self.pins) {
                pin.apply(p);
            }
            if running {
                return true;
            }
            self.inner_done = true;
        }
        if self.finished {
            return false;
        }

        let fixed: Vec<bool> = self.pins.iter().map(Pin::is_pinned).collect();
        let positions = self.table.as_mut_slice();
        let overlaps = sweep(positions, &self.radii, &fixed, &self.constraints, &self.options);
        if !self.constraints.rings.is_empty() {
            project_onto_rings(positions, &self.constraints.rings, &fixed, self.constraints.planar);
        }
        if overlaps == 0 {
            self.finished = true;
            return false;
        }
        self.outcome.sweeps += 1;
        if self.outcome.sweeps >= self.options.max_iterations {
            tracing::warn!(
                "Overlap removal stopped after {} sweeps with overlaps remaining",
                self.outcome.sweeps
            );
            self.outcome.cap_reached = true;
            self.finished = true;
            return false;
        }
        true
    }

    fn positions(&self) -> &PositionTable {
        &self.table
    }

    fn pin(&mut self, id: &NodeId, pin: Pin) {
        if let Some(index) = self.table.index_of(id) {
            self.pins[index] = pin;
            pin.apply(&mut self.table.as_mut_slice()[index]);
        }
        self.inner.pin(id, pin);
        self.resume();
    }

    fn unpin(&mut self, id: &NodeId) {
        if let Some(index) = self.table.index_of(id) {
            self.pins[index] = Pin::NONE;
        }
        self.inner.unpin(id);
        self.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;
    use crate::layout::CustomLayout;
    use graphscape_core::NodeInput;

    fn options() -> NoOverlapOptions {
        NoOverlapOptions {
            margin: 2.0,
            grid_size: 20.0,
            max_iterations: 500,
        }
    }

    #[test]
    fn test_overlapping_pair_is_separated() {
        let mut positions = vec![Vec3::planar(0.0, 0.0), Vec3::planar(3.0, 0.0)];
        let outcome = remove_overlaps(&mut positions, &[5.0, 5.0], &[false, false], &options());
        assert!(!outcome.cap_reached);
        assert!(positions[0].distance(positions[1]) >= 12.0 - SEPARATION_EPSILON);
        // Pushed symmetrically along x.
        assert!((positions[0].x + positions[1].x - 3.0).abs() < 1e-4);
        assert_eq!(positions[0].y, 0.0);
    }

    #[test]
    fn test_coincident_nodes_are_split() {
        let mut positions = vec![Vec3::ZERO; 3];
        let outcome = remove_overlaps(&mut positions, &[4.0; 3], &[false; 3], &options());
        assert!(!outcome.cap_reached);
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(positions[i].distance(positions[j]) + SEPARATION_EPSILON >= 10.0);
            }
        }
    }

    #[test]
    fn test_fixed_node_does_not_move() {
        let mut positions = vec![Vec3::planar(0.0, 0.0), Vec3::planar(1.0, 0.0)];
        remove_overlaps(&mut positions, &[5.0, 5.0], &[true, false], &options());
        assert_eq!(positions[0], Vec3::ZERO);
        assert!(positions[1].x >= 12.0 - SEPARATION_EPSILON);
    }

    #[test]
    fn test_cap_is_reported() {
        let mut positions = vec![Vec3::ZERO; 30];
        let capped = NoOverlapOptions {
            max_iterations: 1,
            ..options()
        };
        let outcome = remove_overlaps(&mut positions, &[10.0; 30], &[false; 30], &capped);
        assert!(outcome.cap_reached);
        assert_eq!(outcome.sweeps, 1);
    }

    #[test]
    fn test_locked_axis_is_never_pushed() {
        // Three nodes on one level (y locked) stacked on top of each other.
        let mut positions = vec![Vec3::planar(0.0, 40.0); 3];
        let level = Pin {
            fy: Some(40.0),
            ..Pin::NONE
        };
        let constraints = LayoutConstraints {
            locks: vec![level; 3],
            rings: Vec::new(),
            planar: true,
        };
        let mut sweeps = 0;
        while sweep(&mut positions, &[5.0; 3], &[false; 3], &constraints, &options()) > 0 {
            sweeps += 1;
            assert!(sweeps < 500);
        }
        for p in &positions {
            assert_eq!(p.y, 40.0);
            assert_eq!(p.z, 0.0);
        }
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(positions[i].distance(positions[j]) + SEPARATION_EPSILON >= 12.0);
            }
        }
    }

    #[test]
    fn test_pair_with_no_free_axis_stays_overlapping() {
        let mut positions = vec![Vec3::planar(0.0, 0.0), Vec3::planar(0.0, 1.0)];
        let constraints = LayoutConstraints {
            locks: vec![Pin::at(Vec3::ZERO), Pin::at(Vec3::planar(0.0, 1.0))],
            rings: Vec::new(),
            planar: true,
        };
        let before = positions.clone();
        assert_eq!(sweep(&mut positions, &[5.0; 2], &[false; 2], &constraints, &options()), 1);
        assert_eq!(positions, before);
    }

    #[test]
    fn test_wrapping_layout_runs_inner_then_sweeps() {
        let (model, _) = GraphModel::build(
            vec![NodeInput::new("a"), NodeInput::new("b")],
            vec![],
        );
        let stacked = |_: &GraphNode, _: &GraphModel| Vec3::ZERO;
        let inner = Layout::Custom(CustomLayout::new(&model, &stacked));
        let mut layout = NoOverlapLayout::new(inner, &model, options());
        let mut steps = 0;
        while layout.step() {
            steps += 1;
        }
        assert!(steps >= 1);
        assert!(!layout.outcome().cap_reached);
        let a = layout.node_position(&"a".into()).unwrap();
        let b = layout.node_position(&"b".into()).unwrap();
        let required = 2.0 * GraphNode::DEFAULT_SIZE + 2.0;
        assert!(a.distance(b) + SEPARATION_EPSILON >= required);
    }
}
