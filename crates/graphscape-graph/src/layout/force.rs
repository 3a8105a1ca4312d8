//! d3-style force simulation in two or three dimensions.
//!
//! Each step cools `alpha` geometrically toward zero, accumulates forces into
//! velocities, damps them by `velocity_decay` and integrates. Pinned axes are
//! re-imposed on every step.

use super::barnes_hut::{SpatialTree, soften};
use super::{LayoutStrategy, PositionTable, phyllotaxis};
use crate::graph::GraphModel;
use graphscape_core::{LayoutConfig, NodeId, Pin, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Squared distance below which repulsion is softened.
const MIN_DISTANCE_SQ: f32 = 1.0;
/// Alpha a simulation is reheated to after a drag.
const REHEAT_ALPHA: f32 = 0.3;
const GRAVITY_SCALE: f32 = 0.1;
const STRONG_GRAVITY_SCALE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct ForceParams {
    pub dimensions: usize,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub node_strength: f32,
    pub scaling_ratio: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub edge_weight_influence: f32,
    pub lin_log: bool,
    pub gravity: f32,
    pub strong_gravity: bool,
    pub barnes_hut: bool,
    pub theta: f32,
    pub cluster_strength: f32,
    pub cluster_inter_strength: f32,
    pub seed: u64,
}

impl ForceParams {
    pub fn from_config(config: &LayoutConfig) -> Self {
        let iterations = config.iterations.max(1) as f32;
        Self {
            dimensions: config.dimensions as usize,
            alpha_min: config.alpha_min,
            alpha_decay: 1.0 - config.alpha_min.powf(1.0 / iterations),
            velocity_decay: config.velocity_decay,
            node_strength: config.node_strength,
            scaling_ratio: config.scaling_ratio,
            link_distance: config.link_distance,
            link_strength: config.link_strength,
            edge_weight_influence: config.edge_weight_influence,
            lin_log: config.lin_log_mode,
            gravity: config.gravity,
            strong_gravity: config.strong_gravity_mode,
            barnes_hut: config.barnes_hut_optimize,
            theta: config.barnes_hut_theta,
            cluster_strength: config.cluster_strength,
            cluster_inter_strength: config.cluster_inter_strength,
            seed: config.seed,
        }
    }
}

impl Default for ForceParams {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    strength: f32,
    /// Share of the correction applied to the target.
    bias: f32,
}

pub struct ForceLayout {
    params: ForceParams,
    table: PositionTable,
    velocities: Vec<Vec3>,
    pins: Vec<Pin>,
    locks: Vec<Pin>,
    links: Vec<Link>,
    clusters: Vec<Option<usize>>,
    cluster_count: usize,
    alpha: f32,
    iteration: usize,
    rng: StdRng,
}

impl ForceLayout {
    pub fn new(model: &GraphModel, params: ForceParams) -> Self {
        let dimensions = params.dimensions;
        let positions: Vec<Vec3> = model
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let mut p = node.position.unwrap_or_else(|| phyllotaxis(i, dimensions));
                if dimensions < 3 {
                    p.z = 0.0;
                }
                node.pin.apply(&mut p);
                p
            })
            .collect();

        let degree: Vec<usize> = model.node_indices().map(|idx| model.degree(idx)).collect();
        let links = model
            .edges()
            .iter()
            .filter(|edge| edge.source_idx != edge.target_idx)
            .map(|edge| {
                let (s, t) = (edge.source_idx.0, edge.target_idx.0);
                let weight = edge.weight.unwrap_or(1.0).max(0.0);
                let strength = params.link_strength
                    * weight.powf(params.edge_weight_influence)
                    / degree[s].min(degree[t]).max(1) as f32;
                Link {
                    source: s,
                    target: t,
                    strength,
                    bias: degree[s] as f32 / (degree[s] + degree[t]) as f32,
                }
            })
            .collect();

        let n = positions.len();
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            params,
            table: PositionTable::from_model(model, positions),
            velocities: vec![Vec3::ZERO; n],
            pins: model.nodes().iter().map(|node| node.pin).collect(),
            locks: vec![Pin::NONE; n],
            links,
            clusters: Vec::new(),
            cluster_count: 0,
            alpha: 1.0,
            iteration: 0,
        }
    }

    /// Attach a cluster index per node; empty disables the clustering forces.
    pub fn with_clusters(mut self, clusters: Vec<Option<usize>>) -> Self {
        if clusters.len() == self.table.len() {
            self.cluster_count = clusters.iter().flatten().map(|c| c + 1).max().unwrap_or(0);
            self.clusters = clusters;
        }
        self
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn dimensions(&self) -> usize {
        self.params.dimensions
    }

    /// Kinetic energy of the current step: the sum of squared velocities.
    pub fn energy(&self) -> f32 {
        self.velocities.iter().map(Vec3::length_sq).sum()
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha);
    }

    /// Hold one axis of a node at `value` regardless of drags.
    pub(crate) fn set_lock(&mut self, index: usize, axis: usize, value: f32) {
        let lock = &mut self.locks[index];
        match axis {
            0 => lock.fx = Some(value),
            1 => lock.fy = Some(value),
            _ => lock.fz = Some(value),
        }
        self.table.as_mut_slice()[index].set_axis(axis, value);
    }

    pub(crate) fn locks(&self) -> &[Pin] {
        &self.locks
    }

    pub(crate) fn is_pinned(&self, index: usize) -> bool {
        self.pins[index].is_pinned()
    }

    pub(crate) fn positions_mut(&mut self) -> &mut [Vec3] {
        self.table.as_mut_slice()
    }

    fn effective_pin(&self, index: usize) -> Pin {
        self.pins[index].or(self.locks[index])
    }

    fn jiggle(rng: &mut StdRng, dimensions: usize) -> Vec3 {
        let mut j = || (rng.r#gen::<f32>() - 0.5) * 1e-6;
        let (x, y) = (j(), j());
        let z = if dimensions == 3 { j() } else { 0.0 };
        Vec3::new(x, y, z)
    }

    fn apply_many_body(&mut self) {
        let strength = self.params.node_strength * self.params.scaling_ratio * self.alpha;
        if strength == 0.0 {
            return;
        }
        let dimensions = self.params.dimensions;
        let positions = self.table.as_slice();
        let rng = &mut self.rng;
        let mut jiggle = || Self::jiggle(rng, dimensions);

        if self.params.barnes_hut {
            let tree = SpatialTree::build(positions, dimensions);
            for (i, velocity) in self.velocities.iter_mut().enumerate() {
                let field =
                    tree.field_at(i, positions, self.params.theta, MIN_DISTANCE_SQ, &mut jiggle);
                *velocity += field * strength;
            }
        } else {
            for i in 0..positions.len() {
                let mut field = Vec3::ZERO;
                for (j, other) in positions.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let mut delta = *other - positions[i];
                    if delta.length_sq() == 0.0 {
                        delta = jiggle();
                    }
                    field += delta / soften(delta.length_sq(), MIN_DISTANCE_SQ);
                }
                self.velocities[i] += field * strength;
            }
        }
    }

    fn apply_links(&mut self) {
        let dimensions = self.params.dimensions;
        for link in &self.links {
            let (s, t) = (link.source, link.target);
            let positions = self.table.as_slice();
            let mut delta = positions[t] + self.velocities[t] - positions[s] - self.velocities[s];
            if delta.length_sq() == 0.0 {
                delta = Self::jiggle(&mut self.rng, dimensions);
            }
            let distance = delta.length();
            let rest = self.params.link_distance;
            let stretch = if self.params.lin_log {
                (distance.ln_1p() - rest.ln_1p()) * (1.0 + rest)
            } else {
                distance - rest
            };
            let correction = delta * (stretch / distance * self.alpha * link.strength);
            self.velocities[t] -= correction * link.bias;
            self.velocities[s] += correction * (1.0 - link.bias);
        }
    }

    fn apply_gravity(&mut self) {
        let gravity = self.params.gravity * self.alpha;
        if gravity == 0.0 {
            return;
        }
        for (p, v) in self.table.as_slice().iter().zip(self.velocities.iter_mut()) {
            if self.params.strong_gravity {
                *v -= *p * (gravity * STRONG_GRAVITY_SCALE);
            } else if let Some(dir) = p.normalized() {
                *v -= dir * (gravity * GRAVITY_SCALE);
            }
        }
    }

    fn apply_clusters(&mut self) {
        if self.cluster_count == 0 {
            return;
        }
        let positions = self.table.as_slice();
        let mut sums = vec![Vec3::ZERO; self.cluster_count];
        let mut counts = vec![0usize; self.cluster_count];
        for (p, cluster) in positions.iter().zip(&self.clusters) {
            if let Some(c) = cluster {
                sums[*c] += *p;
                counts[*c] += 1;
            }
        }
        let centroids: Vec<Vec3> = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| *sum / count.max(1) as f32)
            .collect();

        let pull = self.params.cluster_strength * self.alpha;
        let mut push = vec![Vec3::ZERO; self.cluster_count];
        let spread = self.params.cluster_inter_strength
            * self.alpha
            * self.params.link_distance
            * self.params.link_distance;
        for a in 0..self.cluster_count {
            for b in (a + 1)..self.cluster_count {
                if counts[a] == 0 || counts[b] == 0 {
                    continue;
                }
                let delta = centroids[a] - centroids[b];
                let distance = delta.length().max(1.0);
                let Some(dir) = delta.normalized() else {
                    continue;
                };
                let force = dir * (spread / distance);
                push[a] += force;
                push[b] -= force;
            }
        }

        for (i, cluster) in self.clusters.iter().enumerate() {
            if let Some(c) = cluster {
                self.velocities[i] += (centroids[*c] - positions[i]) * pull + push[*c];
            }
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.params.velocity_decay;
        let dimensions = self.params.dimensions;
        for i in 0..self.velocities.len() {
            let pin = self.effective_pin(i);
            let velocity = &mut self.velocities[i];
            let position = &mut self.table.as_mut_slice()[i];
            for axis in 0..3 {
                if axis >= dimensions {
                    velocity.set_axis(axis, 0.0);
                    continue;
                }
                match pin.axis(axis) {
                    Some(fixed) => {
                        position.set_axis(axis, fixed);
                        velocity.set_axis(axis, 0.0);
                    }
                    None => {
                        let v = velocity.axis(axis) * keep;
                        velocity.set_axis(axis, v);
                        position.set_axis(axis, position.axis(axis) + v);
                    }
                }
            }
        }
    }

    /// Shift the mean to the origin on every axis no node is held on.
    fn recenter(&mut self) {
        let n = self.table.len() as f32;
        for axis in 0..self.params.dimensions {
            let held = (0..self.table.len()).any(|i| self.effective_pin(i).axis(axis).is_some());
            if held {
                continue;
            }
            let positions = self.table.as_mut_slice();
            let mean = positions.iter().map(|p| p.axis(axis)).sum::<f32>() / n;
            for p in positions.iter_mut() {
                p.set_axis(axis, p.axis(axis) - mean);
            }
        }
    }
}

impl LayoutStrategy for ForceLayout {
    fn step(&mut self) -> bool {
        if self.table.is_empty() || self.alpha < self.params.alpha_min {
            return false;
        }
        self.alpha += (0.0 - self.alpha) * self.params.alpha_decay;

        self.apply_many_body();
        self.apply_links();
        self.apply_gravity();
        self.apply_clusters();
        self.integrate();
        self.recenter();

        self.iteration += 1;
        self.alpha >= self.params.alpha_min
    }

    fn positions(&self) -> &PositionTable {
        &self.table
    }

    fn pin(&mut self, id: &NodeId, pin: Pin) {
        let Some(index) = self.table.index_of(id) else {
            return;
        };
        self.pins[index] = pin;
        pin.apply(&mut self.table.as_mut_slice()[index]);
        self.reheat(REHEAT_ALPHA);
    }

    fn unpin(&mut self, id: &NodeId) {
        if let Some(index) = self.table.index_of(id) {
            self.pins[index] = Pin::NONE;
            self.reheat(REHEAT_ALPHA);
        }
    }
}
