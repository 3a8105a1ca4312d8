use crate::graph::{GraphModel, GraphNode};
use graphscape_core::{NodeId, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How nodes are assigned to a cluster. Nodes without a key are left out.
#[derive(Clone)]
pub enum ClusterKey {
    Attribute(String),
    Custom(Arc<dyn Fn(&GraphNode) -> Option<String> + Send + Sync>),
}

impl ClusterKey {
    pub fn custom<F>(key: F) -> Self
    where
        F: Fn(&GraphNode) -> Option<String> + Send + Sync + 'static,
    {
        ClusterKey::Custom(Arc::new(key))
    }

    fn label_of(&self, node: &GraphNode) -> Option<String> {
        match self {
            ClusterKey::Attribute(name) => node.attribute_label(name),
            ClusterKey::Custom(key) => key(node),
        }
    }
}

impl fmt::Debug for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            ClusterKey::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterGroup {
    pub label: String,
    pub position: Vec3,
    /// Encloses every member sphere, padding included.
    pub radius: f32,
    pub padding: f32,
    pub members: Vec<NodeId>,
    /// Counter-clockwise convex hull of member positions in the xy plane.
    pub hull: Vec<[f32; 2]>,
    pub label_anchor: Vec3,
}

/// Groups positioned nodes and derives their boundary geometry.
///
/// Results are cached against the model revision, so repeated calls between
/// layout steps are free.
#[derive(Debug, Clone)]
pub struct ClusterResolver {
    key: ClusterKey,
    padding: f32,
    cache: Option<(u64, Vec<ClusterGroup>)>,
}

impl ClusterResolver {
    pub const DEFAULT_PADDING: f32 = 20.0;

    pub fn new(key: ClusterKey) -> Self {
        Self {
            key,
            padding: Self::DEFAULT_PADDING,
            cache: None,
        }
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self.cache = None;
        self
    }

    pub fn set_key(&mut self, key: ClusterKey) {
        self.key = key;
        self.cache = None;
    }

    pub fn clusters(&mut self, model: &GraphModel) -> &[ClusterGroup] {
        let revision = model.revision();
        let stale = !matches!(&self.cache, Some((cached, _)) if *cached == revision);
        if stale {
            let groups = self.compute(model);
            self.cache = Some((revision, groups));
        }
        match &self.cache {
            Some((_, groups)) => groups.as_slice(),
            None => &[],
        }
    }

    fn compute(&self, model: &GraphModel) -> Vec<ClusterGroup> {
        let mut members: BTreeMap<String, Vec<&GraphNode>> = BTreeMap::new();
        for node in model.nodes() {
            if node.position.is_none() {
                continue;
            }
            if let Some(label) = self.key.label_of(node) {
                members.entry(label).or_default().push(node);
            }
        }

        members
            .into_iter()
            .map(|(label, nodes)| self.group(label, &nodes))
            .collect()
    }

    fn group(&self, label: String, nodes: &[&GraphNode]) -> ClusterGroup {
        let points: Vec<Vec3> = nodes
            .iter()
            .map(|n| n.position.unwrap_or(Vec3::ZERO))
            .collect();
        let center = points.iter().fold(Vec3::ZERO, |acc, p| acc + *p) / points.len() as f32;
        let reach = points
            .iter()
            .zip(nodes)
            .map(|(p, n)| center.distance(*p) + n.size)
            .fold(0.0f32, f32::max);
        let radius = reach + self.padding;

        ClusterGroup {
            label,
            position: center,
            radius,
            padding: self.padding,
            members: nodes.iter().map(|n| n.id.clone()).collect(),
            hull: convex_hull(points.iter().map(|p| [p.x, p.y]).collect()),
            label_anchor: Vec3::new(center.x, center.y - radius, center.z),
        }
    }
}

fn cross(o: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Andrew's monotone chain. Collinear points are dropped; fewer than three
/// distinct points come back as-is.
pub fn convex_hull(mut points: Vec<[f32; 2]>) -> Vec<[f32; 2]> {
    points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let mut lower: Vec<[f32; 2]> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<[f32; 2]> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
