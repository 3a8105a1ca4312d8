use crate::graph::{GraphEdge, NodeIndex};
use std::collections::HashMap;

/// Lateral spacing between successive parallel edges.
pub const CURVE_OFFSET_STEP: f32 = 0.25;

/// Group edge positions by their directed (source, target) pair, keeping
/// input order inside each group and first-seen order across groups.
pub fn parallel_groups(edges: &[GraphEdge]) -> Vec<Vec<usize>> {
    let mut order: Vec<(NodeIndex, NodeIndex)> = Vec::new();
    let mut groups: HashMap<(NodeIndex, NodeIndex), Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        let key = (edge.source_idx, edge.target_idx);
        let group = groups.entry(key).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        group.push(i);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect()
}

/// Offset for the `position`-th member of a group of `count` parallel edges.
///
/// Magnitudes grow every two edges and signs alternate, so the first two
/// siblings bend to opposite sides and no sibling stays straight.
pub fn curve_offset(position: usize, count: usize) -> Option<f32> {
    if count < 2 {
        return None;
    }
    let magnitude = CURVE_OFFSET_STEP * ((position / 2) as f32 + 1.0);
    let sign = if position % 2 == 0 { 1.0 } else { -1.0 };
    Some(sign * magnitude)
}

pub fn assign_curve_offsets(edges: &mut [GraphEdge]) {
    for group in parallel_groups(edges) {
        let count = group.len();
        for (position, edge_pos) in group.into_iter().enumerate() {
            edges[edge_pos].curve_offset = curve_offset(position, count);
        }
    }
}
