use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::NodeId;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Level decomposition of a directed graph.
///
/// When `invalid` is set the graph has a cycle (or a component with no root)
/// and `depths` is empty; hierarchical layouts must not be used.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DepthMap {
    pub invalid: bool,
    pub depths: HashMap<NodeId, usize>,
    pub max_depth: usize,
    #[serde(skip)]
    levels: Vec<usize>,
}

impl DepthMap {
    pub fn depth_of(&self, id: &NodeId) -> Option<usize> {
        self.depths.get(id).copied()
    }

    /// Depth by arena index; only meaningful for a valid map.
    pub fn depth_at(&self, idx: NodeIndex) -> Option<usize> {
        self.levels.get(idx.0).copied()
    }

    /// Spacing between consecutive levels: `(nodes / max(max_depth, 1)) * ratio`.
    pub fn level_distance(&self, node_count: usize, ratio: f32) -> f32 {
        (node_count as f32 / self.max_depth.max(1) as f32) * ratio
    }
}

pub fn node_depths(model: &GraphModel) -> DepthMap {
    let n = model.node_count();
    if n == 0 {
        return DepthMap::default();
    }

    let roots: Vec<NodeIndex> = model
        .node_indices()
        .filter(|&idx| model.in_degree(idx) == 0)
        .collect();

    let mut state = vec![Visit::Unvisited; n];
    let mut postorder = Vec::with_capacity(n);
    let mut invalid = false;

    for root in roots {
        if state[root.0] == Visit::Unvisited {
            invalid |= visit(model, root, &mut state, &mut postorder);
        }
    }

    // A node no root reaches sits on or behind a cycle.
    if state.iter().any(|s| *s != Visit::Done) {
        invalid = true;
    }

    if invalid {
        tracing::debug!("Depth map invalid: graph contains a cycle");
        return DepthMap {
            invalid: true,
            ..Default::default()
        };
    }

    // Reverse postorder is a topological order, so every predecessor is final
    // before its successors are relaxed.
    let mut levels = vec![0usize; n];
    for &idx in postorder.iter().rev() {
        let next_level = levels[idx.0] + 1;
        for &next in model.outgoing(idx) {
            if levels[next.0] < next_level {
                levels[next.0] = next_level;
            }
        }
    }

    let max_depth = levels.iter().copied().max().unwrap_or(0);
    let depths = model
        .nodes()
        .iter()
        .zip(&levels)
        .map(|(node, &level)| (node.id.clone(), level))
        .collect();

    DepthMap {
        invalid: false,
        depths,
        max_depth,
        levels,
    }
}

/// Iterative depth-first walk. Returns true if a back edge was seen.
fn visit(
    model: &GraphModel,
    root: NodeIndex,
    state: &mut [Visit],
    postorder: &mut Vec<NodeIndex>,
) -> bool {
    let mut cycle = false;
    let mut stack: Vec<(NodeIndex, usize)> = vec![(root, 0)];
    state[root.0] = Visit::InProgress;

    while let Some(frame) = stack.last_mut() {
        let (node, cursor) = *frame;
        let out = model.outgoing(node);
        if cursor < out.len() {
            frame.1 += 1;
            let next = out[cursor];
            match state[next.0] {
                Visit::Unvisited => {
                    state[next.0] = Visit::InProgress;
                    stack.push((next, 0));
                }
                Visit::InProgress => cycle = true,
                Visit::Done => {}
            }
        } else {
            state[node.0] = Visit::Done;
            postorder.push(node);
            stack.pop();
        }
    }

    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphscape_core::{EdgeInput, NodeInput};

    fn build(ids: &[&str], edges: &[(&str, &str)]) -> GraphModel {
        let nodes = ids.iter().map(|id| NodeInput::new(*id)).collect();
        let edges = edges
            .iter()
            .enumerate()
            .map(|(i, (s, t))| EdgeInput::new(format!("e{i}"), *s, *t))
            .collect();
        GraphModel::build(nodes, edges).0
    }

    #[test]
    fn test_chain_depths() {
        let model = build(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let depths = node_depths(&model);
        assert!(!depths.invalid);
        assert_eq!(depths.depth_of(&"a".into()), Some(0));
        assert_eq!(depths.depth_of(&"b".into()), Some(1));
        assert_eq!(depths.depth_of(&"c".into()), Some(2));
        assert_eq!(depths.max_depth, 2);
    }

    #[test]
    fn test_depth_uses_longest_predecessor_chain() {
        // a -> b -> c -> d and a shortcut a -> d
        let model = build(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
        );
        let depths = node_depths(&model);
        assert_eq!(depths.depth_of(&"d".into()), Some(3));
    }

    #[test]
    fn test_diamond_is_valid() {
        let model = build(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let depths = node_depths(&model);
        assert!(!depths.invalid);
        assert_eq!(depths.depth_of(&"d".into()), Some(2));
    }

    #[test]
    fn test_cycle_reachable_from_root_is_invalid() {
        let model = build(&["r", "a", "b"], &[("r", "a"), ("a", "b"), ("b", "a")]);
        assert!(node_depths(&model).invalid);
    }

    #[test]
    fn test_rootless_cycle_is_invalid() {
        let model = build(&["a", "b", "x"], &[("a", "b"), ("b", "a")]);
        assert!(node_depths(&model).invalid);
    }

    #[test]
    fn test_self_loop_is_invalid() {
        let model = build(&["a", "b"], &[("a", "b"), ("b", "b")]);
        assert!(node_depths(&model).invalid);
    }

    #[test]
    fn test_isolated_nodes_are_roots() {
        let model = build(&["a", "b"], &[]);
        let depths = node_depths(&model);
        assert!(!depths.invalid);
        assert_eq!(depths.max_depth, 0);
        assert_eq!(depths.level_distance(model.node_count(), 2.0), 4.0);
    }

    #[test]
    fn test_empty_graph() {
        let depths = node_depths(&GraphModel::new());
        assert!(!depths.invalid);
        assert!(depths.depths.is_empty());
    }
}
