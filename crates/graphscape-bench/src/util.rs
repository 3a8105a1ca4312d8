use graphscape_core::{EdgeInput, GraphInput, NodeInput};
use serde_json::json;

/// Deterministic scale-free-ish graph: node `i` links to `i / 2` and `i / 3`,
/// and nodes carry a `group` attribute for clustering.
pub fn generate_synthetic_graph(node_count: usize) -> GraphInput {
    let nodes = (0..node_count)
        .map(|i| {
            NodeInput::new(format!("n{i}")).with_data(json!({
                "group": format!("g{}", i % 8),
                "weight": (i % 17) as f64,
            }))
        })
        .collect();

    let mut edges = Vec::with_capacity(node_count * 2);
    for i in 1..node_count {
        edges.push(EdgeInput::new(format!("a{i}"), format!("n{}", i / 2), format!("n{i}")));
        if i >= 3 && i % 3 == 0 {
            edges.push(EdgeInput::new(format!("b{i}"), format!("n{}", i / 3), format!("n{i}")));
        }
    }

    GraphInput { nodes, edges }
}

/// A complete binary tree with `node_count` nodes, parents set for collapsing.
pub fn generate_tree(node_count: usize) -> GraphInput {
    let nodes = (0..node_count)
        .map(|i| {
            let node = NodeInput::new(format!("t{i}"));
            if i == 0 {
                node
            } else {
                node.with_parents([format!("t{}", (i - 1) / 2)])
            }
        })
        .collect();
    let edges = (1..node_count)
        .map(|i| EdgeInput::new(format!("e{i}"), format!("t{}", (i - 1) / 2), format!("t{i}")))
        .collect();
    GraphInput { nodes, edges }
}
