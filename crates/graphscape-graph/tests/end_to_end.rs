use graphscape_core::{
    DagMode, EdgeId, EdgeInput, GraphInput, LayoutConfig, LayoutMode, NodeId, NodeInput, Pin,
    SizingType, Vec3,
};
use graphscape_graph::{
    CollapseResolver, GraphModel, GraphNode, Layout, LayoutKind, LayoutRunner, LayoutStrategy,
    compute_custom_layout, compute_layout, node_depths,
};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn chain_input() -> GraphInput {
    GraphInput {
        nodes: vec![NodeInput::new("a"), NodeInput::new("b"), NodeInput::new("c")],
        edges: vec![EdgeInput::new("e1", "a", "b"), EdgeInput::new("e2", "b", "c")],
    }
}

#[test]
fn test_top_down_chain_end_to_end() -> anyhow::Result<()> {
    let input = chain_input();
    let (model, report) = GraphModel::build(input.nodes.clone(), input.edges.clone());
    assert!(report.is_clean());

    let depths = node_depths(&model);
    assert!(!depths.invalid);
    assert_eq!(depths.max_depth, 2);
    assert_eq!(depths.depth_of(&"a".into()), Some(0));
    assert_eq!(depths.depth_of(&"b".into()), Some(1));
    assert_eq!(depths.depth_of(&"c".into()), Some(2));

    let config = LayoutConfig {
        mode: LayoutMode::Hierarchical,
        dag_mode: Some(DagMode::Td),
        ..Default::default()
    };
    let output = compute_layout(input, &config, &[])?;
    assert_eq!(output.layout, LayoutKind::Hierarchical);
    let y = |id: &str| output.positions[&NodeId::from(id)].y;
    assert!(y("a") < y("b"));
    assert!(y("b") < y("c"));
    assert!(output.stats.converged);
    Ok(())
}

#[test]
fn test_collapse_hides_descendants_end_to_end() -> anyhow::Result<()> {
    let input = GraphInput {
        nodes: vec![
            NodeInput::new("A"),
            NodeInput::new("B").with_parents(["A"]),
            NodeInput::new("C").with_parents(["B"]),
        ],
        edges: vec![EdgeInput::new("ab", "A", "B"), EdgeInput::new("bc", "B", "C")],
    };
    let (model, _) = GraphModel::build(input.nodes.clone(), input.edges.clone());
    let resolver = CollapseResolver::new(["B"]);
    assert!(resolver.is_collapsed(&model, &"C".into()));
    assert_eq!(resolver.expand_path_ids(&model, &"C".into()), vec![NodeId::from("B")]);

    let output = compute_layout(input, &LayoutConfig::default(), &[NodeId::from("B")])?;
    assert_eq!(output.visible.nodes, vec![NodeId::from("A"), NodeId::from("B")]);
    assert_eq!(output.visible.edges.len(), 1);
    // Hidden nodes are still positioned so expanding does not need a relayout.
    assert_eq!(output.positions.len(), 3);
    Ok(())
}

#[test]
fn test_parallel_edges_and_dropped_references() -> anyhow::Result<()> {
    let input = GraphInput {
        nodes: vec![NodeInput::new("a"), NodeInput::new("b")],
        edges: vec![
            EdgeInput::new("p1", "a", "b"),
            EdgeInput::new("p2", "a", "b"),
            EdgeInput::new("back", "b", "a"),
            EdgeInput::new("dangling", "a", "ghost"),
        ],
    };
    let output = compute_layout(input, &LayoutConfig::default(), &[])?;

    let p1 = output.curve_offsets[&EdgeId::from("p1")];
    let p2 = output.curve_offsets[&EdgeId::from("p2")];
    assert!(p1 * p2 < 0.0);
    assert!(!output.curve_offsets.contains_key(&EdgeId::from("back")));
    assert_eq!(output.dropped_edges.len(), 1);
    assert_eq!(output.dropped_edges[0].id.as_str(), "dangling");
    Ok(())
}

#[test]
fn test_clusters_enclose_members_after_layout() -> anyhow::Result<()> {
    let nodes = (0..12)
        .map(|i| {
            let team = ["red", "green", "blue"][i % 3];
            NodeInput::new(format!("n{i}")).with_data(json!({ "team": team }))
        })
        .collect();
    let edges = (1..12)
        .map(|i| EdgeInput::new(format!("e{i}"), format!("n{}", i - 1), format!("n{i}")))
        .collect();
    let config = LayoutConfig {
        cluster_attribute: Some("team".to_string()),
        sizing_type: SizingType::Centrality,
        ..Default::default()
    };
    let output = compute_layout(GraphInput { nodes, edges }, &config, &[])?;

    let labels: Vec<&str> = output.clusters.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["blue", "green", "red"]);
    for cluster in &output.clusters {
        assert_eq!(cluster.members.len(), 4);
        for member in &cluster.members {
            let p = output.positions[member];
            let size = output.sizes[member];
            assert!(cluster.position.distance(p) + size <= cluster.radius + 1e-3);
        }
    }
    Ok(())
}

#[test]
fn test_empty_graph_yields_empty_output() -> anyhow::Result<()> {
    let output = compute_layout(GraphInput::default(), &LayoutConfig::default(), &[])?;
    assert!(output.positions.is_empty());
    assert!(output.clusters.is_empty());
    assert!(output.visible.nodes.is_empty());
    assert_eq!(output.stats.iterations, 1);
    Ok(())
}

#[test]
fn test_no_overlap_post_pass_separates_nodes() -> anyhow::Result<()> {
    let nodes = (0..20).map(|i| NodeInput::new(format!("n{i}"))).collect();
    let config = LayoutConfig {
        mode: LayoutMode::Concentric,
        sizing_type: SizingType::None,
        default_size: 12.0,
        node_spacing: 5.0,
        link_distance: 10.0,
        no_overlap: true,
        overlap_iterations: 5000,
        max_iterations: 5000,
        ..Default::default()
    };
    let output = compute_layout(GraphInput { nodes, edges: vec![] }, &config, &[])?;
    assert_eq!(output.layout, LayoutKind::Concentric);

    let overlap = output.overlap.expect("post-pass attached");
    assert!(!overlap.cap_reached);
    assert!(output.stats.converged);

    let points: Vec<Vec3> = output.positions.values().copied().collect();
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            assert!(a.distance(*b) + 1e-3 >= 12.0 + 12.0 + config.margin);
        }
    }
    Ok(())
}

fn star_input(leaves: usize) -> GraphInput {
    let mut nodes = vec![NodeInput::new("root")];
    nodes.extend((0..leaves).map(|i| NodeInput::new(format!("c{i}"))));
    let edges = (0..leaves)
        .map(|i| EdgeInput::new(format!("e{i}"), "root", format!("c{i}")))
        .collect();
    GraphInput { nodes, edges }
}

#[test]
fn test_no_overlap_keeps_top_down_levels() -> anyhow::Result<()> {
    let config = LayoutConfig {
        mode: LayoutMode::Hierarchical,
        dag_mode: Some(DagMode::Td),
        sizing_type: SizingType::None,
        default_size: 15.0,
        no_overlap: true,
        overlap_iterations: 2000,
        max_iterations: 5000,
        ..Default::default()
    };
    let output = compute_layout(star_input(12), &config, &[])?;
    let overlap = output.overlap.expect("post-pass attached");

    let root_y = output.positions[&NodeId::from("root")].y;
    let level_y = output.positions[&NodeId::from("c0")].y;
    assert!(root_y < level_y);
    for i in 0..12 {
        let p = output.positions[&NodeId::from(format!("c{i}"))];
        assert_eq!(p.y, level_y, "c{i} left its level");
        assert_eq!(p.z, 0.0);
    }

    if !overlap.cap_reached {
        let points: Vec<Vec3> = output.positions.values().copied().collect();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) + 1e-3 >= 15.0 + 15.0 + config.margin);
            }
        }
    }
    Ok(())
}

#[test]
fn test_no_overlap_keeps_radial_rings() -> anyhow::Result<()> {
    let config = LayoutConfig {
        mode: LayoutMode::Radial,
        dag_mode: Some(DagMode::RadialOut),
        sizing_type: SizingType::None,
        default_size: 5.0,
        no_overlap: true,
        overlap_iterations: 200,
        ..Default::default()
    };
    let output = compute_layout(star_input(8), &config, &[])?;
    assert!(output.overlap.is_some());

    assert_eq!(output.positions[&NodeId::from("root")], Vec3::ZERO);
    let ring = output.positions[&NodeId::from("c0")].length();
    assert!(ring > 0.0);
    for i in 0..8 {
        let p = output.positions[&NodeId::from(format!("c{i}"))];
        assert!((p.length() - ring).abs() < 1e-3, "c{i} left its ring");
    }
    Ok(())
}

#[test]
fn test_overlap_cap_is_reported_in_output() -> anyhow::Result<()> {
    let nodes = (0..20).map(|i| NodeInput::new(format!("n{i}"))).collect();
    let config = LayoutConfig {
        mode: LayoutMode::Concentric,
        sizing_type: SizingType::None,
        default_size: 12.0,
        link_distance: 1.0,
        node_spacing: 1.0,
        no_overlap: true,
        overlap_iterations: 1,
        ..Default::default()
    };
    let output = compute_layout(GraphInput { nodes, edges: vec![] }, &config, &[])?;
    let overlap = output.overlap.expect("post-pass attached");
    assert!(overlap.cap_reached);
    assert_eq!(overlap.sweeps, 1);
    assert!(output.stats.cap_reached);
    assert!(!output.stats.converged);
    Ok(())
}

#[test]
fn test_custom_provider_and_config_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("layout.json");
    fs::write(&path, r#"{ "mode": "custom", "sizingType": "none" }"#)?;
    let config = LayoutConfig::load(&path)?;

    assert!(compute_layout(chain_input(), &config, &[]).is_err());

    let provider = |node: &GraphNode, model: &GraphModel| {
        let idx = model.index_of(&node.id).map(|i| i.0).unwrap_or(0);
        Vec3::planar(idx as f32 * 100.0, 0.0)
    };
    let output = compute_custom_layout(chain_input(), &config, &[], &provider)?;
    assert_eq!(output.layout, LayoutKind::Custom);
    assert_eq!(output.positions[&NodeId::from("c")], Vec3::planar(200.0, 0.0));
    Ok(())
}

#[test]
fn test_drag_pins_node_during_run() -> anyhow::Result<()> {
    let input = chain_input();
    let (mut model, _) = GraphModel::build(input.nodes, input.edges);
    let config = LayoutConfig::default();
    let mut runner = LayoutRunner::new(Layout::from_config(&model, &config)?, &config);
    for _ in 0..10 {
        runner.step();
    }

    let drop_point = Vec3::planar(250.0, 250.0);
    runner
        .layout_mut()
        .pin(&"b".into(), Pin::at(drop_point));
    runner.run();
    runner.apply(&mut model);
    assert_eq!(model.get_node(&"b".into()).and_then(|n| n.position), Some(drop_point));
    Ok(())
}
