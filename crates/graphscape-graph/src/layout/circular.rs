use super::{LayoutStrategy, PositionTable};
use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::{LayoutConfig, Vec3};
use std::f32::consts::TAU;

/// All nodes on one ring in arena order. Positions are final after construction.
pub struct CircularLayout {
    table: PositionTable,
    radius: f32,
}

impl CircularLayout {
    pub fn new(model: &GraphModel, config: &LayoutConfig) -> Self {
        let n = model.node_count();
        let radius = config
            .circle_radius
            .max(n as f32 * config.node_spacing / TAU);
        let positions = (0..n)
            .map(|i| {
                let angle = TAU * i as f32 / n as f32;
                Vec3::planar(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        Self {
            table: PositionTable::from_model(model, positions),
            radius,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl LayoutStrategy for CircularLayout {
    fn step(&mut self) -> bool {
        false
    }

    fn positions(&self) -> &PositionTable {
        &self.table
    }
}

/// Rings of decreasing degree: the best-connected node sits at the center and
/// each following ring, `link_distance` further out, holds as many nodes as fit
/// at `node_spacing` apart.
pub struct ConcentricLayout {
    table: PositionTable,
    rings: usize,
}

impl ConcentricLayout {
    pub fn new(model: &GraphModel, config: &LayoutConfig) -> Self {
        let n = model.node_count();
        let mut order: Vec<usize> = (0..n).collect();
        // Stable, so ties keep arena order.
        order.sort_by_key(|&i| std::cmp::Reverse(model.degree(NodeIndex(i))));

        let mut positions = vec![Vec3::ZERO; n];
        let mut placed = 0;
        let mut ring = 0;
        while placed < n {
            let radius = ring as f32 * config.link_distance;
            let capacity = if ring == 0 {
                1
            } else {
                ((TAU * radius / config.node_spacing).floor() as usize).max(1)
            };
            let members = &order[placed..placed.saturating_add(capacity).min(n)];
            for (slot, &node) in members.iter().enumerate() {
                let angle = TAU * slot as f32 / members.len() as f32;
                positions[node] = Vec3::planar(radius * angle.cos(), radius * angle.sin());
            }
            placed += members.len();
            ring += 1;
        }

        Self {
            table: PositionTable::from_model(model, positions),
            rings: ring,
        }
    }

    pub fn ring_count(&self) -> usize {
        self.rings
    }
}

impl LayoutStrategy for ConcentricLayout {
    fn step(&mut self) -> bool {
        false
    }

    fn positions(&self) -> &PositionTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphscape_core::{EdgeInput, NodeInput};

    fn star(leaves: usize) -> GraphModel {
        let mut nodes = vec![NodeInput::new("hub")];
        nodes.extend((0..leaves).map(|i| NodeInput::new(format!("l{i}"))));
        let edges = (0..leaves)
            .map(|i| EdgeInput::new(format!("e{i}"), "hub", format!("l{i}")))
            .collect();
        GraphModel::build(nodes, edges).0
    }

    #[test]
    fn test_circle_nodes_share_radius() {
        let model = star(7);
        let mut layout = CircularLayout::new(&model, &LayoutConfig::default());
        assert!(!layout.step());
        for (_, p) in layout.positions().iter() {
            assert!((p.length() - 300.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_circle_grows_to_fit_spacing() {
        let model = star(99);
        let config = LayoutConfig::default();
        let layout = CircularLayout::new(&model, &config);
        let expected = 100.0 * config.node_spacing / TAU;
        assert!((layout.radius() - expected).abs() < 1e-3);
        assert!(expected > config.circle_radius);
    }

    #[test]
    fn test_concentric_puts_hub_in_the_middle() {
        let model = star(40);
        let config = LayoutConfig::default();
        let layout = ConcentricLayout::new(&model, &config);
        assert_eq!(layout.node_position(&"hub".into()), Some(Vec3::ZERO));
        // 50 units out fits floor(2π·50/30) = 10 nodes, 100 units out fits 20.
        assert_eq!(layout.ring_count(), 4);
        let first = layout.node_position(&"l0".into()).unwrap();
        assert!((first.length() - config.link_distance).abs() < 1e-3);
    }

    #[test]
    fn test_concentric_unbounded_ring_capacity() {
        let model = star(5);
        let config = LayoutConfig {
            node_spacing: f32::MIN_POSITIVE,
            ..Default::default()
        };
        let layout = ConcentricLayout::new(&model, &config);
        assert_eq!(layout.ring_count(), 2);
        assert!(layout.positions().iter().all(|(_, p)| p.is_finite()));
    }
}
