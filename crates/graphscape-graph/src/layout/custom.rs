use super::{LayoutStrategy, PositionTable};
use crate::graph::{GraphModel, GraphNode};
use graphscape_core::Vec3;

/// Caller-supplied placement. Any `Fn(&GraphNode, &GraphModel) -> Vec3` works.
pub trait PositionProvider {
    fn position(&self, node: &GraphNode, model: &GraphModel) -> Vec3;
}

impl<F> PositionProvider for F
where
    F: Fn(&GraphNode, &GraphModel) -> Vec3,
{
    fn position(&self, node: &GraphNode, model: &GraphModel) -> Vec3 {
        self(node, model)
    }
}

pub struct CustomLayout {
    table: PositionTable,
}

impl CustomLayout {
    pub fn new(model: &GraphModel, provider: &dyn PositionProvider) -> Self {
        let positions = model
            .nodes()
            .iter()
            .map(|node| {
                let mut p = provider.position(node, model);
                if !p.is_finite() {
                    tracing::warn!("Custom position for {} is not finite; using origin", node.id);
                    p = Vec3::ZERO;
                }
                node.pin.apply(&mut p);
                p
            })
            .collect();
        Self {
            table: PositionTable::from_model(model, positions),
        }
    }
}

impl LayoutStrategy for CustomLayout {
    fn step(&mut self) -> bool {
        false
    }

    fn positions(&self) -> &PositionTable {
        &self.table
    }
}
