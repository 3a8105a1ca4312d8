use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod error;
pub mod geometry;

pub use config::{DagMode, LayoutConfig, LayoutMode, SizingType};
pub use error::ConfigError;
pub use geometry::Vec3;

#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A node as supplied by the caller, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInput {
    pub id: NodeId,
    /// Multi-parent hierarchy used for collapsing.
    #[serde(default)]
    pub parents: Vec<NodeId>,
    /// Free-form payload; clustering and attribute sizing read fields from it.
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub label: Option<String>,
}

impl NodeInput {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_parents<I, T>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInput {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub weight: Option<f32>,
}

impl EdgeInput {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Graph file format accepted by the CLI and the layout pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphInput {
    pub nodes: Vec<NodeInput>,
    pub edges: Vec<EdgeInput>,
}

impl GraphInput {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-axis position overrides. A `Some` axis is held fixed by every layout step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    pub fz: Option<f32>,
}

impl Pin {
    pub const NONE: Self = Self {
        fx: None,
        fy: None,
        fz: None,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            fx: Some(position.x),
            fy: Some(position.y),
            fz: Some(position.z),
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some() || self.fz.is_some()
    }

    /// Axis-wise merge where `self` wins over `fallback`.
    pub fn or(self, fallback: Pin) -> Pin {
        Pin {
            fx: self.fx.or(fallback.fx),
            fy: self.fy.or(fallback.fy),
            fz: self.fz.or(fallback.fz),
        }
    }

    pub fn axis(&self, axis: usize) -> Option<f32> {
        match axis {
            0 => self.fx,
            1 => self.fy,
            _ => self.fz,
        }
    }

    pub fn apply(&self, position: &mut Vec3) {
        if let Some(x) = self.fx {
            position.x = x;
        }
        if let Some(y) = self.fy {
            position.y = y;
        }
        if let Some(z) = self.fz {
            position.z = z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_input_deserialization() {
        let json = r#"{
            "nodes": [{"id": "a"}, {"id": "b", "parents": ["a"], "data": {"team": "x"}}],
            "edges": [{"id": "e1", "source": "a", "target": "b", "weight": 2.5}]
        }"#;
        let input = GraphInput::from_json_str(json).unwrap();
        assert_eq!(input.nodes.len(), 2);
        assert_eq!(input.nodes[1].parents, vec![NodeId::from("a")]);
        assert_eq!(input.nodes[1].data["team"], "x");
        assert_eq!(input.edges[0].weight, Some(2.5));
    }

    #[test]
    fn test_graph_input_rejects_garbage() {
        let err = GraphInput::from_json_str("{nodes: oops").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_pin_merge_prefers_self() {
        let drag = Pin {
            fx: Some(1.0),
            fy: None,
            fz: None,
        };
        let lock = Pin {
            fx: Some(5.0),
            fy: Some(7.0),
            fz: None,
        };
        let merged = drag.or(lock);
        assert_eq!(merged.fx, Some(1.0));
        assert_eq!(merged.fy, Some(7.0));
        assert!(merged.fz.is_none());

        let mut pos = Vec3::ZERO;
        merged.apply(&mut pos);
        assert_eq!(pos, Vec3::new(1.0, 7.0, 0.0));
    }
}
