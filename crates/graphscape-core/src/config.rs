use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Physics,
    Hierarchical,
    Radial,
    Circular,
    Concentric,
    Custom,
}

/// Direction of a hierarchical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DagMode {
    Td,
    Bu,
    Lr,
    Rl,
    Zout,
    Zin,
    RadialOut,
    RadialIn,
}

impl DagMode {
    pub fn is_radial(self) -> bool {
        matches!(self, DagMode::RadialIn | DagMode::RadialOut)
    }

    /// Axis pinned by depth (0 = x, 1 = y, 2 = z) and whether depth grows along
    /// the positive direction. Radial modes have no pinned axis.
    pub fn level_axis(self) -> Option<(usize, bool)> {
        match self {
            DagMode::Td => Some((1, true)),
            DagMode::Bu => Some((1, false)),
            DagMode::Lr => Some((0, true)),
            DagMode::Rl => Some((0, false)),
            DagMode::Zout => Some((2, true)),
            DagMode::Zin => Some((2, false)),
            DagMode::RadialOut | DagMode::RadialIn => None,
        }
    }

    pub fn needs_depth_axis(self) -> bool {
        matches!(self, DagMode::Zin | DagMode::Zout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizingType {
    None,
    #[default]
    Default,
    Centrality,
    Pagerank,
    Attribute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub mode: LayoutMode,
    pub dag_mode: Option<DagMode>,
    pub dimensions: u8,

    // Sizing
    pub sizing_type: SizingType,
    pub sizing_attribute: Option<String>,
    pub min_size: f32,
    pub max_size: f32,
    pub default_size: f32,

    // Clustering
    pub cluster_attribute: Option<String>,
    pub cluster_strength: f32,
    pub cluster_inter_strength: f32,
    pub cluster_padding: f32,

    // Simulation
    pub iterations: usize,
    pub max_iterations: usize,
    pub max_duration_ms: Option<u64>,
    pub seed: u64,
    pub node_strength: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub barnes_hut_optimize: bool,
    pub barnes_hut_theta: f32,
    pub gravity: f32,
    pub strong_gravity_mode: bool,
    pub lin_log_mode: bool,
    pub scaling_ratio: f32,
    pub edge_weight_influence: f32,
    pub level_ratio: f32,

    // Closed-form layouts
    pub circle_radius: f32,
    pub node_spacing: f32,

    // Overlap removal
    pub no_overlap: bool,
    pub grid_size: f32,
    pub margin: f32,
    pub overlap_iterations: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Physics,
            dag_mode: None,
            dimensions: 2,
            sizing_type: SizingType::Default,
            sizing_attribute: None,
            min_size: 5.0,
            max_size: 15.0,
            default_size: 7.0,
            cluster_attribute: None,
            cluster_strength: 0.5,
            cluster_inter_strength: 0.1,
            cluster_padding: 20.0,
            iterations: 300,
            max_iterations: 1000,
            max_duration_ms: None,
            seed: 42,
            node_strength: -250.0,
            link_distance: 50.0,
            link_strength: 1.0,
            velocity_decay: 0.4,
            alpha_min: 0.001,
            barnes_hut_optimize: false,
            barnes_hut_theta: 0.5,
            gravity: 1.0,
            strong_gravity_mode: false,
            lin_log_mode: false,
            scaling_ratio: 1.0,
            edge_weight_influence: 1.0,
            level_ratio: 2.0,
            circle_radius: 300.0,
            node_spacing: 30.0,
            no_overlap: false,
            grid_size: 20.0,
            margin: 5.0,
            overlap_iterations: 500,
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The hierarchical direction actually requested by this configuration.
    ///
    /// `hierarchical` defaults to top-down, `radial` always resolves to a radial
    /// direction, and `physics` honours an explicit `dag_mode` as a force-guided tree.
    pub fn effective_dag_mode(&self) -> Option<DagMode> {
        match self.mode {
            LayoutMode::Hierarchical => Some(self.dag_mode.unwrap_or(DagMode::Td)),
            LayoutMode::Radial => Some(
                self.dag_mode
                    .filter(|mode| mode.is_radial())
                    .unwrap_or(DagMode::RadialOut),
            ),
            LayoutMode::Physics => self.dag_mode,
            LayoutMode::Circular | LayoutMode::Concentric | LayoutMode::Custom => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.dimensions, 2 | 3) {
            return Err(ConfigError::InvalidDimensions(self.dimensions));
        }
        if !(self.barnes_hut_theta.is_finite() && self.barnes_hut_theta > 0.0) {
            return Err(ConfigError::InvalidTheta(self.barnes_hut_theta));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::InvalidSizeRange {
                min: self.min_size,
                max: self.max_size,
            });
        }
        Self::check_positive("minSize", self.min_size)?;
        Self::check_positive("defaultSize", self.default_size)?;
        Self::check_positive("linkDistance", self.link_distance)?;
        Self::check_positive("gridSize", self.grid_size)?;
        Self::check_positive("nodeSpacing", self.node_spacing)?;
        Self::check_positive("circleRadius", self.circle_radius)?;
        if self.iterations == 0 {
            return Err(ConfigError::OutOfRange {
                field: "iterations",
                value: 0.0,
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::OutOfRange {
                field: "maxIterations",
                value: 0.0,
            });
        }
        if !(0.0..=1.0).contains(&self.velocity_decay) {
            return Err(ConfigError::OutOfRange {
                field: "velocityDecay",
                value: self.velocity_decay as f64,
            });
        }
        if !(self.alpha_min > 0.0 && self.alpha_min < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "alphaMin",
                value: self.alpha_min as f64,
            });
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "margin",
                value: self.margin as f64,
            });
        }
        if self.sizing_type == SizingType::Attribute && self.sizing_attribute.is_none() {
            return Err(ConfigError::MissingSizingAttribute);
        }
        Ok(())
    }

    fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value: value as f64,
            })
        }
    }
}
