use super::{Layout, LayoutStrategy};
use crate::cancellation::CancellationToken;
use crate::graph::GraphModel;
use graphscape_core::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How a run ended. Hitting a cap is reported here, never as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub iterations: usize,
    pub converged: bool,
    pub cap_reached: bool,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

/// Drives a layout synchronously until it settles or a cap is hit.
pub struct LayoutRunner {
    layout: Layout,
    max_iterations: usize,
    max_duration: Option<Duration>,
    cancellation: Option<CancellationToken>,
    stats: RunStats,
}

impl LayoutRunner {
    pub fn new(layout: Layout, config: &LayoutConfig) -> Self {
        Self {
            layout,
            max_iterations: config.max_iterations,
            max_duration: config.max_duration_ms.map(Duration::from_millis),
            cancellation: None,
            stats: RunStats::default(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Advance one step if no cap applies. Returns `true` while more work remains.
    pub fn step(&mut self) -> bool {
        if self.is_cancelled() {
            self.stats.cancelled = true;
            return false;
        }
        if self.stats.iterations >= self.max_iterations {
            self.stats.cap_reached = true;
            return false;
        }
        let running = self.layout.step();
        self.stats.iterations += 1;
        if !running {
            // An overlap pass that gave up leaves pairs overlapping.
            match self.layout.overlap_outcome() {
                Some(outcome) if outcome.cap_reached => self.stats.cap_reached = true,
                _ => self.stats.converged = true,
            }
        }
        running
    }

    pub fn run(&mut self) -> RunStats {
        let started = Instant::now();
        loop {
            if !self.step() {
                break;
            }
            if let Some(limit) = self.max_duration {
                if started.elapsed() >= limit {
                    self.stats.cap_reached = true;
                    break;
                }
            }
        }
        self.stats.elapsed_ms = started.elapsed().as_millis() as u64;

        if self.stats.cap_reached && !self.stats.converged {
            tracing::warn!(
                "Layout stopped after {} iterations without converging",
                self.stats.iterations
            );
        }
        tracing::debug!(
            "Layout run: {} iterations in {}ms (converged: {}, cancelled: {})",
            self.stats.iterations,
            self.stats.elapsed_ms,
            self.stats.converged,
            self.stats.cancelled
        );
        self.stats
    }

    /// Copy the last completed step's positions into the model.
    pub fn apply(&self, model: &mut GraphModel) {
        model.set_positions(self.layout.positions().indexed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphscape_core::{EdgeInput, LayoutMode, NodeInput, Vec3};

    fn chain(n: usize) -> GraphModel {
        let nodes = (0..n).map(|i| NodeInput::new(format!("n{i}"))).collect();
        let edges = (1..n)
            .map(|i| EdgeInput::new(format!("e{i}"), format!("n{}", i - 1), format!("n{i}")))
            .collect();
        GraphModel::build(nodes, edges).0
    }

    #[test]
    fn test_run_converges_and_applies() {
        let mut model = chain(5);
        let config = LayoutConfig::default();
        let mut runner = LayoutRunner::new(Layout::from_config(&model, &config).unwrap(), &config);
        let stats = runner.run();
        assert!(stats.converged);
        assert!(!stats.cap_reached);

        runner.apply(&mut model);
        for node in model.nodes() {
            assert_eq!(node.position, runner.layout().node_position(&node.id));
        }
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let mut model = chain(5);
        let config = LayoutConfig {
            max_iterations: 10,
            ..Default::default()
        };
        let mut runner = LayoutRunner::new(Layout::from_config(&model, &config).unwrap(), &config);
        let stats = runner.run();
        assert_eq!(stats.iterations, 10);
        assert!(stats.cap_reached);
        assert!(!stats.converged);

        runner.apply(&mut model);
        assert!(model.nodes().iter().all(|n| n.position.is_some_and(|p| p.is_finite())));
    }

    #[test]
    fn test_cancelled_run_keeps_last_step() {
        let model = chain(5);
        let config = LayoutConfig::default();
        let token = CancellationToken::new();
        let mut runner = LayoutRunner::new(Layout::from_config(&model, &config).unwrap(), &config)
            .with_cancellation(token.clone());

        assert!(runner.step());
        let after_one: Vec<Vec3> = runner.layout().positions().as_slice().to_vec();
        token.cancel();
        let stats = runner.run();
        assert!(stats.cancelled);
        assert_eq!(stats.iterations, 1);
        assert_eq!(runner.layout().positions().as_slice(), after_one.as_slice());
    }

    #[test]
    fn test_overlap_cap_is_reported_in_stats() {
        let nodes = (0..20).map(|i| NodeInput::new(format!("n{i}"))).collect();
        let model = GraphModel::build(nodes, vec![]).0;
        let config = LayoutConfig {
            mode: LayoutMode::Circular,
            circle_radius: 1.0,
            node_spacing: 1.0,
            no_overlap: true,
            overlap_iterations: 1,
            ..Default::default()
        };
        let mut runner = LayoutRunner::new(Layout::from_config(&model, &config).unwrap(), &config);
        let stats = runner.run();
        assert!(stats.cap_reached);
        assert!(!stats.converged);
        let outcome = runner.layout().overlap_outcome().unwrap();
        assert!(outcome.cap_reached);
        assert_eq!(outcome.sweeps, 1);
    }

    #[test]
    fn test_closed_form_layout_takes_one_step() {
        let model = chain(4);
        let config = LayoutConfig {
            mode: LayoutMode::Circular,
            ..Default::default()
        };
        let mut runner = LayoutRunner::new(Layout::from_config(&model, &config).unwrap(), &config);
        let stats = runner.run();
        assert_eq!(stats.iterations, 1);
        assert!(stats.converged);
    }
}
