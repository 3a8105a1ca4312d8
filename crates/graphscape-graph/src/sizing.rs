use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::{LayoutConfig, NodeId, SizingType};
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};

/// No computed size is ever smaller than this.
pub const MIN_SIZE_FLOOR: f32 = 1.0;

/// Sources handled per rayon task when accumulating betweenness.
const BETWEENNESS_CHUNK: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingOptions {
    pub sizing_type: SizingType,
    pub attribute: Option<String>,
    pub min_size: f32,
    pub max_size: f32,
    pub default_size: f32,
    pub pagerank_damping: f64,
    pub pagerank_iterations: usize,
    pub pagerank_epsilon: f64,
}

impl Default for SizingOptions {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

impl SizingOptions {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            sizing_type: config.sizing_type,
            attribute: config.sizing_attribute.clone(),
            min_size: config.min_size,
            max_size: config.max_size,
            default_size: config.default_size,
            pagerank_damping: 0.85,
            pagerank_iterations: 100,
            pagerank_epsilon: 1e-6,
        }
    }
}

/// Map every node to a size according to `options.sizing_type`.
pub fn node_sizes(model: &GraphModel, options: &SizingOptions) -> HashMap<NodeId, f32> {
    let sizes: Vec<f32> = match options.sizing_type {
        SizingType::None => {
            vec![options.default_size.max(MIN_SIZE_FLOOR); model.node_count()]
        }
        SizingType::Default => {
            let metric: Vec<Option<f64>> =
                degree_centrality(model).into_iter().map(Some).collect();
            scale_metric(&metric, options.min_size, options.max_size)
        }
        SizingType::Centrality => {
            let metric: Vec<Option<f64>> =
                betweenness_centrality(model).into_iter().map(Some).collect();
            scale_metric(&metric, options.min_size, options.max_size)
        }
        SizingType::Pagerank => {
            let metric: Vec<Option<f64>> = pagerank(
                model,
                options.pagerank_damping,
                options.pagerank_iterations,
                options.pagerank_epsilon,
            )
            .into_iter()
            .map(Some)
            .collect();
            scale_metric(&metric, options.min_size, options.max_size)
        }
        SizingType::Attribute => {
            let metric: Vec<Option<f64>> = match options.attribute.as_deref() {
                Some(attribute) => model
                    .nodes()
                    .iter()
                    .map(|node| node.attribute_number(attribute))
                    .collect(),
                None => {
                    tracing::warn!("Attribute sizing requested without an attribute name");
                    vec![None; model.node_count()]
                }
            };
            scale_metric(&metric, options.min_size, options.max_size)
        }
    };

    model
        .nodes()
        .iter()
        .zip(sizes)
        .map(|(node, size)| (node.id.clone(), size))
        .collect()
}

/// Write computed sizes back into the model.
pub fn apply_sizes(model: &mut GraphModel, sizes: &HashMap<NodeId, f32>) {
    let indices: Vec<_> = model.node_indices().collect();
    for idx in indices {
        if let Some(&size) = sizes.get(&model[idx].id) {
            model.set_size(idx, size);
        }
    }
}

/// Linear map of the metric onto `[min, max]`. Missing values and a degenerate
/// range map to `min`; everything is clamped to `MIN_SIZE_FLOOR`.
fn scale_metric(values: &[Option<f64>], min: f32, max: f32) -> Vec<f32> {
    let (lo, hi) = values
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;

    values
        .iter()
        .map(|value| {
            let size = match value {
                Some(v) if span > f64::EPSILON => {
                    min + ((v - lo) / span) as f32 * (max - min)
                }
                _ => min,
            };
            size.max(MIN_SIZE_FLOOR)
        })
        .collect()
}

/// In + out edge count per node.
pub fn degree_centrality(model: &GraphModel) -> Vec<f64> {
    model
        .node_indices()
        .map(|idx| model.degree(idx) as f64)
        .collect()
}

/// Directed, unweighted betweenness (Brandes).
///
/// Per-source passes run on rayon in fixed-size chunks; partial sums are
/// combined in chunk order so repeated runs give bit-identical results.
pub fn betweenness_centrality(model: &GraphModel) -> Vec<f64> {
    let n = model.node_count();
    let sources: Vec<usize> = (0..n).collect();

    let partials: Vec<Vec<f64>> = sources
        .par_chunks(BETWEENNESS_CHUNK)
        .map(|chunk| {
            let mut acc = vec![0.0; n];
            let mut scratch = BrandesScratch::new(n);
            for &source in chunk {
                scratch.accumulate(model, NodeIndex(source), &mut acc);
            }
            acc
        })
        .collect();

    let mut total = vec![0.0; n];
    for partial in partials {
        for (t, v) in total.iter_mut().zip(partial) {
            *t += v;
        }
    }
    total
}

struct BrandesScratch {
    stack: Vec<usize>,
    preds: Vec<Vec<usize>>,
    sigma: Vec<f64>,
    dist: Vec<i64>,
    delta: Vec<f64>,
    queue: VecDeque<usize>,
}

impl BrandesScratch {
    fn new(n: usize) -> Self {
        Self {
            stack: Vec::with_capacity(n),
            preds: vec![Vec::new(); n],
            sigma: vec![0.0; n],
            dist: vec![-1; n],
            delta: vec![0.0; n],
            queue: VecDeque::with_capacity(n),
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.queue.clear();
        for p in &mut self.preds {
            p.clear();
        }
        self.sigma.fill(0.0);
        self.dist.fill(-1);
        self.delta.fill(0.0);
    }

    fn accumulate(&mut self, model: &GraphModel, source: NodeIndex, acc: &mut [f64]) {
        self.reset();
        let s = source.0;
        self.sigma[s] = 1.0;
        self.dist[s] = 0;
        self.queue.push_back(s);

        while let Some(v) = self.queue.pop_front() {
            self.stack.push(v);
            for &w in model.outgoing(NodeIndex(v)) {
                let w = w.0;
                if self.dist[w] < 0 {
                    self.dist[w] = self.dist[v] + 1;
                    self.queue.push_back(w);
                }
                if self.dist[w] == self.dist[v] + 1 {
                    self.sigma[w] += self.sigma[v];
                    self.preds[w].push(v);
                }
            }
        }

        while let Some(w) = self.stack.pop() {
            for &v in &self.preds[w] {
                self.delta[v] += self.sigma[v] / self.sigma[w] * (1.0 + self.delta[w]);
            }
            if w != s {
                acc[w] += self.delta[w];
            }
        }
    }
}

/// PageRank with uniform teleport and dangling-mass redistribution.
/// Stops once the L1 change drops below `epsilon` or after `max_iterations`.
pub fn pagerank(model: &GraphModel, damping: f64, max_iterations: usize, epsilon: f64) -> Vec<f64> {
    let n = model.node_count();
    if n == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / n as f64;
    let mut rank = vec![uniform; n];

    for iteration in 0..max_iterations {
        let dangling: f64 = model
            .node_indices()
            .filter(|&idx| model.out_degree(idx) == 0)
            .map(|idx| rank[idx.0])
            .sum();
        let base = (1.0 - damping) * uniform + damping * dangling * uniform;
        let mut next = vec![base; n];

        for idx in model.node_indices() {
            let out = model.outgoing(idx);
            if out.is_empty() {
                continue;
            }
            let share = damping * rank[idx.0] / out.len() as f64;
            for target in out {
                next[target.0] += share;
            }
        }

        let change: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if change < epsilon {
            tracing::debug!("PageRank converged after {} iterations", iteration + 1);
            break;
        }
    }

    rank
}
