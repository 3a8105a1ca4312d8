use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibleEntities {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

/// Tracks collapsed nodes and answers visibility questions over `parents`.
///
/// Parent data may be malformed (cycles, dangling ids); every walk keeps a
/// visited set and ignores parents missing from the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollapseResolver {
    collapsed: BTreeSet<NodeId>,
}

impl CollapseResolver {
    pub fn new<I, T>(collapsed: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self {
            collapsed: collapsed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn collapsed_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.collapsed.iter()
    }

    pub fn collapse(&mut self, id: NodeId) {
        self.collapsed.insert(id);
    }

    pub fn expand(&mut self, id: &NodeId) {
        self.collapsed.remove(id);
    }

    /// Flip the state of `id`; returns whether it is collapsed afterwards.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if self.collapsed.remove(&id) {
            false
        } else {
            self.collapsed.insert(id);
            true
        }
    }

    /// True iff `id` itself or any of its ancestors is collapsed.
    pub fn is_collapsed(&self, model: &GraphModel, id: &NodeId) -> bool {
        if self.collapsed.contains(id) {
            return true;
        }
        model
            .index_of(id)
            .is_some_and(|idx| self.has_collapsed_ancestor(model, idx))
    }

    fn has_collapsed_ancestor(&self, model: &GraphModel, start: NodeIndex) -> bool {
        if self.collapsed.is_empty() {
            return false;
        }
        let mut visited = HashSet::from([start]);
        let mut queue: VecDeque<NodeIndex> = model.parents_of(start).collect();
        while let Some(idx) = queue.pop_front() {
            if !visited.insert(idx) {
                continue;
            }
            if self.collapsed.contains(&model[idx].id) {
                return true;
            }
            queue.extend(model.parents_of(idx));
        }
        false
    }

    /// Collapsed ancestors that must be expanded to reveal `id`, root first.
    ///
    /// Every collapsed proper ancestor is listed, whichever parent chain it sits
    /// on, so expanding the whole path always reveals the target. Ancestors come
    /// out in depth-first post-order over `parents` (first-listed parent first),
    /// which puts every ancestor before its descendants. Unknown ids yield an
    /// empty path.
    pub fn expand_path_ids(&self, model: &GraphModel, id: &NodeId) -> Vec<NodeId> {
        let Some(target) = model.index_of(id) else {
            return Vec::new();
        };
        if self.collapsed.is_empty() {
            return Vec::new();
        }

        let mut visited = HashSet::from([target]);
        let mut order = Vec::new();
        // (node, its parents, next parent to visit)
        let mut stack = vec![(target, model.parents_of(target).collect::<Vec<_>>(), 0)];
        while let Some((idx, parents, next)) = stack.last_mut() {
            if let Some(&parent) = parents.get(*next) {
                *next += 1;
                if visited.insert(parent) {
                    let grandparents = model.parents_of(parent).collect();
                    stack.push((parent, grandparents, 0));
                }
                continue;
            }
            let done = *idx;
            stack.pop();
            if done != target {
                order.push(done);
            }
        }

        order
            .into_iter()
            .map(|idx| &model[idx].id)
            .filter(|ancestor| self.collapsed.contains(*ancestor))
            .cloned()
            .collect()
    }

    /// A node is hidden iff a proper ancestor is collapsed; an edge is visible iff
    /// both of its endpoints are.
    pub fn visible_entities(&self, model: &GraphModel) -> VisibleEntities {
        let visible: Vec<bool> = model
            .node_indices()
            .map(|idx| !self.has_collapsed_ancestor(model, idx))
            .collect();

        VisibleEntities {
            nodes: model
                .nodes()
                .iter()
                .zip(&visible)
                .filter(|(_, shown)| **shown)
                .map(|(node, _)| node.id.clone())
                .collect(),
            edges: model
                .edges()
                .iter()
                .filter(|edge| visible[edge.source_idx.0] && visible[edge.target_idx.0])
                .map(|edge| edge.id.clone())
                .collect(),
        }
    }
}
