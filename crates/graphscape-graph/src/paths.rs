use crate::graph::{GraphModel, NodeIndex};
use graphscape_core::NodeId;
use std::collections::VecDeque;

/// Fewest-hop path from `from` to `to`, both ends included.
///
/// Neighbors are visited in adjacency order, so ties resolve the same way on
/// every call. With `directed == false` edges are walked both ways.
pub fn shortest_path(
    model: &GraphModel,
    from: &NodeId,
    to: &NodeId,
    directed: bool,
) -> Option<Vec<NodeId>> {
    let start = model.index_of(from)?;
    let goal = model.index_of(to)?;

    let mut previous: Vec<Option<NodeIndex>> = vec![None; model.node_count()];
    let mut seen = vec![false; model.node_count()];
    let mut queue = VecDeque::from([start]);
    seen[start.0] = true;

    while let Some(idx) = queue.pop_front() {
        if idx == goal {
            let mut path = vec![model[idx].id.clone()];
            let mut cursor = idx;
            while let Some(prev) = previous[cursor.0] {
                path.push(model[prev].id.clone());
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }

        let incoming: &[NodeIndex] = if directed { &[] } else { model.incoming(idx) };
        for &next in model.outgoing(idx).iter().chain(incoming) {
            if !seen[next.0] {
                seen[next.0] = true;
                previous[next.0] = Some(idx);
                queue.push_back(next);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphscape_core::{EdgeInput, NodeInput};

    fn model() -> GraphModel {
        // a -> b -> c -> d, a -> x -> d, e isolated
        let nodes = ["a", "b", "c", "d", "x", "e"]
            .iter()
            .map(|id| NodeInput::new(*id))
            .collect();
        let edges = [("a", "b"), ("b", "c"), ("c", "d"), ("a", "x"), ("x", "d")]
            .iter()
            .enumerate()
            .map(|(i, (s, t))| EdgeInput::new(format!("e{i}"), *s, *t))
            .collect();
        GraphModel::build(nodes, edges).0
    }

    fn ids(path: &[&str]) -> Vec<NodeId> {
        path.iter().map(|id| NodeId::from(*id)).collect()
    }

    #[test]
    fn test_directed_shortest_path() {
        let m = model();
        assert_eq!(
            shortest_path(&m, &"a".into(), &"d".into(), true),
            Some(ids(&["a", "x", "d"]))
        );
        assert_eq!(shortest_path(&m, &"d".into(), &"a".into(), true), None);
    }

    #[test]
    fn test_undirected_walks_edges_backwards() {
        let m = model();
        assert_eq!(
            shortest_path(&m, &"d".into(), &"b".into(), false),
            Some(ids(&["d", "c", "b"]))
        );
    }

    #[test]
    fn test_trivial_and_missing() {
        let m = model();
        assert_eq!(shortest_path(&m, &"a".into(), &"a".into(), true), Some(ids(&["a"])));
        assert_eq!(shortest_path(&m, &"a".into(), &"e".into(), false), None);
        assert_eq!(shortest_path(&m, &"a".into(), &"zzz".into(), true), None);
    }
}
