//! Greedy path reconstruction from a cost-to-go function.
//!
//! Given \(J\), the optimal move from `v` is \(\arg\min_w \bigl(c(v,w) + J(w)\bigr)\).
//! Ties go to the lowest node index, so reconstruction is reproducible.

use crate::graph::Graph;

/// Errors for path reconstruction.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Node index out of bounds.
    #[error("node {node} out of bounds for n={n}")]
    NodeOutOfBounds {
        /// The index.
        node: usize,
        /// Number of nodes in the graph.
        n: usize,
    },
    /// The requested destination is not the graph's terminal node.
    #[error("destination {given} is not the graph's terminal node {terminal}")]
    WrongDestination {
        /// The requested destination.
        given: usize,
        /// The graph's destination.
        terminal: usize,
    },
    /// Value vector does not match the graph.
    #[error("value vector has length {len}, graph has {n} nodes")]
    LengthMismatch {
        /// The provided length.
        len: usize,
        /// Number of nodes in the graph.
        n: usize,
    },
    /// `J[source]` is infinite: no path exists.
    #[error("destination unreachable from node {node}")]
    Unreachable {
        /// The source node.
        node: usize,
    },
    /// The walk reached a node with no finite successor (the values are not a fixed point).
    #[error("walk stopped at node {node}: no finite successor")]
    DeadEnd {
        /// Where the walk got stuck.
        node: usize,
    },
    /// The walk came back to a node it had already left.
    #[error("walk revisited node {node}")]
    Cycle {
        /// The revisited node.
        node: usize,
    },
}

/// Convenience result type for this module.
pub type Result<T> = std::result::Result<T, Error>;

/// An optimal path and its total cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Visited nodes, from source to destination inclusive.
    pub nodes: Vec<usize>,
    /// Sum of edge costs along `nodes`.
    pub cost: f64,
}

impl Path {
    /// Number of edges.
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// `true` when source and destination coincide.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consecutive `(from, to)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes.windows(2).map(|w| (w[0], w[1]))
    }
}

fn check(j: &[f64], graph: &Graph, node: usize) -> Result<()> {
    let n = graph.len();
    if j.len() != n {
        return Err(Error::LengthMismatch { len: j.len(), n });
    }
    if node >= n {
        return Err(Error::NodeOutOfBounds { node, n });
    }
    Ok(())
}

// Lowest-index argmin of c(v, w) + J[w] over successors, skipping v itself.
// Returns `(w, c(v, w))`, or `None` if every candidate is infinite.
fn greedy_successor(j: &[f64], graph: &Graph, v: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for &(w, cost) in graph.successors(v) {
        if w == v {
            continue;
        }
        let total = cost + j[w];
        if !total.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, _, b)| total < b) {
            best = Some((w, cost, total));
        }
    }
    best.map(|(w, cost, _)| (w, cost))
}

/// Walk greedily from `source` to `destination` under the cost-to-go `j`.
///
/// `destination` must be the graph's terminal node. Fails up front with
/// [`Error::Unreachable`] when `j[source]` is infinite, and with
/// [`Error::Cycle`] rather than looping if `j` steers the walk in a circle.
pub fn extract_path(j: &[f64], graph: &Graph, source: usize, destination: usize) -> Result<Path> {
    check(j, graph, source)?;
    if destination >= graph.len() {
        return Err(Error::NodeOutOfBounds {
            node: destination,
            n: graph.len(),
        });
    }
    if destination != graph.destination() {
        return Err(Error::WrongDestination {
            given: destination,
            terminal: graph.destination(),
        });
    }
    if !j[source].is_finite() {
        return Err(Error::Unreachable { node: source });
    }

    let mut visited = vec![false; graph.len()];
    let mut nodes = vec![source];
    let mut cost = 0.0;
    let mut current = source;
    visited[source] = true;

    while current != destination {
        let (next, step) =
            greedy_successor(j, graph, current).ok_or(Error::DeadEnd { node: current })?;
        if std::mem::replace(&mut visited[next], true) {
            return Err(Error::Cycle { node: next });
        }
        cost += step;
        nodes.push(next);
        current = next;
    }

    Ok(Path { nodes, cost })
}

/// Greedy successor of every node under `j`.
///
/// `None` for the destination and for nodes with no finite successor.
pub fn policy(j: &[f64], graph: &Graph) -> Result<Vec<Option<usize>>> {
    check(j, graph, graph.destination())?;
    Ok((0..graph.len())
        .map(|v| {
            if v == graph.destination() {
                None
            } else {
                greedy_successor(j, graph, v).map(|(w, _)| w)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bellman::{compute_cost_to_go, SolverConfig};
    use crate::graph::Edge;
    use proptest::prelude::*;

    const INF: f64 = f64::INFINITY;
    const J7: [f64; 7] = [8.0, 10.0, 3.0, 5.0, 4.0, 1.0, 0.0];

    fn seven_node() -> Graph {
        Graph::new(
            7,
            6,
            &[
                Edge::new(0, 1, 1.0),
                Edge::new(0, 2, 5.0),
                Edge::new(0, 3, 3.0),
                Edge::new(1, 3, 9.0),
                Edge::new(1, 4, 6.0),
                Edge::new(2, 5, 2.0),
                Edge::new(3, 5, 4.0),
                Edge::new(3, 6, 8.0),
                Edge::new(4, 6, 4.0),
                Edge::new(5, 6, 1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn ties_go_to_lowest_index() {
        // From A both C (5 + 3) and D (3 + 5) cost 8; C wins.
        let path = extract_path(&J7, &seven_node(), 0, 6).unwrap();
        assert_eq!(path.nodes, vec![0, 2, 5, 6]);
        assert_eq!(path.cost, 8.0);
        assert_eq!(path.len(), 3);
        assert_eq!(path.edges().collect::<Vec<_>>(), vec![(0, 2), (2, 5), (5, 6)]);
    }

    #[test]
    fn every_start_costs_its_value() {
        let g = seven_node();
        for source in 0..7 {
            let path = extract_path(&J7, &g, source, 6).unwrap();
            assert_eq!(path.cost, J7[source], "source {source}");
            assert_eq!(path.nodes.last(), Some(&6));
        }
    }

    #[test]
    fn destination_to_itself_is_empty() {
        let path = extract_path(&J7, &seven_node(), 6, 6).unwrap();
        assert_eq!(path.nodes, vec![6]);
        assert_eq!(path.cost, 0.0);
        assert!(path.is_empty());
    }

    #[test]
    fn policy_follows_the_argmin() {
        let p = policy(&J7, &seven_node()).unwrap();
        assert_eq!(p, vec![Some(2), Some(4), Some(5), Some(5), Some(6), Some(6), None]);
    }

    #[test]
    fn unreachable_source_fails_up_front() {
        let g = Graph::new(3, 2, &[Edge::new(0, 1, 1.0)]).unwrap();
        let vf = compute_cost_to_go(&g, &SolverConfig::default()).unwrap();
        assert_eq!(
            extract_path(vf.values(), &g, 0, 2),
            Err(Error::Unreachable { node: 0 })
        );
        assert_eq!(policy(vf.values(), &g).unwrap(), vec![None, None, None]);
    }

    #[test]
    fn source_on_a_closed_cycle_is_unreachable() {
        // 3 <-> 4 never leads to the destination 2.
        let g = Graph::new(
            5,
            2,
            &[
                Edge::new(0, 2, 1.0),
                Edge::new(1, 2, 1.0),
                Edge::new(3, 4, 1.0),
                Edge::new(4, 3, 1.0),
            ],
        )
        .unwrap();
        let vf = compute_cost_to_go(&g, &SolverConfig::default()).unwrap();
        assert_eq!(
            extract_path(vf.values(), &g, 3, 2),
            Err(Error::Unreachable { node: 3 })
        );
        assert_eq!(extract_path(vf.values(), &g, 0, 2).unwrap().nodes, vec![0, 2]);
    }

    #[test]
    fn non_fixed_point_values_cannot_loop_forever() {
        // 0 <-> 1 at cost 1, and 1 -> 2 at cost 5. With J = 0 the walk bounces.
        let g = Graph::new(
            3,
            2,
            &[Edge::new(0, 1, 1.0), Edge::new(1, 0, 1.0), Edge::new(1, 2, 5.0)],
        )
        .unwrap();
        assert_eq!(
            extract_path(&[0.0; 3], &g, 0, 2),
            Err(Error::Cycle { node: 0 })
        );
    }

    #[test]
    fn finite_value_with_no_way_out_is_a_dead_end() {
        let g = Graph::new(3, 2, &[Edge::new(0, 1, 1.0)]).unwrap();
        assert_eq!(
            extract_path(&[1.0, 0.0, 0.0], &g, 0, 2),
            Err(Error::DeadEnd { node: 1 })
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        let g = seven_node();
        assert_eq!(
            extract_path(&J7, &g, 9, 6),
            Err(Error::NodeOutOfBounds { node: 9, n: 7 })
        );
        assert_eq!(
            extract_path(&J7, &g, 0, 7),
            Err(Error::NodeOutOfBounds { node: 7, n: 7 })
        );
        assert_eq!(
            extract_path(&J7, &g, 0, 5),
            Err(Error::WrongDestination { given: 5, terminal: 6 })
        );
        assert_eq!(
            extract_path(&J7[..3], &g, 0, 6),
            Err(Error::LengthMismatch { len: 3, n: 7 })
        );
        assert_eq!(
            policy(&[INF; 2], &g),
            Err(Error::LengthMismatch { len: 2, n: 7 })
        );
    }

    proptest! {
        #[test]
        fn path_cost_matches_value_on_random_graphs(
            costs in proptest::collection::vec(proptest::option::of(1.0f64..50.0), 36)
        ) {
            // Arbitrary digraph on 6 nodes (cycles allowed), destination 5,
            // plus an expensive fallback edge so every node reaches it.
            let n = 6;
            let mut edges: Vec<Edge> = costs
                .iter()
                .enumerate()
                .filter_map(|(k, c)| c.map(|c| Edge::new(k / n, k % n, c)))
                .filter(|e| e.from != e.to && e.from != n - 1)
                .collect();
            for v in 0..n - 1 {
                if !edges.iter().any(|e| e.from == v && e.to == n - 1) {
                    edges.push(Edge::new(v, n - 1, 60.0));
                }
            }
            let g = Graph::new(n, n - 1, &edges).unwrap();
            let vf = compute_cost_to_go(&g, &SolverConfig::default()).unwrap();
            prop_assert!(vf.is_converged());
            for source in 0..n {
                let path = extract_path(vf.values(), &g, source, n - 1).unwrap();
                let summed: f64 = path.edges().map(|(v, w)| g.cost(v, w)).sum();
                prop_assert!((path.cost - vf.values()[source]).abs() <= 1e-8);
                prop_assert!((summed - path.cost).abs() <= 1e-8);
            }
        }
    }
}
