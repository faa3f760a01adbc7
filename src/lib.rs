//! Shortest paths by successive approximation of the Bellman equation.
//!
//! A deterministic shortest-path problem is a weighted directed graph with a
//! terminal node. Its cost-to-go \(J\) solves
//! \[
//! J(v) = \min_w \bigl( c(v, w) + J(w) \bigr), \qquad J(\text{destination}) = 0,
//! \]
//! and an optimal path follows the minimizing `w` from any start.
//!
//! Pipeline:
//! - [`graph`]: the cost function, stored as sorted successor lists.
//! - [`parse`]: the `node<id>, node<dest> <cost>, ...` text format.
//! - [`bellman`]: the operator and the fixed-point iteration.
//! - [`path`]: greedy reconstruction of the optimal path.
//!
//! Public invariants (must not change):
//! - APIs are slice-based with `Vec<f64>` outputs; `+inf` means "no edge" / "unreachable".
//! - Numeric code is deterministic; ties go to the lowest node index.
//! - Stopping parameters are explicit and validated (no global configuration).
//!
//! ```
//! use shortpath::{parse_graph, solve, SolverConfig};
//!
//! let graph = parse_graph("node0, node1 2, node2 5\nnode1, node2 1\nnode2,\n").unwrap();
//! let solution = solve(&graph, 0, &SolverConfig::default()).unwrap();
//! assert_eq!(solution.value_function.values(), &[3.0, 1.0, 0.0]);
//! assert_eq!(solution.path.nodes, vec![0, 1, 2]);
//! ```

use std::path::{Path as FsPath, PathBuf};

pub mod bellman;
pub mod graph;
pub mod parse;
pub mod path;

pub use bellman::{
    bellman, compute_cost_to_go, compute_cost_to_go_from, BellmanIterates, Convergence,
    SolverConfig, ValueFunction,
};
pub use graph::{Edge, Graph};
pub use parse::{parse_graph, parse_graph_with_destination, ParseError};
pub use path::{extract_path, policy, Path};

/// Errors surfaced by the top-level entry points.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Reading a graph file failed.
    #[error("failed to read {path}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Invalid graph.
    #[error(transparent)]
    Graph(#[from] graph::Error),
    /// Malformed graph text.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Invalid solver configuration or no convergence.
    #[error(transparent)]
    Bellman(#[from] bellman::Error),
    /// No path could be reconstructed.
    #[error(transparent)]
    Path(#[from] path::Error),
}

/// Convenience result type for the crate root.
pub type Result<T> = std::result::Result<T, Error>;

/// Read and parse a graph file; the highest-numbered node is the destination.
pub fn load_graph(path: impl AsRef<FsPath>) -> Result<Graph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_graph(&text)?)
}

/// Cost-to-go together with the optimal path from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Converged cost-to-go.
    pub value_function: ValueFunction,
    /// Optimal path from the source to the graph's destination.
    pub path: Path,
}

/// Run value iteration to convergence, then reconstruct the path from `source`.
///
/// An exhausted iteration budget is an error here.
pub fn solve(graph: &Graph, source: usize, config: &SolverConfig) -> Result<Solution> {
    let value_function = compute_cost_to_go(graph, config)?.into_converged()?;
    let path = extract_path(
        value_function.values(),
        graph,
        source,
        graph.destination(),
    )?;
    Ok(Solution {
        value_function,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH_TXT: &str = include_str!("../data/graph.txt");

    #[test]
    fn seven_node_example_end_to_end() {
        let inf = f64::INFINITY;
        let q = [
            [inf, 1.0, 5.0, 3.0, inf, inf, inf],
            [inf, inf, inf, 9.0, 6.0, inf, inf],
            [inf, inf, inf, inf, inf, 2.0, inf],
            [inf, inf, inf, inf, inf, 4.0, 8.0],
            [inf, inf, inf, inf, inf, inf, 4.0],
            [inf, inf, inf, inf, inf, inf, 1.0],
            [inf, inf, inf, inf, inf, inf, 0.0],
        ];
        let graph = Graph::from_dense(&q).unwrap();
        let solution = solve(&graph, 0, &SolverConfig::default()).unwrap();
        assert_eq!(
            solution.value_function.values(),
            &[8.0, 10.0, 3.0, 5.0, 4.0, 1.0, 0.0]
        );
        assert_eq!(solution.path.nodes, vec![0, 2, 5, 6]);
        assert_eq!(solution.path.cost, 8.0);
    }

    #[test]
    fn hundred_node_graph_path_cost_matches_value() {
        let graph = parse_graph(GRAPH_TXT).unwrap();
        assert_eq!(graph.len(), 100);
        assert_eq!(graph.destination(), 99);

        let solution = solve(&graph, 0, &SolverConfig::default()).unwrap();
        let j = solution.value_function.values();
        assert_eq!(j[99], 0.0);
        assert!((j[0] - 524.75).abs() < 1e-8, "J[0] = {}", j[0]);

        let path = &solution.path;
        assert_eq!(path.nodes.first(), Some(&0));
        assert_eq!(path.nodes.last(), Some(&99));
        let summed: f64 = path.edges().map(|(v, w)| graph.cost(v, w)).sum();
        assert!((summed - j[0]).abs() < 1e-8, "path sums to {summed}, J[0] = {}", j[0]);
        assert!((path.cost - j[0]).abs() < 1e-8);
    }

    #[test]
    fn hundred_node_graph_satisfies_bellman_equation() {
        let graph = parse_graph(GRAPH_TXT).unwrap();
        let vf = compute_cost_to_go(&graph, &SolverConfig::default()).unwrap();
        assert!(vf.is_converged());
        let tj = bellman(vf.values(), &graph).unwrap();
        assert!(bellman::max_norm_distance(&tj, vf.values()) <= 1e-8);
    }

    #[test]
    fn load_graph_reads_files_and_reports_missing_ones() {
        let dir = std::env::temp_dir().join(format!("shortpath-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("graph.txt");
        std::fs::write(&file, GRAPH_TXT).unwrap();
        assert_eq!(load_graph(&file).unwrap().len(), 100);

        let missing = dir.join("missing.txt");
        match load_graph(&missing) {
            Err(Error::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Io error, got {other:?}"),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn solve_surfaces_component_errors() {
        // A cheap 0 <-> 1 cycle in front of an expensive exit: the iterates
        // creep up by 0.5 per step towards J[0] = 100.
        let graph = parse_graph("node0, node1 0.5, node2 100\nnode1, node0 0.5\nnode2,\n").unwrap();
        assert!(matches!(
            solve(&graph, 0, &SolverConfig::default().with_max_iterations(20)),
            Err(Error::Bellman(bellman::Error::NotConverged { iterations: 20, .. }))
        ));

        let graph = parse_graph("node0,\nnode1, node0 1\nnode2,\n").unwrap();
        assert!(matches!(
            solve(&graph, 0, &SolverConfig::default()),
            Err(Error::Path(path::Error::Unreachable { node: 0 }))
        ));

        // 3 <-> 4 never reaches the destination 2; it must not stall the solve.
        let graph = parse_graph_with_destination(
            "node0, node2 1\nnode1, node2 1\nnode2,\nnode3, node4 1\nnode4, node3 1\n",
            2,
        )
        .unwrap();
        let solution = solve(&graph, 0, &SolverConfig::default()).unwrap();
        assert_eq!(solution.path.nodes, vec![0, 2]);
        assert_eq!(solution.value_function.values()[3], f64::INFINITY);

        assert!(matches!(
            load_graph_text_error(),
            Error::Parse(ParseError::InvalidCost { line: 1, .. })
        ));
    }

    fn load_graph_text_error() -> Error {
        parse_graph("node0, node1 x\nnode1,").unwrap_err().into()
    }
}
