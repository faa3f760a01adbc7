//! Shortest paths by value iteration.
//!
//! With no arguments, solves the seven-node example graph (A..G, G terminal).
//! With a path argument, loads a graph file in the `node<id>, node<dest> <cost>, ...`
//! format and solves it from node 0 to the highest-numbered node.
//!
//! Set `RUST_LOG=shortpath=debug` to watch the iteration.

use shortpath::{load_graph, path::policy, solve, Graph, SolverConfig};
use tracing_subscriber::EnvFilter;

static LABELS: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];

fn seven_node() -> Result<Graph, shortpath::graph::Error> {
    let inf = f64::INFINITY;
    Graph::from_dense(&[
        [inf, 1.0, 5.0, 3.0, inf, inf, inf],
        [inf, inf, inf, 9.0, 6.0, inf, inf],
        [inf, inf, inf, inf, inf, 2.0, inf],
        [inf, inf, inf, inf, inf, 4.0, 8.0],
        [inf, inf, inf, inf, inf, inf, 4.0],
        [inf, inf, inf, inf, inf, inf, 1.0],
        [inf, inf, inf, inf, inf, inf, 0.0],
    ])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (graph, labels): (Graph, Option<&[&str]>) = match std::env::args().nth(1) {
        Some(file) => (load_graph(file)?, None),
        None => (seven_node()?, Some(&LABELS[..])),
    };
    let name = |v: usize| match labels {
        Some(l) => l[v].to_string(),
        None => format!("node{v}"),
    };

    let solution = solve(&graph, 0, &SolverConfig::default())?;
    let j = solution.value_function.values();
    println!(
        "converged after {} iterations ({} nodes, {} edges)",
        solution.value_function.iterations(),
        graph.len(),
        graph.num_edges()
    );

    if graph.len() <= 10 {
        let moves = policy(j, &graph)?;
        for (v, (cost, next)) in j.iter().zip(&moves).enumerate() {
            let next = next.map_or_else(|| "-".to_string(), &name);
            println!("J({}) = {cost:>8.2}   next: {next}", name(v));
        }
    }

    let route: Vec<String> = solution.path.nodes.iter().map(|&v| name(v)).collect();
    println!("optimal path: {}", route.join(" -> "));
    println!("total cost:   {:.2}", solution.path.cost);
    Ok(())
}
