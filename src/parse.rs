//! Text loader for cost graphs.
//!
//! One line per source node, comma-separated:
//!
//! ```text
//! node0, node10 52.03, node5 251.19, node26 144.78, node4 330.85,
//! node1, node9 37.59, node38 351.53,
//! ...
//! node99,
//! ```
//!
//! The first field names the source node; every further field is a
//! `node<id> <cost>` pair. Empty fields (such as the trailing comma on the
//! destination's line) are ignored, and so are blank lines.

use crate::graph::{self, Edge, Graph};

/// Errors raised while reading the text format. Line numbers are 1-based.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No node lines at all.
    #[error("input contains no nodes")]
    Empty,
    /// A node identifier is not of the form `node<integer>`.
    #[error("line {line}: invalid node identifier {token:?}")]
    InvalidNodeId {
        /// Line number.
        line: usize,
        /// The offending token.
        token: String,
    },
    /// An edge field does not have exactly two whitespace-separated parts.
    #[error("line {line}: expected `node<id> <cost>`, found {field:?}")]
    WrongFieldCount {
        /// Line number.
        line: usize,
        /// The offending field.
        field: String,
    },
    /// A cost does not parse as a finite number.
    #[error("line {line}: invalid cost {token:?}")]
    InvalidCost {
        /// Line number.
        line: usize,
        /// The offending token.
        token: String,
    },
    /// A cost is zero or negative.
    #[error("line {line}: cost {cost} is not positive")]
    NonPositiveCost {
        /// Line number.
        line: usize,
        /// The rejected cost.
        cost: f64,
    },
    /// The same source node appears on two lines.
    #[error("line {line}: node {node} already defined")]
    DuplicateNode {
        /// Line number of the second definition.
        line: usize,
        /// The repeated node.
        node: usize,
    },
    /// The same target appears twice on one line.
    #[error("line {line}: duplicate edge ({from}->{to})")]
    DuplicateEdge {
        /// Line number.
        line: usize,
        /// Source node.
        from: usize,
        /// Repeated target.
        to: usize,
    },
    /// A node id is not in `[0, n)`, `n` being the number of lines.
    #[error("line {line}: node {node} out of range for n={n}")]
    NodeOutOfRange {
        /// Line number.
        line: usize,
        /// The id.
        node: usize,
        /// Number of nodes.
        n: usize,
    },
    /// A non-destination node lists itself as a target.
    #[error("line {line}: self-loop on node {node}")]
    SelfLoop {
        /// Line number.
        line: usize,
        /// The node.
        node: usize,
    },
    /// Explicit destination is not a node.
    #[error("destination {destination} out of range for n={n}")]
    DestinationOutOfRange {
        /// The requested destination.
        destination: usize,
        /// Number of nodes.
        n: usize,
    },
    /// The parsed edges did not form a valid graph.
    #[error(transparent)]
    Graph(#[from] graph::Error),
}

/// Convenience result type for this module.
pub type Result<T> = std::result::Result<T, ParseError>;

struct NodeLine {
    line: usize,
    source: usize,
    targets: Vec<(usize, f64)>,
}

fn parse_node_id(line: usize, token: &str) -> Result<usize> {
    token
        .strip_prefix("node")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ParseError::InvalidNodeId {
            line,
            token: token.to_string(),
        })
}

fn parse_cost(line: usize, token: &str) -> Result<f64> {
    let cost: f64 = token
        .parse()
        .ok()
        .filter(|c: &f64| c.is_finite())
        .ok_or_else(|| ParseError::InvalidCost {
            line,
            token: token.to_string(),
        })?;
    if cost <= 0.0 {
        return Err(ParseError::NonPositiveCost { line, cost });
    }
    Ok(cost)
}

fn parse_line(line: usize, text: &str) -> Result<NodeLine> {
    let mut fields = text.split(',').map(str::trim);
    let source = parse_node_id(line, fields.next().unwrap_or_default())?;

    let mut targets = Vec::new();
    for field in fields.filter(|f| !f.is_empty()) {
        let parts: Vec<&str> = field.split_whitespace().collect();
        let [id, cost] = parts.as_slice() else {
            return Err(ParseError::WrongFieldCount {
                line,
                field: field.to_string(),
            });
        };
        let to = parse_node_id(line, id)?;
        let cost = parse_cost(line, cost)?;
        if targets.iter().any(|&(seen, _)| seen == to) {
            return Err(ParseError::DuplicateEdge {
                line,
                from: source,
                to,
            });
        }
        targets.push((to, cost));
    }

    Ok(NodeLine {
        line,
        source,
        targets,
    })
}

/// Parse a graph whose destination is the highest-numbered node.
pub fn parse_graph(text: &str) -> Result<Graph> {
    let lines = parse_lines(text)?;
    let destination = lines.len() - 1;
    build(lines, destination)
}

/// Parse a graph with an explicit destination.
///
/// Edges listed on the destination's own line are dropped: its only
/// successor is itself, at cost 0.
pub fn parse_graph_with_destination(text: &str, destination: usize) -> Result<Graph> {
    let lines = parse_lines(text)?;
    if destination >= lines.len() {
        return Err(ParseError::DestinationOutOfRange {
            destination,
            n: lines.len(),
        });
    }
    build(lines, destination)
}

fn parse_lines(text: &str) -> Result<Vec<NodeLine>> {
    let lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(k, l)| parse_line(k + 1, l))
        .collect::<Result<Vec<_>>>()?;
    if lines.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(lines)
}

fn build(lines: Vec<NodeLine>, destination: usize) -> Result<Graph> {
    let n = lines.len();
    let mut defined = vec![false; n];
    let mut edges = Vec::new();

    for NodeLine {
        line,
        source,
        targets,
    } in lines
    {
        if source >= n {
            return Err(ParseError::NodeOutOfRange {
                line,
                node: source,
                n,
            });
        }
        if std::mem::replace(&mut defined[source], true) {
            return Err(ParseError::DuplicateNode { line, node: source });
        }
        if source == destination {
            continue;
        }
        for (to, cost) in targets {
            if to >= n {
                return Err(ParseError::NodeOutOfRange { line, node: to, n });
            }
            if to == source {
                return Err(ParseError::SelfLoop { line, node: to });
            }
            edges.push(Edge::new(source, to, cost));
        }
    }

    let graph = Graph::new(n, destination, &edges)?;
    tracing::debug!(
        nodes = graph.len(),
        edges = graph.num_edges(),
        destination,
        "parsed graph"
    );
    Ok(graph)
}
