//! Weighted directed graphs with a single terminal node.
//!
//! The cost function \(c(v, w)\) of a shortest-path problem is usually written as a
//! dense matrix `Q` with `Q[v][w] = +inf` wherever there is no direct edge. We store
//! the same function sparsely: each node keeps its successors sorted by index.
//!
//! Invariants (checked at construction):
//! - Costs are finite and strictly positive; `+inf` means "no edge".
//!   Zero-cost edges would allow zero-cost cycles, on which value iteration
//!   from `J = 0` stops below the true cost-to-go.
//! - The destination carries an implicit zero-cost self-loop, `c(t, t) = 0`.
//! - No other node has a self-loop.

/// Errors for graph construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A graph needs at least one node (the destination).
    #[error("graph must have at least one node")]
    Empty,
    /// Destination index is not a node of the graph.
    #[error("destination {destination} out of bounds for n={n}")]
    DestinationOutOfBounds {
        /// The requested destination.
        destination: usize,
        /// Number of nodes in the graph.
        n: usize,
    },
    /// Edge endpoint out of bounds.
    #[error("edge endpoint out of bounds: ({from}->{to}) for n={n}")]
    EdgeOutOfBounds {
        /// Source endpoint.
        from: usize,
        /// Target endpoint.
        to: usize,
        /// Number of nodes in the graph.
        n: usize,
    },
    /// Cost is zero, negative, NaN or `-inf`.
    #[error("edge ({from}->{to}) has invalid cost {cost}; costs must be positive")]
    InvalidCost {
        /// Source endpoint.
        from: usize,
        /// Target endpoint.
        to: usize,
        /// The rejected cost.
        cost: f64,
    },
    /// Self-loops are only allowed (implicitly, at cost 0) on the destination.
    #[error("self-loop on node {node}")]
    SelfLoop {
        /// Node carrying the loop.
        node: usize,
    },
    /// The same `(from, to)` pair was given twice.
    #[error("duplicate edge ({from}->{to})")]
    DuplicateEdge {
        /// Source endpoint.
        from: usize,
        /// Target endpoint.
        to: usize,
    },
    /// Dense input is not square.
    #[error("row {row} has length {len}, expected {n}")]
    NotSquare {
        /// Offending row.
        row: usize,
        /// Its length.
        len: usize,
        /// Expected length (number of rows).
        n: usize,
    },
    /// Dense input has no zero on its diagonal.
    #[error("no destination: no diagonal entry is zero")]
    NoDestination,
    /// Dense input has more than one zero on its diagonal.
    #[error("ambiguous destination: diagonal is zero at both {first} and {second}")]
    MultipleDestinations {
        /// First zero diagonal entry.
        first: usize,
        /// Second zero diagonal entry.
        second: usize,
    },
}

/// Convenience result type for this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Directed edge with a cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Source node index.
    pub from: usize,
    /// Target node index.
    pub to: usize,
    /// Edge cost (finite, positive; `+inf` is read as "no edge").
    pub cost: f64,
}

impl Edge {
    /// Shorthand constructor.
    pub fn new(from: usize, to: usize, cost: f64) -> Self {
        Self { from, to, cost }
    }
}

/// Immutable cost graph over nodes `0..n` with one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    // successors[v] is sorted by target index; includes (t, 0.0) for the destination t.
    successors: Vec<Vec<(usize, f64)>>,
    destination: usize,
    num_edges: usize,
    // reaches[v]: some path leads from v to the destination.
    reaches: Vec<bool>,
}

impl Graph {
    /// Build a graph on `n` nodes from an edge list.
    ///
    /// Edges with cost `+inf` are dropped. The destination's zero self-loop is
    /// added here and must not appear in `edges`.
    pub fn new(n: usize, destination: usize, edges: &[Edge]) -> Result<Self> {
        if n == 0 {
            return Err(Error::Empty);
        }
        if destination >= n {
            return Err(Error::DestinationOutOfBounds { destination, n });
        }

        let mut successors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut num_edges = 0;
        for e in edges {
            if e.from >= n || e.to >= n {
                return Err(Error::EdgeOutOfBounds {
                    from: e.from,
                    to: e.to,
                    n,
                });
            }
            if e.from == e.to {
                return Err(Error::SelfLoop { node: e.from });
            }
            if e.cost.is_nan() || e.cost <= 0.0 {
                return Err(Error::InvalidCost {
                    from: e.from,
                    to: e.to,
                    cost: e.cost,
                });
            }
            if e.cost == f64::INFINITY {
                continue;
            }
            successors[e.from].push((e.to, e.cost));
            num_edges += 1;
        }
        successors[destination].push((destination, 0.0));

        for (from, succ) in successors.iter_mut().enumerate() {
            succ.sort_by_key(|&(to, _)| to);
            if let Some(w) = succ.windows(2).find(|w| w[0].0 == w[1].0) {
                return Err(Error::DuplicateEdge { from, to: w[0].0 });
            }
        }

        let reaches = reaching(&successors, destination);
        Ok(Self {
            successors,
            destination,
            num_edges,
            reaches,
        })
    }

    /// Build a graph from a dense square cost matrix (`+inf` = no edge).
    ///
    /// The destination is the unique row whose diagonal entry is `0`; every other
    /// diagonal entry must be `+inf`.
    pub fn from_dense<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(Error::Empty);
        }

        let mut destination = None;
        let mut edges = Vec::new();
        for (v, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n {
                return Err(Error::NotSquare {
                    row: v,
                    len: row.len(),
                    n,
                });
            }
            for (w, &cost) in row.iter().enumerate() {
                if v != w {
                    edges.push(Edge::new(v, w, cost));
                    continue;
                }
                if cost == 0.0 {
                    if let Some(first) = destination {
                        return Err(Error::MultipleDestinations { first, second: v });
                    }
                    destination = Some(v);
                } else if cost.is_nan() || cost < 0.0 {
                    return Err(Error::InvalidCost {
                        from: v,
                        to: v,
                        cost,
                    });
                } else if cost.is_finite() {
                    return Err(Error::SelfLoop { node: v });
                }
            }
        }

        let destination = destination.ok_or(Error::NoDestination)?;
        Self::new(n, destination, &edges)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Always `false`: a graph holds at least its destination.
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// The terminal node.
    pub fn destination(&self) -> usize {
        self.destination
    }

    /// `true` if some path leads from `v` to the destination.
    ///
    /// Panics if `v` is not a node.
    pub fn reaches_destination(&self, v: usize) -> bool {
        self.reaches[v]
    }

    /// Number of explicit edges (the destination's self-loop is not counted).
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// `(target, cost)` pairs leaving `v`, sorted by target.
    ///
    /// Panics if `v` is not a node.
    pub fn successors(&self, v: usize) -> &[(usize, f64)] {
        &self.successors[v]
    }

    /// Direct cost `c(v, w)`, `+inf` when there is no edge (or either index is out of range).
    pub fn cost(&self, v: usize, w: usize) -> f64 {
        self.successors
            .get(v)
            .and_then(|succ| {
                succ.binary_search_by_key(&w, |&(to, _)| to)
                    .ok()
                    .map(|k| succ[k].1)
            })
            .unwrap_or(f64::INFINITY)
    }

    /// Dense `n x n` view of the cost function.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.len();
        self.successors
            .iter()
            .map(|succ| {
                let mut row = vec![f64::INFINITY; n];
                for &(to, cost) in succ {
                    row[to] = cost;
                }
                row
            })
            .collect()
    }
}

// Reverse breadth-first search from the destination.
fn reaching(successors: &[Vec<(usize, f64)>], destination: usize) -> Vec<bool> {
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); successors.len()];
    for (from, succ) in successors.iter().enumerate() {
        for &(to, _) in succ {
            if to != from {
                predecessors[to].push(from);
            }
        }
    }

    let mut reaches = vec![false; successors.len()];
    let mut queue = std::collections::VecDeque::from([destination]);
    reaches[destination] = true;
    while let Some(w) = queue.pop_front() {
        for &v in &predecessors[w] {
            if !std::mem::replace(&mut reaches[v], true) {
                queue.push_back(v);
            }
        }
    }
    reaches
}
