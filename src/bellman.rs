//! Value iteration for the deterministic shortest-path problem.
//!
//! The cost-to-go \(J(v)\) is the least total cost of reaching the destination
//! from `v`. It is the fixed point of the Bellman operator
//! \[
//! (TJ)(v) = \min_{w} \bigl( c(v, w) + J(w) \bigr),
//! \]
//! and successive approximation computes it as the limit of \(J_{k+1} = T J_k\)
//! starting from \(J_0 = 0\).
//!
//! With positive costs the iterates increase monotonically towards the true
//! cost-to-go. Nodes from which the destination cannot be reached start (and
//! stay) at `+inf`, so a cycle that never reaches the destination does not
//! keep the iteration from converging.
//!
//! Convergence is judged by the max-norm step \(\lVert J_{k+1} - J_k \rVert_\infty\)
//! against an explicit tolerance, never by exact equality.

use crate::graph::Graph;

/// Errors for value iteration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Tolerance must be finite and non-negative.
    #[error("tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
    /// At least one iteration must be allowed.
    #[error("max_iterations must be at least 1")]
    ZeroIterations,
    /// Value vector does not match the graph.
    #[error("value vector has length {len}, graph has {n} nodes")]
    LengthMismatch {
        /// The provided length.
        len: usize,
        /// Number of nodes in the graph.
        n: usize,
    },
    /// The iteration budget ran out before the tolerance was met.
    #[error("no fixed point after {iterations} iterations (last step {residual})")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Max-norm size of the last step.
        residual: f64,
    },
}

/// Convenience result type for this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Stopping rule for [`compute_cost_to_go`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Stop once \(\lVert J_{k+1} - J_k \rVert_\infty \le\) `tolerance`.
    pub tolerance: f64,
    /// Give up after this many applications of the operator.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 500,
        }
    }
}

impl SolverConfig {
    /// Replace the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Replace the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(Error::ZeroIterations);
        }
        Ok(())
    }
}

/// How the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The last step was within tolerance.
    Converged,
    /// `max_iterations` was reached first; the values are a best effort.
    Exhausted,
}

/// Result of value iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFunction {
    values: Vec<f64>,
    iterations: usize,
    residual: f64,
    convergence: Convergence,
}

impl ValueFunction {
    /// Cost-to-go per node (`+inf` where the destination is unreachable).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume into the raw value vector.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Number of operator applications performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Max-norm size of the last step.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// How the iteration stopped.
    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    /// `true` if the tolerance was met.
    pub fn is_converged(&self) -> bool {
        self.convergence == Convergence::Converged
    }

    /// Treat an exhausted iteration budget as an error.
    pub fn into_converged(self) -> Result<Self> {
        match self.convergence {
            Convergence::Converged => Ok(self),
            Convergence::Exhausted => Err(Error::NotConverged {
                iterations: self.iterations,
                residual: self.residual,
            }),
        }
    }
}

fn check_len(j: &[f64], graph: &Graph) -> Result<()> {
    if j.len() != graph.len() {
        return Err(Error::LengthMismatch {
            len: j.len(),
            n: graph.len(),
        });
    }
    Ok(())
}

fn apply(graph: &Graph, j: &[f64], out: &mut Vec<f64>) {
    out.clear();
    out.extend((0..graph.len()).map(|v| {
        graph
            .successors(v)
            .iter()
            .map(|&(w, cost)| cost + j[w])
            .fold(f64::INFINITY, f64::min)
    }));
}

/// One application of the Bellman operator: `J'[v] = min_w (c(v, w) + J[w])`.
///
/// A node without successors maps to `+inf`.
pub fn bellman(j: &[f64], graph: &Graph) -> Result<Vec<f64>> {
    check_len(j, graph)?;
    let mut out = Vec::with_capacity(j.len());
    apply(graph, j, &mut out);
    Ok(out)
}

// Max-norm distance, with `inf - inf` read as 0. Callers pass equal lengths.
pub(crate) fn max_norm_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| if x == y { 0.0 } else { (x - y).abs() })
        .fold(0.0, f64::max)
}

/// Successive approximations `J_1, J_2, ...` of the cost-to-go.
///
/// The iterator is infinite; combine it with `take` or `take_while`.
#[derive(Debug, Clone)]
pub struct BellmanIterates<'g> {
    graph: &'g Graph,
    current: Vec<f64>,
    next: Vec<f64>,
}

impl<'g> BellmanIterates<'g> {
    /// Start from `J_0 = 0`.
    ///
    /// Nodes that cannot reach the destination start at `+inf`.
    pub fn new(graph: &'g Graph) -> Self {
        Self::pinned(graph, vec![0.0; graph.len()])
    }

    /// Start from a caller-supplied `J_0`.
    ///
    /// Entries for nodes that cannot reach the destination are replaced by `+inf`.
    pub fn from_initial(graph: &'g Graph, initial: &[f64]) -> Result<Self> {
        check_len(initial, graph)?;
        Ok(Self::pinned(graph, initial.to_vec()))
    }

    fn pinned(graph: &'g Graph, mut current: Vec<f64>) -> Self {
        for (v, j) in current.iter_mut().enumerate() {
            if !graph.reaches_destination(v) {
                *j = f64::INFINITY;
            }
        }
        Self {
            graph,
            current,
            next: Vec::with_capacity(graph.len()),
        }
    }

    /// The most recent iterate (`J_0` before the first call to `next`).
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    // Advance in place, returning the max-norm step.
    fn step(&mut self) -> f64 {
        apply(self.graph, &self.current, &mut self.next);
        let residual = max_norm_distance(&self.current, &self.next);
        std::mem::swap(&mut self.current, &mut self.next);
        residual
    }
}

impl Iterator for BellmanIterates<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step();
        Some(self.current.clone())
    }
}

/// Value iteration from `J_0 = 0`.
///
/// Errors only on an invalid `config`. Running out of iterations is not an
/// error: the result is flagged [`Convergence::Exhausted`] (see
/// [`ValueFunction::into_converged`]).
pub fn compute_cost_to_go(graph: &Graph, config: &SolverConfig) -> Result<ValueFunction> {
    config.validate()?;
    iterate(BellmanIterates::new(graph), config)
}

/// Value iteration from a caller-supplied initial estimate.
pub fn compute_cost_to_go_from(
    graph: &Graph,
    initial: &[f64],
    config: &SolverConfig,
) -> Result<ValueFunction> {
    config.validate()?;
    iterate(BellmanIterates::from_initial(graph, initial)?, config)
}

fn iterate(mut iterates: BellmanIterates<'_>, config: &SolverConfig) -> Result<ValueFunction> {
    let mut residual = f64::INFINITY;
    for k in 1..=config.max_iterations {
        residual = iterates.step();
        tracing::debug!(iteration = k, residual, "bellman step");
        if residual <= config.tolerance {
            tracing::info!(iterations = k, residual, "value iteration converged");
            return Ok(ValueFunction {
                values: iterates.current,
                iterations: k,
                residual,
                convergence: Convergence::Converged,
            });
        }
    }

    tracing::warn!(
        iterations = config.max_iterations,
        residual,
        tolerance = config.tolerance,
        "value iteration did not converge"
    );
    Ok(ValueFunction {
        values: iterates.current,
        iterations: config.max_iterations,
        residual,
        convergence: Convergence::Exhausted,
    })
}
