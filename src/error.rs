//! Error types for the mapping engine.

use thiserror::Error;

/// Errors reported by the mapping entry points.
///
/// Configuration problems are rejected before any cut enumeration starts, so
/// a failed invocation never leaves partially-updated session state behind.
/// Per-node timing infeasibility is deliberately *not* an error: it is
/// recovered locally by falling back to the minimum-delay cut and reported
/// through [`MapStats::infeasible_nodes`](crate::mapping::MapStats).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A configuration parameter is outside its accepted range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The subject network contains a node that no feasible cut can cover,
    /// for example a LUT wider than `cut_size` fed back into the mapper.
    /// The input network is left unmodified.
    #[error("unsupported network: node {index} has fanin {fanin} wider than any feasible cut (cut_size = {cut_size})")]
    UnsupportedNetwork {
        /// Index of the offending node.
        index: u32,
        /// Native fanin count of the node.
        fanin: u32,
        /// Configured cut size.
        cut_size: u32,
    },
}
