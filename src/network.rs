//! Subject-network capability interface.
//!
//! The mapper does not own the network it covers. It consumes a small
//! capability set, expressed as the [`LogicNetwork`] trait, so the same
//! covering engine runs over And-Inverter Graphs, majority graphs, or
//! k-LUT graphs. Implementations are expected to be index arenas: a node is
//! identified by a dense `u32` index, fanin edges carry a polarity bit, and
//! nodes appear after their fanins so index order is one valid topological
//! order.

use crate::truth::TruthTable;

/// Dense index of a network node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index as a usize, for direct slice addressing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A fanin edge: a node reference with an optional complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal {
    /// The referenced node.
    pub node: NodeId,
    /// Whether the reference is complemented.
    pub complemented: bool,
}

impl Signal {
    /// Create a positive reference to `node`.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            complemented: false,
        }
    }

    /// Create a complemented reference to `node`.
    pub fn not(node: NodeId) -> Self {
        Self {
            node,
            complemented: true,
        }
    }

    /// Flip the complement bit.
    pub fn invert(self) -> Self {
        Self {
            node: self.node,
            complemented: !self.complemented,
        }
    }
}

/// Capability set the mapper requires from a subject network.
///
/// All node state consumed here is read-only; the mapper keeps its own
/// per-node arrays (arrival, required, cut sets, reference counts) indexed
/// by [`NodeId`].
pub trait LogicNetwork {
    /// Total number of nodes, including constants and primary inputs.
    fn size(&self) -> usize;

    /// Whether `n` is a constant node.
    fn is_constant(&self, n: NodeId) -> bool;

    /// Whether `n` is a primary input.
    fn is_pi(&self, n: NodeId) -> bool;

    /// Number of fanins of `n`.
    fn fanin_size(&self, n: NodeId) -> usize;

    /// Number of fanouts of `n`, counting primary outputs.
    fn fanout_size(&self, n: NodeId) -> usize;

    /// Ordered fanin signals of `n`.
    fn fanins(&self, n: NodeId) -> Vec<Signal>;

    /// Primary output signals, in declaration order.
    fn outputs(&self) -> Vec<Signal>;

    /// All nodes in a topological order (fanins before fanouts).
    fn topological_order(&self) -> Vec<NodeId>;

    /// Apply the local operator of `n` to the given fanin functions.
    ///
    /// `fanin_tts` holds one table per fanin of `n`, in fanin order, all on
    /// the same support; fanin complement bits are applied by the callee.
    fn compute(&self, n: NodeId, fanin_tts: &[TruthTable]) -> TruthTable;

    /// Optional name of a primary input, for carrying names into the
    /// mapped network.
    fn pi_name(&self, _n: NodeId) -> Option<&str> {
        None
    }

    /// Optional name of the `index`-th primary output.
    fn po_name(&self, _index: usize) -> Option<&str> {
        None
    }
}

/// Simulate the cone of `root` over the given leaf support.
///
/// Leaf `i` is assigned the projection function of variable `i`; internal
/// cone nodes are evaluated bottom-up with the network's local operators.
/// Every path from `root` must terminate at a leaf or a constant.
pub fn cone_function<N: LogicNetwork>(ntk: &N, root: NodeId, leaves: &[u32]) -> TruthTable {
    let num_vars = leaves.len() as u8;
    let mut memo: std::collections::HashMap<u32, TruthTable> = std::collections::HashMap::new();
    for (i, &leaf) in leaves.iter().enumerate() {
        memo.insert(leaf, TruthTable::nth_var(num_vars, i as u8));
    }
    eval_cone_node(ntk, root, num_vars, &mut memo)
}

fn eval_cone_node<N: LogicNetwork>(
    ntk: &N,
    n: NodeId,
    num_vars: u8,
    memo: &mut std::collections::HashMap<u32, TruthTable>,
) -> TruthTable {
    if let Some(tt) = memo.get(&n.0) {
        return tt.clone();
    }
    if ntk.is_constant(n) {
        let tt = TruthTable::zero(num_vars);
        memo.insert(n.0, tt.clone());
        return tt;
    }
    assert!(
        !ntk.is_pi(n),
        "cone evaluation escaped its leaf boundary at input node {}",
        n.0
    );
    let fanin_tts: Vec<TruthTable> = ntk
        .fanins(n)
        .iter()
        .map(|s| eval_cone_node(ntk, s.node, num_vars, memo))
        .collect();
    let tt = ntk.compute(n, &fanin_tts);
    memo.insert(n.0, tt.clone());
    tt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_invert() {
        let s = Signal::new(NodeId(3));
        assert!(!s.complemented);
        let inv = s.invert();
        assert!(inv.complemented);
        assert_eq!(inv.node, NodeId(3));
        assert_eq!(inv.invert(), s);
    }

    #[test]
    fn test_signal_not() {
        assert_eq!(Signal::not(NodeId(7)), Signal::new(NodeId(7)).invert());
    }
}
