//! Mapped k-LUT network.
//!
//! The output of a mapping run: LUT nodes of arbitrary arity, each holding
//! its function as a truth table and, after technology mapping, a binding
//! to a concrete library cell. The network implements [`LogicNetwork`]
//! itself, so a mapped result can be fed back into the mapper.

use crate::network::{LogicNetwork, NodeId, Signal};
use crate::truth::TruthTable;

/// Binding of a LUT node to a library cell.
#[derive(Debug, Clone)]
pub struct CellBinding {
    /// Library cell name.
    pub cell: String,
    /// `pin_of_leaf[i]` is the cell pin driven by fanin `i`.
    pub pin_of_leaf: Vec<u8>,
    /// Bit `i` set when fanin `i` feeds its pin through an inverter.
    pub negated_leaves: u8,
    /// Whether the cell output is complemented relative to the node
    /// function (realized by an output inverter).
    pub output_complemented: bool,
}

/// A node of the mapped network.
#[derive(Debug, Clone)]
pub enum LutNode {
    /// Constant false, always node 0.
    Const,
    /// Primary input.
    Input {
        /// Input name.
        name: String,
    },
    /// A LUT with an explicit function over its fanins.
    Lut {
        /// Ordered fanins.
        fanins: Vec<Signal>,
        /// Function over the fanins, fanin `i` as variable `i`.
        function: TruthTable,
        /// Library cell binding, when technology mapped.
        binding: Option<CellBinding>,
    },
}

/// k-LUT network.
#[derive(Debug, Clone, Default)]
pub struct LutNetwork {
    nodes: Vec<LutNode>,
    outputs: Vec<(String, Signal)>,
    fanout: Vec<u32>,
}

impl LutNetwork {
    /// Create a network holding only the constant node.
    pub fn new() -> Self {
        Self {
            nodes: vec![LutNode::Const],
            outputs: Vec::new(),
            fanout: vec![0],
        }
    }

    /// The constant-false signal.
    pub fn constant_false() -> Signal {
        Signal::new(NodeId(0))
    }

    /// Add a primary input.
    pub fn add_input(&mut self, name: impl Into<String>) -> Signal {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(LutNode::Input { name: name.into() });
        self.fanout.push(0);
        Signal::new(id)
    }

    /// Add a LUT node.
    pub fn add_lut(
        &mut self,
        fanins: Vec<Signal>,
        function: TruthTable,
        binding: Option<CellBinding>,
    ) -> Signal {
        debug_assert_eq!(fanins.len(), function.num_vars() as usize);
        let id = NodeId(self.nodes.len() as u32);
        for s in &fanins {
            self.fanout[s.node.index()] += 1;
        }
        self.nodes.push(LutNode::Lut {
            fanins,
            function,
            binding,
        });
        self.fanout.push(0);
        Signal::new(id)
    }

    /// Add a primary output.
    pub fn add_output(&mut self, name: impl Into<String>, signal: Signal) {
        self.fanout[signal.node.index()] += 1;
        self.outputs.push((name.into(), signal));
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &LutNode {
        &self.nodes[id.index()]
    }

    /// Number of LUT nodes.
    pub fn lut_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, LutNode::Lut { .. }))
            .count()
    }

    /// Number of nodes, including the constant and inputs.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Named primary outputs.
    pub fn named_outputs(&self) -> &[(String, Signal)] {
        &self.outputs
    }

    /// Maximum LUT depth over all nodes.
    pub fn max_level(&self) -> u32 {
        let mut levels = vec![0u32; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if let LutNode::Lut { fanins, .. } = node {
                levels[i] = fanins
                    .iter()
                    .map(|s| levels[s.node.index()])
                    .max()
                    .unwrap_or(0)
                    + 1;
            }
        }
        levels.into_iter().max().unwrap_or(0)
    }

    /// Evaluate all outputs for a packed input assignment, bit `i`
    /// driving the `i`-th primary input in creation order.
    pub fn simulate(&self, assignment: u64) -> Vec<bool> {
        let mut values = vec![false; self.nodes.len()];
        let mut input_idx = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                LutNode::Const => values[i] = false,
                LutNode::Input { .. } => {
                    values[i] = (assignment >> input_idx) & 1 == 1;
                    input_idx += 1;
                }
                LutNode::Lut {
                    fanins, function, ..
                } => {
                    let mut row = 0u32;
                    for (j, s) in fanins.iter().enumerate() {
                        let v = values[s.node.index()] ^ s.complemented;
                        row |= (v as u32) << j;
                    }
                    values[i] = function.eval(row);
                }
            }
        }
        self.outputs
            .iter()
            .map(|(_, s)| values[s.node.index()] ^ s.complemented)
            .collect()
    }
}

impl LogicNetwork for LutNetwork {
    fn size(&self) -> usize {
        self.nodes.len()
    }

    fn is_constant(&self, n: NodeId) -> bool {
        n.0 == 0
    }

    fn is_pi(&self, n: NodeId) -> bool {
        matches!(self.nodes[n.index()], LutNode::Input { .. })
    }

    fn fanin_size(&self, n: NodeId) -> usize {
        match &self.nodes[n.index()] {
            LutNode::Lut { fanins, .. } => fanins.len(),
            _ => 0,
        }
    }

    fn fanout_size(&self, n: NodeId) -> usize {
        self.fanout[n.index()] as usize
    }

    fn fanins(&self, n: NodeId) -> Vec<Signal> {
        match &self.nodes[n.index()] {
            LutNode::Lut { fanins, .. } => fanins.clone(),
            _ => Vec::new(),
        }
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outputs.iter().map(|(_, s)| *s).collect()
    }

    fn topological_order(&self) -> Vec<NodeId> {
        (0..self.nodes.len() as u32).map(NodeId).collect()
    }

    fn compute(&self, n: NodeId, fanin_tts: &[TruthTable]) -> TruthTable {
        match &self.nodes[n.index()] {
            LutNode::Lut {
                fanins, function, ..
            } => {
                let adjusted: Vec<TruthTable> = fanins
                    .iter()
                    .zip(fanin_tts)
                    .map(|(s, tt)| if s.complemented { tt.not() } else { tt.clone() })
                    .collect();
                function.compose(&adjusted)
            }
            _ => unreachable!("compute called on a non-gate node"),
        }
    }

    fn pi_name(&self, n: NodeId) -> Option<&str> {
        match &self.nodes[n.index()] {
            LutNode::Input { name } => Some(name.as_str()),
            _ => None,
        }
    }

    fn po_name(&self, index: usize) -> Option<&str> {
        self.outputs.get(index).map(|(name, _)| name.as_str())
    }
}
