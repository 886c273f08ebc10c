//! Per-node mapping state and the cost machinery behind area recovery.
//!
//! The mapper keeps a struct-of-arrays [`MappingState`] indexed by node id:
//! arrival and required times, blended reference estimates, cover
//! reference counts, amortized flows, and the currently selected cut per
//! node. Exact local area is measured against the current reference counts
//! with paired reference/dereference cone walks that leave the counts
//! exactly as they were, so a measurement never perturbs the snapshot it
//! reads.

use crate::cuts::Cut;
use crate::network::{LogicNetwork, NodeId};
use std::collections::HashMap;

/// Cost of a fanout-free cone: gate area and wire count.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConeCost {
    /// Summed gate area of the cone.
    pub area: f64,
    /// Summed fanin edges of the cone.
    pub edges: f64,
}

/// Per-node state of one mapping session.
#[derive(Debug)]
pub struct MappingState {
    /// Arrival time of the selected implementation.
    pub arrival: Vec<f64>,
    /// Latest permitted arrival time.
    pub required: Vec<f64>,
    /// Blended fanout estimate used by area flow.
    pub est_refs: Vec<f64>,
    /// References in the current cover.
    pub map_refs: Vec<u32>,
    /// Area flow of the selected implementation.
    pub flow: Vec<f64>,
    /// Edge flow of the selected implementation.
    pub edge_flow: Vec<f64>,
    /// Currently selected cut, if any.
    pub selected: Vec<Option<Cut>>,
    /// Whether the node is a primary input or constant.
    terminal: Vec<bool>,
}

impl MappingState {
    /// Initialize state for a network. Reference estimates start at the
    /// structural fanout count.
    pub fn new<N: LogicNetwork>(ntk: &N) -> Self {
        let size = ntk.size();
        let mut est_refs = vec![0.0; size];
        let mut terminal = vec![false; size];
        for n in (0..size as u32).map(NodeId) {
            est_refs[n.index()] = ntk.fanout_size(n) as f64;
            terminal[n.index()] = ntk.is_pi(n) || ntk.is_constant(n);
        }
        Self {
            arrival: vec![0.0; size],
            required: vec![f64::INFINITY; size],
            est_refs,
            map_refs: vec![0; size],
            flow: vec![0.0; size],
            edge_flow: vec![0.0; size],
            selected: vec![None; size],
            terminal,
        }
    }

    /// Whether `index` is a primary input or constant.
    pub fn is_terminal(&self, index: u32) -> bool {
        self.terminal[index as usize]
    }

    /// Blend the fanout estimate toward the measured cover references.
    ///
    /// Early rounds trust the structural estimate, later rounds the actual
    /// cover, with `coef = 1 / (2 + (iteration + 1)^2)`.
    pub fn blend_est_refs(&mut self, iteration: u32) {
        let coef = 1.0 / (2.0 + ((iteration + 1) * (iteration + 1)) as f64);
        for i in 0..self.est_refs.len() {
            self.est_refs[i] =
                coef * self.est_refs[i] + (1.0 - coef) * (self.map_refs[i] as f64).max(1.0);
        }
    }

    /// Reference a cut's cone, returning the cost of everything that
    /// became live.
    pub fn cut_ref(&mut self, cut: &Cut) -> ConeCost {
        let mut cost = ConeCost {
            area: cut.area,
            edges: cut.size() as f64,
        };
        for &l in cut.leaves() {
            if self.terminal[l as usize] {
                continue;
            }
            self.map_refs[l as usize] += 1;
            if self.map_refs[l as usize] == 1 {
                if let Some(leaf_cut) = self.selected[l as usize].clone() {
                    let sub = self.cut_ref(&leaf_cut);
                    cost.area += sub.area;
                    cost.edges += sub.edges;
                }
            }
        }
        cost
    }

    /// Dereference a cut's cone, returning the cost of everything that
    /// became dead.
    pub fn cut_deref(&mut self, cut: &Cut) -> ConeCost {
        let mut cost = ConeCost {
            area: cut.area,
            edges: cut.size() as f64,
        };
        for &l in cut.leaves() {
            if self.terminal[l as usize] {
                continue;
            }
            debug_assert!(self.map_refs[l as usize] > 0);
            self.map_refs[l as usize] -= 1;
            if self.map_refs[l as usize] == 0 {
                if let Some(leaf_cut) = self.selected[l as usize].clone() {
                    let sub = self.cut_deref(&leaf_cut);
                    cost.area += sub.area;
                    cost.edges += sub.edges;
                }
            }
        }
        cost
    }

    /// Exact local area of adopting `cut`: the cost of the logic that
    /// would become live under the current cover. The reference counts are
    /// restored before returning.
    pub fn exact_area(&mut self, cut: &Cut) -> ConeCost {
        let cost = self.cut_ref(cut);
        let restored = self.cut_deref(cut);
        debug_assert!((cost.area - restored.area).abs() < 1e-9);
        cost
    }
}

/// Maximal fanout-free cone of `root` over the structural network.
///
/// Returns the interior cone nodes (including `root`) and the sorted
/// frontier of nodes feeding the cone from outside. Computed against a
/// local copy of the fanout counts, so the network and any mapping state
/// stay untouched.
pub fn mffc<N: LogicNetwork>(ntk: &N, root: NodeId) -> (Vec<u32>, Vec<u32>) {
    let mut refs: HashMap<u32, u32> = HashMap::new();
    let mut cone = vec![root.0];
    collect_mffc(ntk, root, &mut refs, &mut cone);

    let mut frontier: Vec<u32> = Vec::new();
    for &c in &cone {
        for s in ntk.fanins(NodeId(c)) {
            let idx = s.node.0;
            if ntk.is_constant(s.node) {
                continue;
            }
            if !cone.contains(&idx) && !frontier.contains(&idx) {
                frontier.push(idx);
            }
        }
    }
    frontier.sort_unstable();
    (cone, frontier)
}

fn collect_mffc<N: LogicNetwork>(
    ntk: &N,
    n: NodeId,
    refs: &mut HashMap<u32, u32>,
    cone: &mut Vec<u32>,
) {
    for s in ntk.fanins(n) {
        let idx = s.node.0;
        if ntk.is_pi(s.node) || ntk.is_constant(s.node) {
            continue;
        }
        let r = refs
            .entry(idx)
            .or_insert_with(|| ntk.fanout_size(s.node) as u32);
        *r -= 1;
        if *r == 0 {
            cone.push(idx);
            collect_mffc(ntk, s.node, refs, cone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;
    use crate::cuts::Cut;

    /// Two-level cover: y = AND(AND(a, b), c) with both ANDs selected.
    fn two_lut_state() -> (Aig, MappingState, u32, u32) {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let c = aig.add_input("c");
        let ab = aig.add_and(a, b);
        let abc = aig.add_and(ab, c);
        aig.add_output("y", abc);

        let mut state = MappingState::new(&aig);
        state.selected[ab.node.index()] = Some(Cut::new(vec![a.node.0, b.node.0], 0));
        state.selected[abc.node.index()] = Some(Cut::new(vec![c.node.0, ab.node.0], 0));
        (aig, state, ab.node.0, abc.node.0)
    }

    #[test]
    fn test_cut_ref_counts_cone() {
        let (_aig, mut state, _ab, abc) = two_lut_state();
        let root_cut = state.selected[abc as usize].clone().unwrap();
        let cost = state.cut_ref(&root_cut);
        // Referencing the root cut pulls in the inner LUT as well.
        assert!((cost.area - 2.0).abs() < 1e-9);
        assert!((cost.edges - 4.0).abs() < 1e-9);
        let released = state.cut_deref(&root_cut);
        assert!((released.area - 2.0).abs() < 1e-9);
        assert!(state.map_refs.iter().all(|&r| r == 0));
    }

    #[test]
    fn test_exact_area_restores_snapshot() {
        let (_aig, mut state, _ab, abc) = two_lut_state();
        let root_cut = state.selected[abc as usize].clone().unwrap();
        let before = state.map_refs.clone();
        let cost = state.exact_area(&root_cut);
        assert!((cost.area - 2.0).abs() < 1e-9);
        assert_eq!(state.map_refs, before);
    }

    #[test]
    fn test_exact_area_sees_shared_logic() {
        // The inner AND is also used elsewhere, so adopting the root cut
        // only pays for the root LUT.
        let (_aig, mut state, ab, abc) = two_lut_state();
        state.map_refs[ab as usize] = 1;
        let root_cut = state.selected[abc as usize].clone().unwrap();
        let cost = state.exact_area(&root_cut);
        assert!((cost.area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_blend_est_refs() {
        let (_aig, mut state, ab, _abc) = two_lut_state();
        state.map_refs[ab as usize] = 3;
        let est_before = state.est_refs[ab as usize];
        state.blend_est_refs(0);
        let est_after = state.est_refs[ab as usize];
        // coef = 1/3: one third old estimate, two thirds measured.
        let expect = est_before / 3.0 + 2.0;
        assert!((est_after - expect).abs() < 1e-9);
    }

    #[test]
    fn test_mffc_chain() {
        let (aig, _state, ab, abc) = two_lut_state();
        let (cone, frontier) = mffc(&aig, NodeId(abc));
        assert!(cone.contains(&abc));
        assert!(cone.contains(&ab));
        assert_eq!(frontier.len(), 3);
    }

    #[test]
    fn test_mffc_stops_at_shared_node() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let c = aig.add_input("c");
        let ab = aig.add_and(a, b);
        let abc = aig.add_and(ab, c);
        aig.add_output("y1", ab);
        aig.add_output("y2", abc);

        let (cone, frontier) = mffc(&aig, NodeId(abc.node.0));
        // ab has a second fanout, so it stays outside the cone.
        assert!(!cone.contains(&ab.node.0));
        assert_eq!(frontier, vec![ab.node.0, c.node.0]);
    }
}
