//! Priority cut enumeration.
//!
//! A cut of a node is a set of leaves such that every path from a primary
//! input to the node passes through a leaf. The enumerator walks the
//! network in topological order and builds each node's cuts by merging the
//! cut sets of its fanins, keeping only the `cut_limit` best-ranked cuts of
//! at most `cut_size` leaves. Pruning happens incrementally during the
//! cross-product merge, so memory stays bounded by
//! `O(nodes * cut_limit * cut_size)`.
//!
//! # Algorithm
//!
//! 1. Constant nodes get a zero-leaf cut, primary inputs the trivial cut.
//! 2. For a gate, every combination of one cut per fanin is merged; unions
//!    wider than `cut_size` are discarded on the spot.
//! 3. New cuts are ranked by (delay, area flow, size) with a final
//!    lexicographic leaf-id comparison, so ties never depend on insertion
//!    order. The worst cut is evicted once the set exceeds its capacity.
//! 4. The trivial cut is appended last and never participates in ranking
//!    or eviction.
//!
//! # References
//!
//! - Cong, J., & Ding, Y. (1994). FlowMap: An optimal technology mapping
//!   algorithm for delay optimization in lookup-table based FPGA designs.
//! - Mishchenko, A., Cho, S., Chatterjee, S., & Brayton, R. (2007).
//!   Combinational and sequential mapping with priority cuts.

use crate::error::MapError;
use crate::network::{LogicNetwork, NodeId};
use crate::truth::{TruthTable, TruthTableCache, MAX_CUT_INPUTS};
use serde::{Deserialize, Serialize};

/// Maximum accepted `cut_size` (exclusive bound is 16).
pub const MAX_CUT_SIZE: u32 = (MAX_CUT_INPUTS) as u32;

/// Maximum accepted `cut_limit` (exclusive bound is 31).
pub const MAX_CUT_LIMIT: u32 = 30;

/// Comparison slack for floating-point cut costs.
pub(crate) const EPS: f64 = 0.005;

/// Cut enumeration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutConfig {
    /// Maximum number of leaves per cut, in `[2, 16)`.
    pub cut_size: u32,
    /// Maximum number of cuts kept per node, in `[2, 31)`.
    pub cut_limit: u32,
    /// Compute a truth table for every cut.
    pub compute_truth: bool,
    /// Shrink cut functions to their true support, dropping unused leaves.
    pub minimize_truth: bool,
    /// Eagerly discard cuts dominated by a cheaper subset cut.
    pub remove_dominated: bool,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            cut_size: 4,
            cut_limit: 25,
            compute_truth: true,
            minimize_truth: false,
            remove_dominated: true,
        }
    }
}

impl CutConfig {
    /// Validate ranges. Called before any enumeration work starts.
    pub fn validate(&self) -> Result<(), MapError> {
        if self.cut_size < 2 || self.cut_size > MAX_CUT_SIZE {
            return Err(MapError::Config(format!(
                "cut_size {} out of range [2, 16)",
                self.cut_size
            )));
        }
        if self.cut_limit < 2 || self.cut_limit > MAX_CUT_LIMIT {
            return Err(MapError::Config(format!(
                "cut_limit {} out of range [2, 31)",
                self.cut_limit
            )));
        }
        Ok(())
    }
}

/// A single cut: sorted leaf ids, an interned function, and cost fields.
///
/// Cuts are value objects. They are copied into the mapping solution when
/// selected and never shared mutably between nodes.
#[derive(Debug, Clone)]
pub struct Cut {
    leaves: Vec<u32>,
    signature: u64,
    /// Id of the cut function in the session's truth-table cache.
    pub func_id: u32,
    /// Worst leaf arrival plus the cut's own delay.
    pub delay: f64,
    /// Area of the gate implementing this cut.
    pub area: f64,
    /// Area amortized over the estimated fanout of the leaves.
    pub area_flow: f64,
    /// Wire count amortized the same way.
    pub edge_flow: f64,
}

fn signature_of(leaves: &[u32]) -> u64 {
    leaves.iter().fold(0u64, |s, l| s | 1u64 << (l & 63))
}

impl Cut {
    /// Create a cut from sorted leaf ids.
    pub fn new(leaves: Vec<u32>, func_id: u32) -> Self {
        debug_assert!(leaves.windows(2).all(|w| w[0] < w[1]));
        let signature = signature_of(&leaves);
        Self {
            leaves,
            signature,
            func_id,
            delay: 0.0,
            area: 1.0,
            area_flow: 0.0,
            edge_flow: 0.0,
        }
    }

    /// The trivial cut of a node, containing only the node itself.
    pub fn trivial(index: u32, func_id: u32) -> Self {
        Self::new(vec![index], func_id)
    }

    /// The zero-leaf cut of a constant node.
    pub fn zero(func_id: u32) -> Self {
        Self::new(Vec::new(), func_id)
    }

    /// Sorted leaf ids.
    pub fn leaves(&self) -> &[u32] {
        &self.leaves
    }

    /// Number of leaves.
    pub fn size(&self) -> usize {
        self.leaves.len()
    }

    /// Whether this is the trivial cut of `root`.
    pub fn is_trivial(&self, root: u32) -> bool {
        self.leaves.len() == 1 && self.leaves[0] == root
    }

    /// Whether `node` is a leaf of this cut.
    pub fn contains(&self, node: u32) -> bool {
        self.signature & (1u64 << (node & 63)) != 0 && self.leaves.binary_search(&node).is_ok()
    }

    /// Union of two cuts, or `None` if it would exceed `cut_size` leaves.
    pub fn merge(&self, other: &Cut, cut_size: u32) -> Option<Vec<u32>> {
        // The signature popcount is a lower bound on the union size even
        // with hash collisions, so it rejects oversized unions early.
        if (self.signature | other.signature).count_ones() > cut_size {
            return None;
        }
        let mut merged = Vec::with_capacity(self.leaves.len() + other.leaves.len());
        let (mut i, mut j) = (0, 0);
        while i < self.leaves.len() && j < other.leaves.len() {
            let next = match self.leaves[i].cmp(&other.leaves[j]) {
                std::cmp::Ordering::Less => {
                    i += 1;
                    self.leaves[i - 1]
                }
                std::cmp::Ordering::Greater => {
                    j += 1;
                    other.leaves[j - 1]
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                    self.leaves[i - 1]
                }
            };
            merged.push(next);
            if merged.len() as u32 > cut_size {
                return None;
            }
        }
        for &l in &self.leaves[i..] {
            merged.push(l);
            if merged.len() as u32 > cut_size {
                return None;
            }
        }
        for &l in &other.leaves[j..] {
            merged.push(l);
            if merged.len() as u32 > cut_size {
                return None;
            }
        }
        Some(merged)
    }

    /// Whether this cut's leaves are a subset of `other`'s.
    pub fn leaves_subset_of(&self, other: &Cut) -> bool {
        if self.leaves.len() > other.leaves.len() {
            return false;
        }
        if self.signature & !other.signature != 0 {
            return false;
        }
        let mut j = 0;
        for &l in &self.leaves {
            while j < other.leaves.len() && other.leaves[j] < l {
                j += 1;
            }
            if j == other.leaves.len() || other.leaves[j] != l {
                return false;
            }
            j += 1;
        }
        true
    }
}

/// Deterministic ranking of cuts within a set.
///
/// Delay first, then area flow (with an epsilon band), then size, then the
/// lexicographic order of the sorted leaf ids so equal-cost cuts always
/// rank the same way regardless of discovery order.
pub fn cut_compare(a: &Cut, b: &Cut) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    if a.delay < b.delay - EPS {
        return Ordering::Less;
    }
    if a.delay > b.delay + EPS {
        return Ordering::Greater;
    }
    if a.area_flow < b.area_flow - EPS {
        return Ordering::Less;
    }
    if a.area_flow > b.area_flow + EPS {
        return Ordering::Greater;
    }
    match a.size().cmp(&b.size()) {
        Ordering::Equal => a.leaves.cmp(&b.leaves),
        ord => ord,
    }
}

/// Bounded, deduplicated cut collection of one node.
///
/// Non-trivial cuts are kept sorted by [`cut_compare`]; the trivial cut is
/// pinned at the end and exempt from eviction.
#[derive(Debug, Clone, Default)]
pub struct CutSet {
    cuts: Vec<Cut>,
    has_trivial: bool,
}

impl CutSet {
    /// Create an empty cut set.
    pub fn new() -> Self {
        Self::default()
    }

    /// All cuts, best-ranked first, trivial cut last.
    pub fn iter(&self) -> impl Iterator<Item = &Cut> {
        self.cuts.iter()
    }

    /// Number of cuts, including the trivial one.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Whether the set holds no cuts.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Cut by rank.
    pub fn get(&self, i: usize) -> &Cut {
        &self.cuts[i]
    }

    /// Best-ranked cut.
    pub fn best(&self) -> &Cut {
        &self.cuts[0]
    }

    /// Whether any non-trivial cut exists.
    pub fn has_nontrivial(&self, root: u32) -> bool {
        self.cuts.iter().any(|c| !c.is_trivial(root))
    }

    fn nontrivial_len(&self) -> usize {
        self.cuts.len() - usize::from(self.has_trivial)
    }

    /// Insert a non-trivial cut, keeping the set sorted, deduplicated, and
    /// within `limit` non-trivial entries.
    ///
    /// Returns false if the cut was rejected (duplicate with worse cost,
    /// dominated, or worse than every kept cut of a full set).
    pub fn insert(&mut self, cut: Cut, limit: usize, remove_dominated: bool) -> bool {
        let end = self.nontrivial_len();

        // A cut with the same leaves may already exist; keep the cheaper.
        if let Some(pos) = (0..end).find(|&i| self.cuts[i].leaves == cut.leaves) {
            if cut_compare(&cut, &self.cuts[pos]) == std::cmp::Ordering::Less {
                self.cuts.remove(pos);
            } else {
                return false;
            }
        } else if remove_dominated {
            // Dominated by a no-worse subset cut: reject.
            if (0..self.nontrivial_len()).any(|i| {
                self.cuts[i].leaves_subset_of(&cut)
                    && cut_compare(&self.cuts[i], &cut) != std::cmp::Ordering::Greater
            }) {
                return false;
            }
            // Drop kept cuts the new one dominates.
            let mut i = 0;
            while i < self.nontrivial_len() {
                if cut.leaves_subset_of(&self.cuts[i])
                    && cut_compare(&cut, &self.cuts[i]) != std::cmp::Ordering::Greater
                {
                    self.cuts.remove(i);
                } else {
                    i += 1;
                }
            }
        }

        let end = self.nontrivial_len();
        let pos = self.cuts[..end]
            .partition_point(|c| cut_compare(c, &cut) != std::cmp::Ordering::Greater);
        if pos >= limit {
            return false;
        }
        self.cuts.insert(pos, cut);
        if self.nontrivial_len() > limit {
            let worst = self.nontrivial_len() - 1;
            self.cuts.remove(worst);
        }
        true
    }

    /// Append the trivial cut. Always the last entry.
    pub fn push_trivial(&mut self, cut: Cut) {
        debug_assert!(!self.has_trivial);
        self.cuts.push(cut);
        self.has_trivial = true;
    }

    fn clear(&mut self) {
        self.cuts.clear();
        self.has_trivial = false;
    }
}

/// All cut sets of a network plus the shared function cache.
#[derive(Debug)]
pub struct NetworkCuts {
    sets: Vec<CutSet>,
    /// Interned cut functions, shared across the session.
    pub cache: TruthTableCache,
    /// Fanin cut combinations tried.
    pub total_tuples: usize,
    /// Cuts surviving in all sets.
    pub total_cuts: usize,
    func_const0: u32,
    func_var0: u32,
}

impl NetworkCuts {
    fn with_size(size: usize) -> Self {
        let mut cache = TruthTableCache::new();
        let func_const0 = cache.insert(TruthTable::zero(0));
        let func_var0 = cache.insert(TruthTable::nth_var(1, 0));
        Self {
            sets: vec![CutSet::new(); size],
            cache,
            total_tuples: 0,
            total_cuts: 0,
            func_const0,
            func_var0,
        }
    }

    /// Cut set of a node.
    pub fn cuts(&self, index: u32) -> &CutSet {
        &self.sets[index as usize]
    }

    /// Function id of the constant-false cut.
    pub fn const0_func(&self) -> u32 {
        self.func_const0
    }

    /// Function id of the single-variable projection.
    pub fn var0_func(&self) -> u32 {
        self.func_var0
    }
}

/// Positions of `sub`'s leaves within `sup`'s leaves. Both sorted.
fn support_positions(sub: &[u32], sup: &[u32]) -> Vec<u8> {
    let mut positions = Vec::with_capacity(sub.len());
    let mut j = 0;
    for &l in sub {
        while sup[j] != l {
            j += 1;
        }
        positions.push(j as u8);
    }
    positions
}

/// Bottom-up priority cut enumerator.
///
/// Ranks cuts using the caller's per-node arrival and area-flow arrays and
/// refreshes those arrays from each node's best cut as it proceeds, so a
/// node's cuts are always ranked against finalized fanin values.
pub struct CutEnumerator<'a, N: LogicNetwork> {
    ntk: &'a N,
    cfg: &'a CutConfig,
}

impl<'a, N: LogicNetwork> CutEnumerator<'a, N> {
    /// Create an enumerator for one network.
    pub fn new(ntk: &'a N, cfg: &'a CutConfig) -> Self {
        Self { ntk, cfg }
    }

    /// Enumerate cuts for the whole network.
    ///
    /// `arrival`, `flow`, and `est_refs` are per-node arrays owned by the
    /// mapping session; arrival and flow are updated in place.
    pub fn run(
        &self,
        arrival: &mut [f64],
        flow: &mut [f64],
        est_refs: &[f64],
    ) -> Result<NetworkCuts, MapError> {
        self.cfg.validate()?;
        let mut cuts = NetworkCuts::with_size(self.ntk.size());
        for n in self.ntk.topological_order() {
            self.node_cuts(n, &mut cuts, arrival, flow, est_refs);
        }
        Ok(cuts)
    }

    /// Re-enumerate with the mapper's current cost arrays, reusing the
    /// session's function cache.
    pub fn recompute(
        &self,
        cuts: &mut NetworkCuts,
        arrival: &mut [f64],
        flow: &mut [f64],
        est_refs: &[f64],
    ) {
        cuts.total_cuts = 0;
        for n in self.ntk.topological_order() {
            cuts.sets[n.index()].clear();
            self.node_cuts(n, cuts, arrival, flow, est_refs);
        }
    }

    fn node_cuts(
        &self,
        n: NodeId,
        cuts: &mut NetworkCuts,
        arrival: &mut [f64],
        flow: &mut [f64],
        est_refs: &[f64],
    ) {
        let index = n.0;
        if self.ntk.is_constant(n) {
            let mut cut = Cut::zero(cuts.func_const0);
            cut.area = 0.0;
            cuts.sets[n.index()].push_trivial(cut);
            arrival[n.index()] = 0.0;
            flow[n.index()] = 0.0;
            return;
        }
        if self.ntk.is_pi(n) {
            let mut cut = Cut::trivial(index, cuts.func_var0);
            cut.area = 0.0;
            cuts.sets[n.index()].push_trivial(cut);
            arrival[n.index()] = 0.0;
            flow[n.index()] = 0.0;
            return;
        }

        let fanins = self.ntk.fanins(n);
        let limit = (self.cfg.cut_limit - 1) as usize;
        let mut set = CutSet::new();

        if fanins.is_empty() {
            // Constant-function gate, e.g. a zero-input LUT.
            let func_id = if self.cfg.compute_truth {
                let f = self.ntk.compute(n, &[]);
                cuts.cache.insert(f)
            } else {
                0
            };
            set.insert(Cut::new(Vec::new(), func_id), limit, false);
        } else if fanins.len() == 1 {
            // Inverters and buffers inherit the fanin's cuts with the local
            // function applied on top.
            let fanin_cuts: Vec<Cut> = cuts.cuts(fanins[0].node.0).iter().cloned().collect();
            for fc in fanin_cuts {
                let func_id = if self.cfg.compute_truth {
                    let tt = cuts.cache.get(fc.func_id).clone();
                    let f = self.ntk.compute(n, &[tt]);
                    cuts.cache.insert(f)
                } else {
                    0
                };
                let mut cut = Cut::new(fc.leaves().to_vec(), func_id);
                self.cost_cut(&mut cut, arrival, flow);
                set.insert(cut, limit, self.cfg.remove_dominated);
            }
        } else {
            let fanin_sets: Vec<Vec<Cut>> = fanins
                .iter()
                .map(|s| cuts.cuts(s.node.0).iter().cloned().collect())
                .collect();

            // Mixed-radix walk over one cut choice per fanin.
            let mut choice = vec![0usize; fanin_sets.len()];
            'tuples: loop {
                cuts.total_tuples += 1;
                let merged = self.merge_tuple(&fanin_sets, &choice);
                if let Some(leaves) = merged {
                    let vcuts: Vec<&Cut> =
                        choice.iter().enumerate().map(|(i, &c)| &fanin_sets[i][c]).collect();
                    if let Some(cut) = self.build_cut(n, leaves, &vcuts, cuts) {
                        let mut cut = cut;
                        self.cost_cut(&mut cut, arrival, flow);
                        set.insert(cut, limit, self.cfg.remove_dominated);
                    }
                }
                let mut i = 0;
                loop {
                    choice[i] += 1;
                    if choice[i] < fanin_sets[i].len() {
                        break;
                    }
                    choice[i] = 0;
                    i += 1;
                    if i == choice.len() {
                        break 'tuples;
                    }
                }
            }
        }

        // Every node keeps its trivial cut, even when the fanin count
        // exceeds the cut size and no merged cut survived.
        let best = if set.is_empty() {
            None
        } else {
            Some((set.best().delay, set.best().area_flow))
        };
        let mut trivial = Cut::trivial(index, cuts.func_var0);
        trivial.delay = best.map_or(f64::INFINITY, |(d, _)| d);
        set.push_trivial(trivial);

        cuts.total_cuts += set.len();
        arrival[n.index()] = best.map_or(f64::INFINITY, |(d, _)| d);
        flow[n.index()] = best.map_or(f64::INFINITY, |(_, f)| f) / est_refs[n.index()].max(1.0);
        cuts.sets[n.index()] = set;
    }

    fn merge_tuple(&self, fanin_sets: &[Vec<Cut>], choice: &[usize]) -> Option<Vec<u32>> {
        let mut merged = fanin_sets[0][choice[0]].clone();
        for (i, &c) in choice.iter().enumerate().skip(1) {
            let leaves = merged.merge(&fanin_sets[i][c], self.cfg.cut_size)?;
            merged = Cut::new(leaves, 0);
        }
        Some(merged.leaves().to_vec())
    }

    /// Assemble a merged cut, computing and optionally minimizing its
    /// function.
    fn build_cut(
        &self,
        n: NodeId,
        leaves: Vec<u32>,
        fanin_cuts: &[&Cut],
        cuts: &mut NetworkCuts,
    ) -> Option<Cut> {
        if !self.cfg.compute_truth {
            return Some(Cut::new(leaves, 0));
        }
        let k = leaves.len() as u8;
        let fanin_tts: Vec<TruthTable> = fanin_cuts
            .iter()
            .map(|fc| {
                let positions = support_positions(fc.leaves(), &leaves);
                cuts.cache.get(fc.func_id).expand(&positions, k)
            })
            .collect();
        let mut f = self.ntk.compute(n, &fanin_tts);
        let mut leaves = leaves;
        if self.cfg.minimize_truth {
            if let Some((reduced, support)) = f.minimize_support() {
                leaves = support.iter().map(|&p| leaves[p as usize]).collect();
                f = reduced;
            }
        }
        let func_id = cuts.cache.insert(f);
        Some(Cut::new(leaves, func_id))
    }

    /// Rank a cut against the current leaf arrivals and flows. The mapper
    /// re-derives exact costs at selection time; these fields only order
    /// the priority list.
    fn cost_cut(&self, cut: &mut Cut, arrival: &[f64], flow: &[f64]) {
        let mut delay: f64 = 0.0;
        let mut area_flow = cut.area;
        for &l in cut.leaves() {
            delay = delay.max(arrival[l as usize] + 1.0);
            area_flow += flow[l as usize];
        }
        cut.delay = delay;
        cut.area_flow = area_flow;
        cut.edge_flow = cut.size() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;

    fn enumerate(aig: &Aig, cfg: &CutConfig) -> NetworkCuts {
        let size = aig.size();
        let mut arrival = vec![0.0; size];
        let mut flow = vec![0.0; size];
        let est_refs: Vec<f64> = (0..size)
            .map(|i| aig.fanout_size(crate::network::NodeId(i as u32)) as f64)
            .collect();
        CutEnumerator::new(aig, cfg)
            .run(&mut arrival, &mut flow, &est_refs)
            .unwrap()
    }

    #[test]
    fn test_config_validation() {
        let mut cfg = CutConfig::default();
        cfg.cut_size = 1;
        assert!(cfg.validate().is_err());
        cfg.cut_size = 16;
        assert!(cfg.validate().is_err());
        cfg.cut_size = 15;
        cfg.cut_limit = 31;
        assert!(cfg.validate().is_err());
        cfg.cut_limit = 2;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_cut_merge() {
        let a = Cut::new(vec![1, 2], 0);
        let b = Cut::new(vec![2, 3], 0);
        assert_eq!(a.merge(&b, 4), Some(vec![1, 2, 3]));
        assert_eq!(a.merge(&b, 2), None);
    }

    #[test]
    fn test_cut_subset() {
        let a = Cut::new(vec![1, 2], 0);
        let b = Cut::new(vec![1, 2, 3], 0);
        assert!(a.leaves_subset_of(&b));
        assert!(!b.leaves_subset_of(&a));
    }

    #[test]
    fn test_insert_dedup_keeps_cheaper() {
        let mut set = CutSet::new();
        let mut c1 = Cut::new(vec![1, 2], 0);
        c1.delay = 3.0;
        let mut c2 = Cut::new(vec![1, 2], 0);
        c2.delay = 2.0;
        assert!(set.insert(c1, 8, true));
        assert!(set.insert(c2, 8, true));
        assert_eq!(set.len(), 1);
        assert!((set.best().delay - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_insert_dominance() {
        let mut set = CutSet::new();
        let small = Cut::new(vec![1, 2], 0);
        let large = Cut::new(vec![1, 2, 3], 0);
        assert!(set.insert(small, 8, true));
        assert!(!set.insert(large, 8, true));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insert_eviction_is_deterministic() {
        let mut set = CutSet::new();
        for leaves in [vec![5, 6], vec![3, 4], vec![1, 2]] {
            set.insert(Cut::new(leaves, 0), 2, false);
        }
        // Equal costs: lexicographic leaf order decides who survives.
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).leaves(), &[1, 2]);
        assert_eq!(set.get(1).leaves(), &[3, 4]);
    }

    #[test]
    fn test_enumeration_and_chain() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let c = aig.add_input("c");
        let ab = aig.add_and(a, b);
        let abc = aig.add_and(ab, c);
        aig.add_output("y", abc);

        let cuts = enumerate(&aig, &CutConfig::default());
        let set = cuts.cuts(abc.node.0);
        assert!(set
            .iter()
            .any(|cut| cut.leaves() == [a.node.0, b.node.0, c.node.0]));
        // The trivial cut is pinned last.
        assert!(set.get(set.len() - 1).is_trivial(abc.node.0));
    }

    #[test]
    fn test_enumeration_closure() {
        let mut aig = Aig::new();
        let inputs: Vec<_> = (0..8).map(|i| aig.add_input(format!("i{i}"))).collect();
        let mut acc = inputs[0];
        for &s in &inputs[1..] {
            acc = aig.add_and(acc, s);
        }
        aig.add_output("y", acc);

        let cfg = CutConfig {
            cut_size: 4,
            cut_limit: 6,
            ..CutConfig::default()
        };
        let cuts = enumerate(&aig, &cfg);
        for (id, _) in aig.iter_nodes() {
            let set = cuts.cuts(id.0);
            assert!(set.len() <= cfg.cut_limit as usize);
            for cut in set.iter() {
                assert!(cut.size() <= cfg.cut_size as usize);
            }
        }
    }

    #[test]
    fn test_constant_leaves_vanish() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let ab = aig.add_and(a, b);
        aig.add_output("y", ab);

        let cuts = enumerate(&aig, &CutConfig::default());
        // No surviving cut mentions the constant node.
        for cut in cuts.cuts(ab.node.0).iter() {
            assert!(!cut.contains(0));
        }
    }

    #[test]
    fn test_truth_table_of_merged_cut() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let c = aig.add_input("c");
        let ab = aig.add_and(a, b);
        let abc = aig.add_and(ab, c.invert());
        aig.add_output("y", abc);

        let cuts = enumerate(&aig, &CutConfig::default());
        let set = cuts.cuts(abc.node.0);
        let cut = set
            .iter()
            .find(|cut| cut.leaves() == [a.node.0, b.node.0, c.node.0])
            .unwrap();
        let tt = cuts.cache.get(cut.func_id);
        // f = a & b & !c over (a, b, c)
        for row in 0..8usize {
            let expect = (row & 1 == 1) && (row & 2 == 2) && (row & 4 == 0);
            assert_eq!(tt.bit(row), expect, "row {row}");
        }
    }

    #[test]
    fn test_minimize_truth_shrinks_leaves() {
        // y = (a & b) | (a & !b) = a; with support minimization the cut
        // {a, b} collapses into {a}.
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let t1 = aig.add_and(a, b);
        let t2 = aig.add_and(a, b.invert());
        let y = aig.add_or(t1, t2);
        aig.add_output("y", y);

        let cfg = CutConfig {
            minimize_truth: true,
            ..CutConfig::default()
        };
        let cuts = enumerate(&aig, &cfg);
        let set = cuts.cuts(y.node.0);
        assert!(set.iter().any(|cut| cut.leaves() == [a.node.0]));
    }
}
