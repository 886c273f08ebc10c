//! Mapper driver: bounded-round covering of a logic network.
//!
//! One mapping session runs a fixed sequence of rounds over the subject
//! network:
//!
//! ```text
//! enumerate cuts
//!   -> delay round (skipped when area oriented)
//!   -> required-time propagation + area-flow rounds
//!   -> [area-sharing rounds, technology mapping only]
//!   -> exact-local-area rounds
//!   -> [MFFC collapsing] -> [cut expansion]
//!   -> network construction
//! ```
//!
//! Each round visits nodes in one fixed topological order and selects one
//! cut per node, so a node's costs only ever read finalized fanin values.
//! Termination is by exhausting the configured round counts; with
//! `relax_required` at zero no round may worsen the depth achieved by the
//! delay round.
//!
//! # References
//!
//! - Mishchenko, A., Chatterjee, S., & Brayton, R. (2007). Improvements to
//!   technology mapping for LUT-based FPGAs.
//! - Chatterjee, S., Mishchenko, A., et al. (2006). Reducing structural
//!   bias in technology mapping.

use crate::cost::{mffc, MappingState};
use crate::cuts::{Cut, CutConfig, CutEnumerator, NetworkCuts, EPS};
use crate::error::MapError;
use crate::lut_network::{CellBinding, LutNetwork};
use crate::network::{cone_function, LogicNetwork, NodeId};
use crate::tech_library::{CellMatch, TechLibrary};
use crate::truth::{TruthTable, MAX_CUT_INPUTS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Mapping parameters. Field names match the options surfaced by the
/// command-line layer, which passes them through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapParams {
    /// Maximum cut width, in `[2, 16)`.
    pub cut_size: u32,
    /// Maximum cuts kept per node, in `[2, 31)`.
    pub cut_limit: u32,
    /// Delay target; `0.0` requests the best achievable depth.
    pub required_delay: f64,
    /// Percent of depth relaxation granted to the area rounds.
    pub relax_required: f64,
    /// Number of area-flow rounds.
    pub area_flow_rounds: u32,
    /// Number of area-sharing rounds (technology mapping only).
    pub area_share_rounds: u32,
    /// Number of exact-local-area rounds.
    pub ela_rounds: u32,
    /// Skip the delay round and optimize area from the first round.
    pub area_oriented_mapping: bool,
    /// Optimize edge count as a secondary objective.
    pub edge_optimization: bool,
    /// Collapse maximal fanout-free cones into single mapped units.
    pub collapse_mffcs: bool,
    /// Re-enumerate cuts at the start of each area-flow round.
    pub recompute_cuts: bool,
    /// Try widening selected cuts by substituting a leaf with its fanins.
    pub cut_expansion: bool,
    /// Eagerly remove dominated cuts during enumeration.
    pub remove_dominated_cuts: bool,
    /// Shrink cut functions to their true support.
    pub minimize_truth_tables: bool,
    /// Print per-round statistics.
    pub verbose: bool,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            cut_size: 4,
            cut_limit: 25,
            required_delay: 0.0,
            relax_required: 0.0,
            area_flow_rounds: 1,
            area_share_rounds: 0,
            ela_rounds: 2,
            area_oriented_mapping: false,
            edge_optimization: false,
            collapse_mffcs: false,
            recompute_cuts: false,
            cut_expansion: false,
            remove_dominated_cuts: true,
            minimize_truth_tables: true,
            verbose: false,
        }
    }
}

impl MapParams {
    /// Depth-first mapping; the default.
    pub fn delay_oriented() -> Self {
        Self::default()
    }

    /// Area-first mapping: no delay round, more recovery rounds.
    pub fn area_oriented() -> Self {
        Self {
            area_oriented_mapping: true,
            area_flow_rounds: 2,
            ela_rounds: 2,
            ..Self::default()
        }
    }

    fn cut_config(&self) -> CutConfig {
        CutConfig {
            cut_size: self.cut_size,
            cut_limit: self.cut_limit,
            compute_truth: true,
            minimize_truth: self.minimize_truth_tables,
            remove_dominated: self.remove_dominated_cuts,
        }
    }

    /// Validate ranges. Called before any work starts.
    pub fn validate(&self) -> Result<(), MapError> {
        self.cut_config().validate()?;
        if self.required_delay < 0.0 {
            return Err(MapError::Config(format!(
                "required_delay {} must be non-negative",
                self.required_delay
            )));
        }
        if self.relax_required < 0.0 {
            return Err(MapError::Config(format!(
                "relax_required {} must be non-negative",
                self.relax_required
            )));
        }
        Ok(())
    }
}

/// One line of per-round statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RoundStat {
    /// Round name.
    pub name: String,
    /// Worst output arrival after the round.
    pub delay: f64,
    /// Cover area after the round.
    pub area: f64,
    /// Cover edge count after the round.
    pub edges: f64,
    /// Round runtime in milliseconds.
    pub time_ms: f64,
}

/// Statistics of one mapping invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MapStats {
    /// Achieved cover area (LUT count or summed cell area).
    pub area: f64,
    /// Achieved worst output delay.
    pub delay: f64,
    /// Achieved cover edge count.
    pub edges: f64,
    /// Number of gates in the constructed network.
    pub mapped_nodes: u32,
    /// Nodes that could not meet their propagated required time and fell
    /// back to their minimum-delay cut.
    pub infeasible_nodes: u32,
    /// Per-round summaries.
    pub round_stats: Vec<RoundStat>,
    /// Cuts surviving enumeration.
    pub cut_count: usize,
    /// Fanin cut combinations tried during enumeration.
    pub tuple_count: usize,
    /// Total runtime in milliseconds.
    pub time_total_ms: f64,
}

impl MapStats {
    /// Formatted multi-line report in the round order.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for r in &self.round_stats {
            out.push_str(&format!(
                "{:<10}: Delay = {:8.2}  Area = {:8.2}  Edges = {:8.2}\n",
                r.name, r.delay, r.area, r.edges
            ));
        }
        out.push_str(&format!(
            "Area = {:.2}; Delay = {:.2}; Gates = {}; Infeasible = {}\n",
            self.area, self.delay, self.mapped_nodes, self.infeasible_nodes
        ));
        out
    }
}

/// Result of a mapping invocation.
#[derive(Debug)]
pub struct MapOutcome {
    /// The mapped network.
    pub network: LutNetwork,
    /// Collected statistics.
    pub stats: MapStats,
}

/// Map a network onto k-input LUTs.
pub fn lut_map<N: LogicNetwork>(ntk: &N, params: &MapParams) -> Result<MapOutcome, MapError> {
    Mapper::new(ntk, params, None)?.run()
}

/// Map a network onto cells of a technology library.
pub fn tech_map<N: LogicNetwork>(
    ntk: &N,
    library: &TechLibrary,
    params: &MapParams,
) -> Result<MapOutcome, MapError> {
    Mapper::new(ntk, params, Some(library))?.run()
}

/// A cut under evaluation, with its costs in the current round.
#[derive(Clone)]
struct Candidate {
    cut: Cut,
    matched: Option<CellMatch>,
    arrival: f64,
    area: f64,
    flow: f64,
    edge: f64,
}

/// Three-way epsilon comparison: `Some(true)` when `a` is strictly better.
fn cmp_eps(a: f64, b: f64) -> Option<bool> {
    if a < b - EPS {
        Some(true)
    } else if a > b + EPS {
        Some(false)
    } else {
        None
    }
}

struct Mapper<'a, N: LogicNetwork> {
    ntk: &'a N,
    params: &'a MapParams,
    library: Option<&'a TechLibrary>,
    cut_cfg: CutConfig,
    top_order: Vec<NodeId>,
    state: MappingState,
    cuts: NetworkCuts,
    selected_match: Vec<Option<CellMatch>>,
    match_memo: HashMap<u32, Option<CellMatch>>,
    iteration: u32,
    delay: f64,
    /// Depth achieved by the first round; anchor for required times.
    base_depth: f64,
    area: f64,
    edges: f64,
    infeasible: u32,
    warned_required: bool,
}

impl<'a, N: LogicNetwork> Mapper<'a, N> {
    fn new(
        ntk: &'a N,
        params: &'a MapParams,
        library: Option<&'a TechLibrary>,
    ) -> Result<Self, MapError> {
        params.validate()?;
        let mut cut_cfg = params.cut_config();
        // Boolean matching requires functions reduced to their true
        // support, so degenerate cut functions do not miss their cells.
        if library.is_some() {
            cut_cfg.minimize_truth = true;
        }
        let top_order = ntk.topological_order();
        let mut state = MappingState::new(ntk);
        let cuts = CutEnumerator::new(ntk, &cut_cfg).run(
            &mut state.arrival,
            &mut state.flow,
            &state.est_refs,
        )?;
        Ok(Self {
            ntk,
            params,
            library,
            cut_cfg,
            top_order,
            state,
            cuts,
            selected_match: vec![None; ntk.size()],
            match_memo: HashMap::new(),
            iteration: 0,
            delay: 0.0,
            base_depth: 0.0,
            area: 0.0,
            edges: 0.0,
            infeasible: 0,
            warned_required: false,
        })
    }

    fn run(mut self) -> Result<MapOutcome, MapError> {
        let t_total = Instant::now();
        let mut round_stats = Vec::new();

        if !self.params.area_oriented_mapping {
            let t = Instant::now();
            self.compute_mapping(false, None)?;
            round_stats.push(self.round_stat("Delay", t));
        }

        let share_rounds = if self.library.is_some() {
            self.params.area_share_rounds
        } else {
            0
        };
        let afr = self.params.area_flow_rounds;

        while self.iteration < afr + 1 {
            self.compute_required();
            self.maybe_recompute();
            let t = Instant::now();
            self.compute_mapping(true, None)?;
            round_stats.push(self.round_stat("AreaFlow", t));
        }

        while self.iteration < afr + share_rounds + 1 {
            self.compute_required();
            let share = self.build_share_map();
            let t = Instant::now();
            self.compute_mapping(true, Some(&share))?;
            round_stats.push(self.round_stat("AreaShare", t));
        }

        while self.iteration < afr + share_rounds + self.params.ela_rounds + 1 {
            self.compute_required();
            let t = Instant::now();
            self.compute_mapping_exact()?;
            round_stats.push(self.round_stat("ExactArea", t));
        }

        if self.params.collapse_mffcs {
            self.compute_required();
            let t = Instant::now();
            self.collapse_mffcs_pass();
            round_stats.push(self.round_stat("Collapse", t));
        }

        if self.params.cut_expansion {
            self.compute_required();
            let t = Instant::now();
            self.expand_cuts_pass();
            round_stats.push(self.round_stat("Expand", t));
        }

        let network = self.derive_mapping();

        let stats = MapStats {
            area: self.area,
            delay: self.delay,
            edges: self.edges,
            mapped_nodes: network.lut_count() as u32,
            infeasible_nodes: self.infeasible,
            round_stats,
            cut_count: self.cuts.total_cuts,
            tuple_count: self.cuts.total_tuples,
            time_total_ms: t_total.elapsed().as_secs_f64() * 1e3,
        };
        if self.params.verbose {
            eprintln!("{}", stats.report());
        }
        Ok(MapOutcome { network, stats })
    }

    fn round_stat(&self, name: &str, t: Instant) -> RoundStat {
        debug!(
            round = name,
            delay = self.delay,
            area = self.area,
            edges = self.edges,
            "mapping round done"
        );
        RoundStat {
            name: name.to_string(),
            delay: self.delay,
            area: self.area,
            edges: self.edges,
            time_ms: t.elapsed().as_secs_f64() * 1e3,
        }
    }

    fn maybe_recompute(&mut self) {
        if !self.params.recompute_cuts {
            return;
        }
        let cfg = self.cut_cfg.clone();
        CutEnumerator::new(self.ntk, &cfg).recompute(
            &mut self.cuts,
            &mut self.state.arrival,
            &mut self.state.flow,
            &self.state.est_refs,
        );
        self.match_memo.clear();
    }

    /// Gate area of a cut under the current target.
    fn gate_area(&self, matched: &Option<CellMatch>) -> f64 {
        match (matched, self.library) {
            (Some(m), Some(lib)) => lib.match_area(m),
            _ => 1.0,
        }
    }

    /// Delay from cut leaf `j` to the cut output.
    fn leaf_delay(&self, matched: &Option<CellMatch>, j: usize) -> f64 {
        match (matched, self.library) {
            (Some(m), Some(lib)) => lib.match_pin_delay(m, j),
            _ => 1.0,
        }
    }

    /// Resolve the library match for a cut function.
    ///
    /// Returns `None` when technology mapping finds no cell for the
    /// function; the cut is then unusable. For LUT mapping every cut is
    /// usable and carries no match.
    fn match_for(&mut self, cut: &Cut) -> Option<Option<CellMatch>> {
        let Some(lib) = self.library else {
            return Some(None);
        };
        let cache = &self.cuts.cache;
        let memo = self
            .match_memo
            .entry(cut.func_id)
            .or_insert_with(|| lib.match_function(cache.get(cut.func_id)).cloned());
        memo.as_ref().map(|m| Some(m.clone()))
    }

    fn evaluate_cut(
        &mut self,
        cut: &Cut,
        share: Option<&HashMap<Vec<u32>, u32>>,
    ) -> Option<Candidate> {
        let matched = self.match_for(cut)?;
        let mut arrival: f64 = 0.0;
        let mut flow_sum = 0.0;
        let mut edge_sum = cut.size() as f64;
        for (j, &l) in cut.leaves().iter().enumerate() {
            let li = l as usize;
            arrival = arrival.max(self.state.arrival[li] + self.leaf_delay(&matched, j));
            flow_sum += self.state.flow[li];
            edge_sum += self.state.edge_flow[li];
        }
        let mut area = self.gate_area(&matched);
        if let Some(share) = share {
            if let Some(&count) = share.get(cut.leaves()) {
                if count > 1 {
                    area /= count as f64;
                }
            }
        }
        Some(Candidate {
            cut: cut.clone(),
            matched,
            arrival,
            area,
            flow: area + flow_sum,
            edge: edge_sum,
        })
    }

    /// Candidate cuts of a node: all non-trivial enumerated cuts plus the
    /// currently selected cut, which recomputation or a widening pass may
    /// have dropped from the enumerated set. Under technology mapping the
    /// immediate-fanin cut is also kept available, so a node always has a
    /// candidate the base cells can realize even after priority eviction.
    fn candidates_of(&mut self, n: NodeId) -> Vec<Cut> {
        let index = n.0;
        let mut candidates: Vec<Cut> = self
            .cuts
            .cuts(index)
            .iter()
            .filter(|c| !c.is_trivial(index))
            .cloned()
            .collect();
        if let Some(sel) = &self.state.selected[index as usize] {
            if !candidates.iter().any(|c| c.leaves() == sel.leaves()) {
                candidates.push(sel.clone());
            }
        }
        if self.library.is_some() {
            if let Some(cut) = self.structural_cut(n) {
                if !candidates.iter().any(|c| c.leaves() == cut.leaves()) {
                    candidates.push(cut);
                }
            }
        }
        candidates
    }

    /// The cut over a node's own fanins, with a support-minimized
    /// function.
    fn structural_cut(&mut self, n: NodeId) -> Option<Cut> {
        let mut leaves: Vec<u32> = Vec::new();
        for s in self.ntk.fanins(n) {
            if !self.ntk.is_constant(s.node) && !leaves.contains(&s.node.0) {
                leaves.push(s.node.0);
            }
        }
        if leaves.is_empty() || leaves.len() as u32 > self.params.cut_size {
            return None;
        }
        leaves.sort_unstable();
        let mut func = cone_function(self.ntk, n, &leaves);
        if let Some((reduced, support)) = func.minimize_support() {
            leaves = support.iter().map(|&p| leaves[p as usize]).collect();
            func = reduced;
        }
        let func_id = self.cuts.cache.insert(func);
        Some(Cut::new(leaves, func_id))
    }

    fn unsupported(&self, n: NodeId) -> MapError {
        MapError::UnsupportedNetwork {
            index: n.0,
            fanin: self.ntk.fanin_size(n) as u32,
            cut_size: self.params.cut_size,
        }
    }

    /// Strict "is `a` better than `b`" for a round.
    ///
    /// Delay rounds rank (arrival, flow, size); area rounds rank
    /// (flow, arrival, size). Edge flow slots in after the primary area
    /// objective when edge optimization is on. The final tie-break is the
    /// lexicographic leaf order, fixed and documented, so equal-cost cuts
    /// never depend on evaluation order.
    fn candidate_better(&self, do_area: bool, a: &Candidate, b: &Candidate) -> bool {
        let mut chain: Vec<(f64, f64)> = Vec::with_capacity(4);
        if do_area {
            chain.push((a.flow, b.flow));
            if self.params.edge_optimization {
                chain.push((a.edge, b.edge));
            }
            chain.push((a.arrival, b.arrival));
        } else {
            chain.push((a.arrival, b.arrival));
            chain.push((a.flow, b.flow));
            if self.params.edge_optimization {
                chain.push((a.edge, b.edge));
            }
        }
        for (x, y) in chain {
            if let Some(better) = cmp_eps(x, y) {
                return better;
            }
        }
        match a.cut.size().cmp(&b.cut.size()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => a.cut.leaves() < b.cut.leaves(),
        }
    }

    /// Minimum-delay preference used for the timing-infeasible fallback.
    fn candidate_faster(&self, a: &Candidate, b: &Candidate) -> bool {
        match cmp_eps(a.arrival, b.arrival) {
            Some(better) => better,
            None => a.cut.leaves() < b.cut.leaves(),
        }
    }

    fn compute_mapping(
        &mut self,
        do_area: bool,
        share: Option<&HashMap<Vec<u32>, u32>>,
    ) -> Result<(), MapError> {
        for n in self.top_order.clone() {
            if self.state.is_terminal(n.0) {
                continue;
            }
            self.select_cut(n, do_area, share)?;
        }
        self.set_mapping_refs(false);
        Ok(())
    }

    fn select_cut(
        &mut self,
        n: NodeId,
        do_area: bool,
        share: Option<&HashMap<Vec<u32>, u32>>,
    ) -> Result<(), MapError> {
        let i = n.index();
        let required = self.state.required[i];

        let mut best: Option<Candidate> = None;
        let mut fallback: Option<Candidate> = None;
        for cut in self.candidates_of(n) {
            let Some(cand) = self.evaluate_cut(&cut, share) else {
                continue;
            };
            if fallback
                .as_ref()
                .map_or(true, |f| self.candidate_faster(&cand, f))
            {
                fallback = Some(cand.clone());
            }
            if cand.arrival > required + EPS {
                continue;
            }
            if best
                .as_ref()
                .map_or(true, |b| self.candidate_better(do_area, &cand, b))
            {
                best = Some(cand);
            }
        }

        let chosen = match best {
            Some(c) => c,
            None => {
                let Some(f) = fallback else {
                    return Err(self.unsupported(n));
                };
                self.infeasible += 1;
                f
            }
        };
        self.commit_selection(i, chosen);
        Ok(())
    }

    /// Record a selection: arrivals, flows, and the cut value itself.
    fn commit_selection(&mut self, i: usize, chosen: Candidate) {
        let er = self.state.est_refs[i].max(1.0);
        self.state.arrival[i] = chosen.arrival;
        self.state.flow[i] = chosen.flow / er;
        self.state.edge_flow[i] = chosen.edge / er;
        let mut cut = chosen.cut;
        cut.area = chosen.area;
        cut.delay = chosen.arrival;
        self.state.selected[i] = Some(cut);
        self.selected_match[i] = chosen.matched;
    }

    /// Update cover reference counts, the achieved delay, and the cover
    /// area, then blend the fanout estimates and advance the round
    /// counter.
    fn set_mapping_refs(&mut self, ela: bool) {
        if !ela {
            self.state.map_refs.fill(0);
        }

        self.delay = 0.0;
        for po in self.ntk.outputs() {
            self.delay = self.delay.max(self.state.arrival[po.node.index()]);
            if !ela {
                self.state.map_refs[po.node.index()] += 1;
            }
        }
        if self.iteration == 0 {
            self.base_depth = self.delay;
        }

        self.area = 0.0;
        self.edges = 0.0;
        for n in self.top_order.clone().into_iter().rev() {
            let i = n.index();
            if self.state.is_terminal(n.0) || self.state.map_refs[i] == 0 {
                continue;
            }
            if let Some(sel) = self.state.selected[i].clone() {
                if !ela {
                    for &leaf in sel.leaves() {
                        self.state.map_refs[leaf as usize] += 1;
                    }
                }
                self.area += sel.area;
                self.edges += sel.size() as f64;
            }
        }

        self.state.blend_est_refs(self.iteration);
        self.iteration += 1;
    }

    /// Back-propagate required times from the outputs toward the inputs.
    fn compute_required(&mut self) {
        for r in self.state.required.iter_mut() {
            *r = f64::INFINITY;
        }
        // Nothing to constrain before the first round has selected a cover.
        if self.iteration == 0 {
            return;
        }

        // Anchor relaxation on the depth recorded by the first round, so
        // it does not compound across rounds.
        let relaxed = self.base_depth * (1.0 + self.params.relax_required / 100.0);
        let mut target = relaxed;
        if self.params.required_delay > 0.0 {
            if self.params.required_delay < self.base_depth - EPS {
                if !self.warned_required {
                    warn!(
                        required = self.params.required_delay,
                        achievable = self.base_depth,
                        "cannot meet the target required time"
                    );
                    self.warned_required = true;
                }
            } else if self.params.required_delay >= relaxed - EPS {
                target = self.params.required_delay;
            }
        }

        for po in self.ntk.outputs() {
            let i = po.node.index();
            self.state.required[i] = self.state.required[i].min(target);
        }

        for n in self.top_order.clone().into_iter().rev() {
            let i = n.index();
            if self.state.is_terminal(n.0) || self.state.map_refs[i] == 0 {
                continue;
            }
            let Some(sel) = self.state.selected[i].clone() else {
                continue;
            };
            let matched = self.selected_match[i].clone();
            let req = self.state.required[i];
            for (j, &leaf) in sel.leaves().iter().enumerate() {
                let li = leaf as usize;
                let slack = req - self.leaf_delay(&matched, j);
                self.state.required[li] = self.state.required[li].min(slack);
            }
        }
    }

    fn compute_mapping_exact(&mut self) -> Result<(), MapError> {
        for n in self.top_order.clone() {
            if self.state.is_terminal(n.0) {
                continue;
            }
            self.select_cut_exact(n)?;
        }
        self.set_mapping_refs(true);
        Ok(())
    }

    /// Select by exact local area: measure, per candidate, the cost of the
    /// logic that becomes live under the current cover.
    fn select_cut_exact(&mut self, n: NodeId) -> Result<(), MapError> {
        let i = n.index();
        let required = self.state.required[i];

        // Take the node out of the cover while measuring candidates.
        let referenced = self.state.map_refs[i] > 0;
        let previous = self.state.selected[i].clone();
        if referenced {
            if let Some(prev) = &previous {
                self.state.cut_deref(prev);
            }
        }

        let mut best: Option<Candidate> = None;
        let mut fallback: Option<Candidate> = None;
        for cut in self.candidates_of(n) {
            let Some(mut cand) = self.evaluate_cut(&cut, None) else {
                continue;
            };
            let mut measured = cand.cut.clone();
            measured.area = cand.area;
            let cost = self.state.exact_area(&measured);
            cand.flow = cost.area;
            cand.edge = cost.edges;
            if fallback
                .as_ref()
                .map_or(true, |f| self.candidate_faster(&cand, f))
            {
                fallback = Some(cand.clone());
            }
            if cand.arrival > required + EPS {
                continue;
            }
            if best
                .as_ref()
                .map_or(true, |b| self.candidate_better(true, &cand, b))
            {
                best = Some(cand);
            }
        }

        let chosen = match best {
            Some(c) => c,
            None => {
                let Some(f) = fallback else {
                    return Err(self.unsupported(n));
                };
                self.infeasible += 1;
                f
            }
        };

        self.state.arrival[i] = chosen.arrival;
        self.state.flow[i] = chosen.flow;
        self.state.edge_flow[i] = chosen.edge;
        let mut cut = chosen.cut;
        cut.area = chosen.area;
        cut.delay = chosen.arrival;
        self.selected_match[i] = chosen.matched;
        self.state.selected[i] = Some(cut);

        if referenced {
            if let Some(sel) = self.state.selected[i].clone() {
                self.state.cut_ref(&sel);
            }
        }
        Ok(())
    }

    /// Leaf-set sharing across the current cover, for area amortization of
    /// multi-output cells.
    fn build_share_map(&self) -> HashMap<Vec<u32>, u32> {
        let mut share: HashMap<Vec<u32>, u32> = HashMap::new();
        for (i, sel) in self.state.selected.iter().enumerate() {
            if self.state.map_refs[i] == 0 {
                continue;
            }
            if let Some(cut) = sel {
                *share.entry(cut.leaves().to_vec()).or_default() += 1;
            }
        }
        share
    }

    /// Build a widened candidate over `leaves`, simulating the cone to
    /// re-derive its function. Returns the candidate with its match, or
    /// `None` if the function has no cell under technology mapping.
    fn widened_candidate(&mut self, n: NodeId, leaves: Vec<u32>) -> Option<(Cut, Option<CellMatch>, f64)> {
        let func = cone_function(self.ntk, n, &leaves);
        let func_id = self.cuts.cache.insert(func);
        let cut = Cut::new(leaves, func_id);
        let matched = self.match_for(&cut)?;
        let mut arrival: f64 = 0.0;
        for (j, &l) in cut.leaves().iter().enumerate() {
            arrival = arrival.max(self.state.arrival[l as usize] + self.leaf_delay(&matched, j));
        }
        let mut cut = cut;
        cut.area = self.gate_area(&matched);
        cut.delay = arrival;
        Some((cut, matched, arrival))
    }

    /// Replace selected cuts by their MFFC frontier where that saves exact
    /// area. The frontier may exceed `cut_size`, up to the truth-table
    /// capacity.
    fn collapse_mffcs_pass(&mut self) {
        for n in self.top_order.clone() {
            let i = n.index();
            if self.state.is_terminal(n.0) || self.state.map_refs[i] == 0 {
                continue;
            }
            let (cone, frontier) = mffc(self.ntk, n);
            if cone.len() < 2 || frontier.is_empty() || frontier.len() > MAX_CUT_INPUTS {
                continue;
            }
            let Some(prev) = self.state.selected[i].clone() else {
                continue;
            };
            if prev.leaves() == frontier.as_slice() {
                continue;
            }
            let Some((cand, matched, arrival)) = self.widened_candidate(n, frontier) else {
                continue;
            };
            if arrival > self.state.required[i] + EPS {
                continue;
            }

            self.state.cut_deref(&prev);
            let new_cost = self.state.exact_area(&cand);
            let old_cost = self.state.exact_area(&prev);
            if new_cost.area < old_cost.area - EPS {
                self.state.cut_ref(&cand);
                self.state.arrival[i] = arrival;
                self.state.selected[i] = Some(cand);
                self.selected_match[i] = matched;
            } else {
                self.state.cut_ref(&prev);
            }
        }
        self.refresh_cover_totals();
    }

    /// Try substituting one leaf of each selected cut with that leaf's own
    /// fanins, adopting the substitution only on a strict exact-area win
    /// within the cut size.
    fn expand_cuts_pass(&mut self) {
        for n in self.top_order.clone() {
            let i = n.index();
            if self.state.is_terminal(n.0) || self.state.map_refs[i] == 0 {
                continue;
            }
            let Some(current) = self.state.selected[i].clone() else {
                continue;
            };

            self.state.cut_deref(&current);
            let mut best_cut = current.clone();
            let mut best_match = self.selected_match[i].clone();
            let mut best_arrival = self.state.arrival[i];
            let mut best_area = self.state.exact_area(&current).area;
            let mut improved = false;

            for &leaf in current.leaves() {
                if self.state.is_terminal(leaf) {
                    continue;
                }
                let mut leaves: Vec<u32> = current
                    .leaves()
                    .iter()
                    .copied()
                    .filter(|&l| l != leaf)
                    .collect();
                for s in self.ntk.fanins(NodeId(leaf)) {
                    if !self.ntk.is_constant(s.node) && !leaves.contains(&s.node.0) {
                        leaves.push(s.node.0);
                    }
                }
                leaves.sort_unstable();
                if leaves.len() as u32 > self.params.cut_size {
                    continue;
                }
                let Some((cand, matched, arrival)) = self.widened_candidate(n, leaves) else {
                    continue;
                };
                if arrival > self.state.required[i] + EPS {
                    continue;
                }
                let cost = self.state.exact_area(&cand);
                if cost.area < best_area - EPS {
                    best_area = cost.area;
                    best_arrival = arrival;
                    best_cut = cand;
                    best_match = matched;
                    improved = true;
                }
            }

            self.state.cut_ref(&best_cut);
            if improved {
                self.state.arrival[i] = best_arrival;
                self.state.selected[i] = Some(best_cut);
                self.selected_match[i] = best_match;
            }
        }
        self.refresh_cover_totals();
    }

    /// Recompute arrivals, achieved delay, area, and edges from the
    /// current cover without touching reference counts or the round
    /// counter. Used after the widening passes, which can change the
    /// arrival of interior nodes.
    fn refresh_cover_totals(&mut self) {
        self.area = 0.0;
        self.edges = 0.0;
        for n in self.top_order.clone() {
            let i = n.index();
            if self.state.is_terminal(n.0) || self.state.map_refs[i] == 0 {
                continue;
            }
            let Some(sel) = self.state.selected[i].clone() else {
                continue;
            };
            let matched = self.selected_match[i].clone();
            let mut arrival: f64 = 0.0;
            for (j, &leaf) in sel.leaves().iter().enumerate() {
                arrival =
                    arrival.max(self.state.arrival[leaf as usize] + self.leaf_delay(&matched, j));
            }
            self.state.arrival[i] = arrival;
            self.area += sel.area;
            self.edges += sel.size() as f64;
        }
        self.delay = 0.0;
        for po in self.ntk.outputs() {
            self.delay = self.delay.max(self.state.arrival[po.node.index()]);
        }
    }

    /// Materialize the cover into a k-LUT network.
    fn derive_mapping(&mut self) -> LutNetwork {
        let mut out = LutNetwork::new();
        let size = self.ntk.size();
        let mut node_map: Vec<Option<crate::network::Signal>> = vec![None; size];
        let mut inverters: HashMap<u32, crate::network::Signal> = HashMap::new();
        let mut pi_counter = 0usize;

        for n in self.top_order.clone() {
            let i = n.index();
            if self.ntk.is_constant(n) {
                node_map[i] = Some(LutNetwork::constant_false());
                continue;
            }
            if self.ntk.is_pi(n) {
                let name = self
                    .ntk
                    .pi_name(n)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("pi{pi_counter}"));
                pi_counter += 1;
                node_map[i] = Some(out.add_input(name));
                continue;
            }
            if self.state.map_refs[i] == 0 {
                continue;
            }
            let Some(sel) = &self.state.selected[i] else {
                continue;
            };
            debug_assert!(!sel.is_trivial(n.0));
            let children: Vec<crate::network::Signal> = sel
                .leaves()
                .iter()
                .map(|&l| node_map[l as usize].expect("cut leaf constructed before its root"))
                .collect();
            let function = self.cuts.cache.get(sel.func_id).clone();
            let binding = self.binding_for(&self.selected_match[i]);
            node_map[i] = Some(out.add_lut(children, function, binding));
        }

        for (idx, po) in self.ntk.outputs().iter().enumerate() {
            let name = self
                .ntk
                .po_name(idx)
                .map(str::to_string)
                .unwrap_or_else(|| format!("po{idx}"));
            let driver = node_map[po.node.index()].expect("primary output driver constructed");
            let signal = if po.complemented {
                *inverters.entry(po.node.0).or_insert_with(|| {
                    let binding = self.library.and_then(|lib| {
                        lib.cell_by_name("INV").map(|_| CellBinding {
                            cell: "INV".to_string(),
                            pin_of_leaf: vec![0],
                            negated_leaves: 0,
                            output_complemented: false,
                        })
                    });
                    self.area += self
                        .library
                        .and_then(|lib| lib.inverter_info())
                        .map_or(1.0, |(a, _)| a);
                    out.add_lut(vec![driver], TruthTable::from_bits(1, 0x1), binding)
                })
            } else {
                driver
            };
            out.add_output(name, signal);
        }
        out
    }

    fn binding_for(&self, matched: &Option<CellMatch>) -> Option<CellBinding> {
        let (m, lib) = (matched.as_ref()?, self.library?);
        Some(CellBinding {
            cell: lib.cell(m.cell).name.clone(),
            pin_of_leaf: m.pin_of_leaf.clone(),
            negated_leaves: m.negated_leaves,
            output_complemented: m.output_complemented,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Aig;
    use crate::network::Signal;

    fn and_chain(width: usize) -> (Aig, Vec<Signal>) {
        let mut aig = Aig::new();
        let inputs: Vec<Signal> = (0..width).map(|i| aig.add_input(format!("i{i}"))).collect();
        let mut acc = inputs[0];
        for &s in &inputs[1..] {
            acc = aig.add_and(acc, s);
        }
        aig.add_output("y", acc);
        (aig, inputs)
    }

    #[test]
    fn test_invalid_params_rejected() {
        let (aig, _) = and_chain(4);
        let params = MapParams {
            cut_size: 1,
            ..MapParams::default()
        };
        assert!(matches!(lut_map(&aig, &params), Err(MapError::Config(_))));
        let params = MapParams {
            cut_limit: 40,
            ..MapParams::default()
        };
        assert!(matches!(lut_map(&aig, &params), Err(MapError::Config(_))));
    }

    #[test]
    fn test_and_chain_collapses_into_one_lut() {
        let (aig, _) = and_chain(4);
        let outcome = lut_map(&aig, &MapParams::default()).unwrap();
        assert_eq!(outcome.network.lut_count(), 1);
        assert!((outcome.stats.delay - 1.0).abs() < 1e-9);
        for assignment in 0..16u64 {
            assert_eq!(
                outcome.network.simulate(assignment),
                vec![assignment == 15]
            );
        }
    }

    #[test]
    fn test_wide_lut_is_unsupported() {
        use crate::lut_network::LutNetwork;
        use crate::truth::TruthTable;

        let mut wide = LutNetwork::new();
        let inputs: Vec<Signal> = (0..5).map(|i| wide.add_input(format!("i{i}"))).collect();
        let and5 = wide.add_lut(inputs, TruthTable::ones(5), None);
        wide.add_output("y", and5);

        let params = MapParams {
            cut_size: 4,
            ..MapParams::default()
        };
        assert!(matches!(
            lut_map(&wide, &params),
            Err(MapError::UnsupportedNetwork { fanin: 5, .. })
        ));
    }

    #[test]
    fn test_round_sequence() {
        let (aig, _) = and_chain(8);
        let params = MapParams {
            area_flow_rounds: 2,
            ela_rounds: 1,
            ..MapParams::default()
        };
        let outcome = lut_map(&aig, &params).unwrap();
        let names: Vec<&str> = outcome
            .stats
            .round_stats
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Delay", "AreaFlow", "AreaFlow", "ExactArea"]);
    }

    #[test]
    fn test_area_oriented_skips_delay_round() {
        let (aig, _) = and_chain(8);
        let outcome = lut_map(&aig, &MapParams::area_oriented()).unwrap();
        assert!(outcome
            .stats
            .round_stats
            .iter()
            .all(|r| r.name != "Delay"));
    }

    #[test]
    fn test_complemented_output_gets_inverter() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let and = aig.add_and(a, b);
        aig.add_output("nand", and.invert());

        let outcome = lut_map(&aig, &MapParams::default()).unwrap();
        for assignment in 0..4u64 {
            assert_eq!(
                outcome.network.simulate(assignment),
                vec![assignment != 3]
            );
        }
    }

    #[test]
    fn test_constant_output() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let zero = aig.add_and(a, a.invert());
        aig.add_output("zero", zero);
        aig.add_output("one", Aig::constant_true());

        let outcome = lut_map(&aig, &MapParams::default()).unwrap();
        assert_eq!(outcome.network.simulate(0), vec![false, true]);
        assert_eq!(outcome.network.simulate(1), vec![false, true]);
    }

    #[test]
    fn test_tech_map_binds_cells() {
        let (aig, _) = and_chain(4);
        let lib = TechLibrary::minimal();
        let params = MapParams {
            cut_size: 2,
            ..MapParams::default()
        };
        let outcome = tech_map(&aig, &lib, &params).unwrap();
        for id in 0..outcome.network.node_count() as u32 {
            if let crate::lut_network::LutNode::Lut { binding, .. } =
                outcome.network.node(NodeId(id))
            {
                let binding = binding.as_ref().expect("every mapped gate is bound");
                assert!(lib.cell_by_name(&binding.cell).is_some());
            }
        }
        for assignment in 0..16u64 {
            assert_eq!(
                outcome.network.simulate(assignment),
                vec![assignment == 15]
            );
        }
    }

    #[test]
    fn test_names_survive_mapping() {
        let mut aig = Aig::new();
        let a = aig.add_input("lhs");
        let b = aig.add_input("rhs");
        let conj = aig.add_and(a, b);
        aig.add_output("conj", conj);

        let outcome = lut_map(&aig, &MapParams::default()).unwrap();
        assert_eq!(outcome.network.pi_name(NodeId(1)), Some("lhs"));
        assert_eq!(outcome.network.named_outputs()[0].0, "conj");
    }

    #[test]
    fn test_report_mentions_rounds() {
        let (aig, _) = and_chain(6);
        let outcome = lut_map(&aig, &MapParams::default()).unwrap();
        let report = outcome.stats.report();
        assert!(report.contains("Delay"));
        assert!(report.contains("ExactArea"));
    }
}
