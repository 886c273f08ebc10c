//! Priority-cut mapping engine for logic networks.
//!
//! This crate implements cut-based covering of Boolean-function graphs:
//! LUT mapping onto k-input lookup tables and technology mapping onto a
//! cell library, both driven by the same bounded-round engine.
//!
//! # Architecture
//!
//! ```text
//! LogicNetwork  ->  CutEnumerator  ->  Mapper rounds  ->  LutNetwork
//!   (Aig, ...)       (priority cuts)    (delay, area       (k-LUTs or
//!                                        flow, exact        bound cells)
//!                                        local area)
//! ```
//!
//! # Key Components
//!
//! - [`LogicNetwork`] - capability trait of the subject network
//! - [`Aig`] - And-Inverter Graph input representation
//! - [`CutEnumerator`] - bounded per-node priority cut lists
//! - [`lut_map`] / [`tech_map`] - the covering engine entry points
//! - [`LutNetwork`] - the mapped output network
//! - [`TechLibrary`] - cell library with Boolean matching
//!
//! # Example
//!
//! ```
//! use cutmap::{lut_map, Aig, MapParams};
//!
//! let mut aig = Aig::new();
//! let a = aig.add_input("a");
//! let b = aig.add_input("b");
//! let c = aig.add_input("c");
//! let ab = aig.add_and(a, b);
//! let abc = aig.add_and(ab, c);
//! aig.add_output("y", abc);
//!
//! let outcome = lut_map(&aig, &MapParams::default()).unwrap();
//! assert_eq!(outcome.network.lut_count(), 1);
//! ```

pub mod aig;
pub mod cost;
pub mod cuts;
pub mod error;
pub mod lut_network;
pub mod mapping;
pub mod network;
pub mod tech_library;
pub mod truth;

pub use aig::{Aig, AigNode};
pub use cost::{mffc, ConeCost, MappingState};
pub use cuts::{Cut, CutConfig, CutEnumerator, CutSet, NetworkCuts};
pub use error::MapError;
pub use lut_network::{CellBinding, LutNetwork, LutNode};
pub use mapping::{lut_map, tech_map, MapOutcome, MapParams, MapStats, RoundStat};
pub use network::{cone_function, LogicNetwork, NodeId, Signal};
pub use tech_library::{CellMatch, LibraryCell, TechLibrary};
pub use truth::{TruthTable, TruthTableCache, MAX_CUT_INPUTS};
