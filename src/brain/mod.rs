//! Phase 2: The Brain
//!
//! Responsible for:
//! - Finding negative cycles (arbitrage loops) using bounded Bellman-Ford
//! - Re-pricing each loop with real rates
//! - Filtering out loops below the bps threshold

mod bellman_ford;
mod evaluator;
mod filter;

pub use bellman_ford::{BoundedBellmanFord, CandidateCycle, CycleStep};
pub use evaluator::CycleEvaluator;
pub use filter::{rank, ArbitrageOpportunity, FilterStats, ProfitFilter};
