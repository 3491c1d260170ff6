//! Consensus engine.
//!
//! A request fans out to the enabled judge backends (all at once, or one at
//! a time cheapest-first for cascading), the verdicts are combined under the
//! chosen strategy, and every call feeds the performance tracker that weights
//! the next request.

pub mod aggregator;
pub mod cost;
mod dispatcher;
mod error;
mod strategies;
mod types;

pub use aggregator::{aggregate, cascade_satisfied, threshold_reached, ProfileTable, VotingProfile};
pub use cost::{order_by_cost, CascadeController, CostMeter};
pub use dispatcher::{ConsensusEngine, DispatchPhase};
pub use error::ConsensusError;
pub use strategies::ConsensusStrategy;
pub use types::*;
