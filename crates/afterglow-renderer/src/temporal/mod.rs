//! Temporal supersampling: sub-pixel jitter and running-average accumulation.

mod accumulator;
mod jitter;

pub use accumulator::{AccumulationState, TemporalAccumulator};
pub use jitter::{halton, jitter_table};
