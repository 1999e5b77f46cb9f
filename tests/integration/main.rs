//! Integration tests for Graft
//!
//! These run the reducer, the pipeline and the scheduler together against
//! the in-memory store.

mod fixtures;
mod pipeline;
mod scheduling;
mod startup;
