//! Pipelines publishing their results into the state store.

pub mod market;
pub mod peak;
