pub mod calendar;
pub mod chain;
pub mod chart;
pub mod classify;
pub mod day;
pub mod granularity;
pub mod peak;
pub mod point;
pub mod settings;
pub mod source;
pub mod sources;
