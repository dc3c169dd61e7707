//! Hierarchical timer wheel (§4.5).

pub mod wheel;

pub use wheel::{FiredTimer, TimerId, TimerWheel};
