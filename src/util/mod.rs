//! Utility modules

pub mod buffer;
pub mod fast_time;
pub mod time;
