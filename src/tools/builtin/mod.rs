//! Built-in tools.

pub mod free_time;

pub use free_time::FindFreeTimeTool;
