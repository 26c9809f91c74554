//! Shader bytecode cache and the canonical loader built on top of it: include resolution,
//! deterministic cache keys, and stage compilation fanned out across the task pool.

pub mod builder;
pub mod cache;
pub mod driver;
pub mod include;
