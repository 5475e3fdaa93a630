//! rapids core module
//!
//! A parallel, in-process dataset library: lazy pipelines of partitioned
//! collections with lineage tracking, an opt-in cache for shared
//! intermediate partitions, and parallel actions over a pluggable task
//! executor.

pub mod cache;
pub mod config;
pub mod context;
pub mod dataset;
pub mod partitioner;
pub mod scheduler;
pub mod traits;

pub use cache::Elements;
pub use config::{Config, ParallelPolicy};
pub use context::ExecutionContext;
pub use dataset::*;
pub use partitioner::{HashPartitioner, Partitioner};
pub use scheduler::{RayonExecutor, TaskExecutor};
pub use traits::*;
