pub mod config;
pub mod error;
pub mod model;
pub mod resolve;
pub mod extract;
pub mod store;
pub mod overrides;
pub mod consolidate;
pub mod graph;
pub mod combs;
pub mod pipeline;

pub use config::Config;
pub use error::{BeegraphError, Result};
pub use consolidate::{consolidate, Consolidated};
pub use graph::{build_shortest_paths, ShortestPaths};
pub use model::{Entity, Group, IntermediateRecordSet, Relation};
pub use overrides::OverrideSet;
pub use pipeline::{run, RunOptions, RunReport};
