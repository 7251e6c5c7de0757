//! `reclink-linkage`: two-party record linkage engine.
//!
//! Pure engine crate: loads party records, builds block indexes, intersects
//! them and scores every candidate pair. No CLI dependencies.

pub mod blocking;
pub mod classify;
pub mod compare;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod intersect;
pub mod matcher;
pub mod model;
pub mod store;
pub mod summary;

pub use config::{LinkageConfig, LinkagePlan};
pub use engine::{run, run_from_config};
pub use error::LinkageError;
pub use model::{LinkageInput, LinkageResult, Party, Record, RecordStore};
