//! Category evolution: periodic re-clustering of stored memories into
//! subcategories, temporal decay of stale ones, and the scoring used to
//! assign new memories to existing subcategories.
//!
//! Top-level categories are the closed enum [`Category`]; everything
//! below that is learned (subcategory name, keywords, centroid).

pub mod assign;
pub mod cluster;
pub mod config;
pub mod decay;
pub mod engine;
pub mod error;
pub mod global;
pub mod memory;
pub mod types;

pub use assign::{assign_subcategory, detect_category, SubcategoryCentroid};
pub use config::{ArchiveOption, EvolutionConfig};
pub use engine::CategoryEvolutionEngine;
pub use error::{EvolutionError, Result};
pub use global::get_evolution_engine;
pub use memory::EvolvableMemory;
pub use types::{
    AssignmentMethod, AssignmentResult, Category, CategorySnapshotState, DecayResult,
    EvolutionSnapshot, Subcategory,
};
