//! Tool-call envelope and cross-cutting configuration.
//!
//! Every handler in `session_buddy` speaks this crate's [`ToolRequest`]
//! / [`ToolResponse`] shapes over stdio or HTTP, and builds its
//! collaborators (`sb_store::StoreConfig`, a `sb_sync::HybridSync`, an
//! `sb_evolution::EvolutionConfig`) from a single [`SessionBuddyConfig`].

pub mod config;
pub mod error;
pub mod tool;

pub use config::{ForceMethod, SessionBuddyConfig};
pub use error::{ErrorKind, ToolError};
pub use tool::{ToolRequest, ToolResponse};
