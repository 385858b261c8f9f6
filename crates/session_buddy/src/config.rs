//! Binds CLI flags / environment variables to a [`SessionBuddyConfig`],
//! then derives each collaborator's narrower config from it.

use std::path::PathBuf;

use clap::Parser;
use sb_protocol::config::{ForceMethod as ConfigForceMethod, SessionBuddyConfig};
use sb_store::pool::StoreConfig;

#[derive(Parser, Debug)]
#[command(name = "session-buddy", about = "Assistant-session memory coordinator")]
pub struct Cli {
    /// Path to the SQLite database file. Defaults to
    /// `$SESSION_BUDDY_HOME/memory.db`.
    #[arg(long, env = "SESSION_BUDDY_DB")]
    pub database_path: Option<PathBuf>,

    /// Collection name partitioning stored memories.
    #[arg(long, env = "SESSION_BUDDY_COLLECTION", default_value = "default")]
    pub collection_name: String,

    /// Cloud object-store bucket name for the hybrid sync's `cloud` method.
    #[arg(long, env = "AKOSHA_CLOUD_BUCKET")]
    pub akosha_cloud_bucket: Option<String>,

    /// Cloud object-store HTTPS endpoint. Defaults to an AWS-style
    /// `https://{bucket}.s3.amazonaws.com` URL when unset.
    #[arg(long, env = "AKOSHA_CLOUD_ENDPOINT")]
    pub akosha_cloud_endpoint: Option<String>,

    /// System identifier recorded in sync manifests.
    #[arg(long, env = "AKOSHA_SYSTEM_ID")]
    pub akosha_system_id: Option<String>,

    /// Pin the hybrid sync to one method instead of walking the chain.
    #[arg(long, env = "AKOSHA_FORCE_METHOD", default_value = "auto")]
    pub akosha_force_method: String,

    /// Disable gzip compression of uploaded sync files.
    #[arg(long, env = "AKOSHA_DISABLE_COMPRESSION")]
    pub akosha_disable_compression: bool,

    /// Disable checksum-based dedup of already-uploaded sync files.
    #[arg(long, env = "AKOSHA_DISABLE_DEDUPLICATION")]
    pub akosha_disable_deduplication: bool,

    /// Maximum retry attempts per sync method before moving on.
    #[arg(long, env = "AKOSHA_MAX_RETRIES", default_value_t = 3)]
    pub akosha_max_retries: u32,

    /// Base exponential-backoff delay (seconds) between sync retries.
    #[arg(long, env = "AKOSHA_RETRY_BACKOFF_SECONDS", default_value_t = 1)]
    pub akosha_retry_backoff_seconds: u64,

    /// Verbose console logging.
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Read newline-delimited tool requests from stdin, write responses to stdout.
    Serve,
    /// Create a checkpoint commit in the given directory.
    Checkpoint {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        project: String,
        #[arg(long, default_value_t = 80)]
        quality_score: u8,
    },
    /// Schedule background git gc.
    Gc {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value = "7.days")]
        prune_delay: String,
        #[arg(long, default_value_t = 200)]
        auto_threshold: u32,
    },
    /// Print store and worker pool health as JSON.
    Health,
}

impl Cli {
    /// Translate parsed CLI/env input into the cross-cutting config every
    /// handler builds its collaborators from.
    pub fn to_session_buddy_config(&self) -> SessionBuddyConfig {
        let mut config = SessionBuddyConfig::default();
        config.collection_name = self.collection_name.clone();
        if let Some(path) = &self.database_path {
            config.database_path = path.clone();
        } else {
            config.database_path = sb_logging::session_buddy_home().join("memory.db");
        }
        config.akosha_cloud_bucket = self.akosha_cloud_bucket.clone();
        config.akosha_cloud_endpoint = self.akosha_cloud_endpoint.clone();
        config.akosha_system_id = self.akosha_system_id.clone();
        config.akosha_force_method = match self.akosha_force_method.as_str() {
            "cloud" => ConfigForceMethod::Cloud,
            "http" => ConfigForceMethod::Http,
            _ => ConfigForceMethod::Auto,
        };
        config.akosha_enable_compression = !self.akosha_disable_compression;
        config.akosha_enable_deduplication = !self.akosha_disable_deduplication;
        config.akosha_max_retries = self.akosha_max_retries;
        config.akosha_retry_backoff_seconds = self.akosha_retry_backoff_seconds;
        config
    }
}

/// Derive the memory store's narrower config from the cross-cutting one.
pub fn store_config(config: &SessionBuddyConfig) -> StoreConfig {
    StoreConfig::file(config.database_path.to_string_lossy().to_string())
}
