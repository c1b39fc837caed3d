//! Append-only, tamper-evident ledger of audit events.
//!
//! Every block carries the SHA-256 digest of its predecessor, so altering any
//! recorded event breaks every link after it. Blocks are also indexed by
//! digest, which lets a third party confirm "the block with digest X recorded
//! event Y" without walking the chain.

pub mod config;
pub mod error;
pub mod index;
pub mod ledger;
pub mod model;
pub mod routes;

use std::sync::Arc;

pub use config::ServerConfig;
pub use error::{ApiError, ConfigError, LedgerError};
pub use index::BlockIndex;
pub use ledger::{check_link, is_valid, ChainReport, Ledger};
pub use model::{compute_block_hash, hash_concat, Block, BlockEntry};

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}
