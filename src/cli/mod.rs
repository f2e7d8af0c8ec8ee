pub mod backup;
pub mod clear;
pub mod counts;
pub mod doctor;
pub mod export;
pub mod import;
pub mod interactions;
pub mod stats;
pub mod summaries;

use anyhow::Result;

use mindcache::config::MindCacheConfig;
use mindcache::storage::Storage;

/// Storage for one-shot commands.
fn open(config: &MindCacheConfig) -> Result<Storage> {
    mindcache::server::open_storage(config)
}
