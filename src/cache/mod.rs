//! Read-through cache kept coherent with the graph store by a sync token.

mod coherency;
mod keys;
mod store;
mod sync_token;

pub use coherency::{
    publish_sync_token, CacheOutcome, CachedPayload, CoherentCache, DEFAULT_CACHE_TTL,
};
pub use keys::{cache_key, SYNC_TOKEN_KEY};
pub use store::{CacheStore, InMemoryCacheStore};
pub use sync_token::{SyncToken, SyncTokenSource};
