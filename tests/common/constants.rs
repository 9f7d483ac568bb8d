//! Shared constants for end-to-end tests
//!
//! When the seeded data set changes, update only this file and
//! `fixtures.rs`.

// ============================================================================
// Seeded artists
// ============================================================================

/// Listening history and catalog; similar to Stars of the Lid.
pub const ARTIST_GROUPER: &str = "Grouper";

/// Listening history and catalog.
pub const ARTIST_STARS_OF_THE_LID: &str = "Stars of the Lid";

/// Catalog and registry.
pub const ARTIST_LOW: &str = "Low";

/// Only known to the catalog, never published.
pub const ARTIST_UNCORROBORATED: &str = "Nobody Knows Me";

/// Number of artists the seeded snapshots reconcile to.
pub const SEEDED_ARTIST_COUNT: usize = 3;

/// Ids follow catalog order of the corroborated artists.
pub const GROUPER_ID: i64 = 1;
pub const STARS_OF_THE_LID_ID: i64 = 2;
pub const LOW_ID: i64 = 3;

/// Job id of the graph rebuild.
pub const GRAPH_REBUILD_JOB_ID: &str = "graph_rebuild";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server readiness (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// HTTP request timeout for test clients (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum time to wait for a triggered job to finish (milliseconds)
pub const JOB_COMPLETION_TIMEOUT_MS: u64 = 10_000;
