//! External artist sources and their normalized snapshots.

mod error;
mod lastfm;
mod lookup;
mod models;
mod musicbrainz;
mod rate_limit;
mod retry;
mod snapshot;
mod spotify;

pub use error::SourceError;
pub use lastfm::LastFmClient;
pub use lookup::{lookup_all, ArtistLookup, FetchReport};
pub use models::{SourceArtist, SourceKind};
pub use musicbrainz::MusicBrainzClient;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use snapshot::{
    load_snapshot, save_snapshot, save_snapshots, snapshot_path, SnapshotLoadReport,
    SourceSnapshots,
};
pub use spotify::SpotifyClient;
