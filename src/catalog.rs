use crate::error::Result;
use crate::types::MediaItem;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Stream of tracks in the order the catalog returns them
pub type TrackStream = BoxStream<'static, Result<MediaItem>>;

/// Read access to the media catalog
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Top tracks of an artist
    fn artist_top_tracks(&self, item_id: &str, provider: &str) -> TrackStream;

    /// Tracks of an album
    fn album_tracks(&self, item_id: &str, provider: &str) -> TrackStream;

    /// Tracks of a playlist
    fn playlist_tracks(&self, item_id: &str, provider: &str) -> TrackStream;

    /// Integrated loudness of a track in LUFS, if it was measured
    async fn track_loudness(&self, item_id: &str, provider: &str) -> Result<Option<f64>>;
}
