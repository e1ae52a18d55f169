use crate::error::Result;
use crate::types::QueueItem;
use async_trait::async_trait;
use std::sync::Arc;

/// Queue of items for one player
///
/// Ordering, gapless playback and repeat/shuffle live in the implementation;
/// the hub only decides where new items go.
#[async_trait]
pub trait PlayerQueue: Send + Sync {
    /// Replace the queue contents and start at the first item
    async fn load(&self, items: Vec<QueueItem>) -> Result<()>;

    /// Insert items relative to the current item (0 = play now, 1 = play next)
    async fn insert(&self, items: Vec<QueueItem>, offset: usize) -> Result<()>;

    /// Append items to the end of the queue
    async fn append(&self, items: Vec<QueueItem>) -> Result<()>;

    /// Resume playback of the queue
    async fn resume(&self) -> Result<()>;

    /// Skip to the next item
    async fn next(&self) -> Result<()>;

    /// Go back to the previous item
    async fn previous(&self) -> Result<()>;

    /// Re-read player state after the player changed
    async fn update_state(&self) -> Result<()>;

    /// Release queue resources on shutdown
    async fn close(&self) -> Result<()>;

    /// Id of the item currently playing
    fn cur_item_id(&self) -> Option<String>;
}

/// Creates the queue of a newly registered player
pub trait QueueFactory: Send + Sync {
    fn create(&self, player_id: &str) -> Arc<dyn PlayerQueue>;
}
