use thiserror::Error;

/// Result type for player hub operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors that can occur when reconciling or commanding players
#[derive(Error, Debug)]
pub enum HubError {
    /// No player is registered under this id
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    /// The player's provider is not registered
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// No control is registered under this id
    #[error("Control not found: {0}")]
    ControlNotFound(String),

    /// A provider failed to execute a device command
    #[error("Provider error for {player_id}: {detail}")]
    Provider {
        /// Player the command was addressed to
        player_id: String,
        /// Error detail reported by the provider
        detail: String,
    },

    /// A playback queue operation failed
    #[error("Queue error for {player_id}: {detail}")]
    Queue {
        /// Player owning the queue
        player_id: String,
        /// Error detail reported by the queue
        detail: String,
    },

    /// Media catalog lookup failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event bus has no more senders
    #[error("Event bus closed")]
    EventBusClosed,
}

impl HubError {
    /// Build a provider failure for the given player
    pub fn provider(player_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Provider {
            player_id: player_id.into(),
            detail: detail.into(),
        }
    }

    /// Build a queue failure for the given player
    pub fn queue(player_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Queue {
            player_id: player_id.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error only signals a missing player, provider or control
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PlayerNotFound(_) | Self::ProviderNotFound(_) | Self::ControlNotFound(_)
        )
    }
}
