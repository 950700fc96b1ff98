//! Messenger contract: the remote calls the reaction engine issues against the transport.

use crate::channels::inbound::MessageId;
use async_trait::async_trait;

/// Transport-side failure of a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{method} failed: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
    #[error("{0} not configured")]
    NotConfigured(&'static str),
    #[error("resolved peer is not a user: {0}")]
    UnexpectedPeer(String),
}

/// The one identity the agent reacts to, as returned by identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub user_id: i64,
    /// Public username, when the account has one.
    pub username: Option<String>,
}

/// Reaction asset that can be resent by reference, without re-upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub file_id: String,
    pub file_unique_id: String,
    pub emoji: Option<String>,
}

/// One entry of a fetched asset collection, as the transport reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub file_id: String,
    pub file_unique_id: String,
    pub emoji: Option<String>,
}

impl AssetDescriptor {
    /// Usable asset, or None when the descriptor carries no file reference.
    pub fn as_asset(&self) -> Option<CachedAsset> {
        if self.file_id.trim().is_empty() {
            return None;
        }
        Some(CachedAsset {
            file_id: self.file_id.clone(),
            file_unique_id: self.file_unique_id.clone(),
            emoji: self.emoji.clone(),
        })
    }
}

/// Where a forwarded message lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardDestination {
    /// The agent's own chat.
    Own,
}

/// Remote operations consumed by setup, the presence loop and the reactor.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Resolve an address (`@username`, bare username or numeric id) to a user.
    async fn resolve_identity(&self, address: &str) -> Result<ResolvedTarget, TransportError>;

    /// Fetch an asset collection by name. Order is preserved; may be empty.
    async fn fetch_asset_collection(
        &self,
        name: &str,
    ) -> Result<Vec<AssetDescriptor>, TransportError>;

    /// Send `asset` to `peer` as a reply to `reply_to`.
    async fn send_reply(
        &self,
        peer: &ResolvedTarget,
        reply_to: MessageId,
        asset: &CachedAsset,
    ) -> Result<(), TransportError>;

    /// Forward `message_id` from the conversation with `from` to `to`.
    async fn forward(
        &self,
        from: &ResolvedTarget,
        to: ForwardDestination,
        message_id: MessageId,
    ) -> Result<(), TransportError>;

    /// Delete `message_id` in the conversation with `peer` for all parties.
    async fn revoke(&self, peer: &ResolvedTarget, message_id: MessageId)
        -> Result<(), TransportError>;

    /// Emit the presence/liveness signal.
    async fn update_presence(&self, offline: bool) -> Result<(), TransportError>;
}
