//! One-time setup: resolve the target (fatal on failure) and cache the reaction asset (best effort).

use crate::channels::{CachedAsset, ResolvedTarget, TransportError};
use crate::troll::Troll;

/// Setup failure that leaves the agent without an operating mode.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("resolve {address:?}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: TransportError,
    },
}

/// Why no reaction asset is cached. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("no sticker set configured")]
    NotConfigured,
    #[error("get sticker set {name:?}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: TransportError,
    },
    #[error("sticker set {0:?} is empty")]
    Empty(String),
    #[error("last sticker of {0:?} has no file reference")]
    Malformed(String),
}

#[derive(Debug)]
pub enum AssetOutcome {
    Cached(CachedAsset),
    /// Asset reactions are disabled for this run.
    Degraded(AssetError),
}

/// Result of a successful setup; the asset step may still have degraded.
#[derive(Debug)]
pub struct SetupReport {
    pub target: ResolvedTarget,
    pub asset: AssetOutcome,
}

impl SetupReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self.asset, AssetOutcome::Degraded(_))
    }
}

impl Troll {
    /// Resolve the target and cache the last asset of the configured collection.
    ///
    /// Only `run` and `serve` guarantee this happens once per `Troll`; calling it
    /// directly again re-resolves and overwrites the stored target and asset.
    pub async fn setup(&self) -> Result<SetupReport, SetupError> {
        let target = self.resolve_target().await?;
        let asset = match self.fetch_asset().await {
            Ok(asset) => AssetOutcome::Cached(asset),
            Err(e) => {
                log::warn!("setup: get sticker failed: {}", e);
                AssetOutcome::Degraded(e)
            }
        };
        Ok(SetupReport { target, asset })
    }

    async fn resolve_target(&self) -> Result<ResolvedTarget, SetupError> {
        let target = self
            .messenger
            .resolve_identity(&self.address)
            .await
            .map_err(|source| SetupError::Resolve {
                address: self.address.clone(),
                source,
            })?;
        self.store.set_target(target.clone()).await;
        log::info!("setup: got user {} (id {})", self.address, target.user_id);
        Ok(target)
    }

    async fn fetch_asset(&self) -> Result<CachedAsset, AssetError> {
        let name = self.collection.trim();
        if name.is_empty() {
            return Err(AssetError::NotConfigured);
        }
        let set = self
            .messenger
            .fetch_asset_collection(name)
            .await
            .map_err(|source| AssetError::Fetch {
                name: name.to_string(),
                source,
            })?;
        let last = set.last().ok_or_else(|| AssetError::Empty(name.to_string()))?;
        let asset = last
            .as_asset()
            .ok_or_else(|| AssetError::Malformed(name.to_string()))?;
        self.store.set_asset(asset.clone()).await;
        log::info!("setup: got sticker set {} ({} stickers)", name, set.len());
        Ok(asset)
    }
}
