//! Resolved target and cached asset, each behind its own lock.
//!
//! Readers always get an owned copy; no caller ever holds a reference into the store,
//! and the two locks are never held together.

use crate::channels::{CachedAsset, ResolvedTarget};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct StateStore {
    target: RwLock<Option<ResolvedTarget>>,
    asset: RwLock<Option<CachedAsset>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_target(&self, target: ResolvedTarget) {
        *self.target.write().await = Some(target);
    }

    /// Snapshot of the resolved target; None until setup has resolved it.
    pub async fn target(&self) -> Option<ResolvedTarget> {
        self.target.read().await.clone()
    }

    pub async fn set_asset(&self, asset: CachedAsset) {
        *self.asset.write().await = Some(asset);
    }

    /// Snapshot of the cached asset; None when setup could not fetch one.
    pub async fn asset(&self) -> Option<CachedAsset> {
        self.asset.read().await.clone()
    }

    /// The target, only when it is resolved and its user id is `user_id`.
    pub async fn target_for(&self, user_id: i64) -> Option<ResolvedTarget> {
        self.target().await.filter(|t| t.user_id == user_id)
    }
}
