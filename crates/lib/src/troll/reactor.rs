//! Message reactor: admission filter and the two randomized reactions.

use crate::channels::{CachedAsset, ForwardDestination, MessageId, ResolvedTarget, Update};
use crate::troll::{Troll, TrollError};

/// Reaction dispatched for an admitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Replied with the cached sticker.
    Ignored,
    /// Forwarded to the agent's own chat, then deleted for everyone.
    Revoked,
}

impl Troll {
    /// Handle one inbound update. Returns `Ok(None)` when the update is filtered out
    /// (not a plain message, outgoing, not from a user, or not from the resolved target).
    /// Safe to call concurrently.
    pub async fn on_message(&self, update: &Update) -> Result<Option<Reaction>, TrollError> {
        let Update::Message(msg) = update else {
            return Ok(None);
        };
        if msg.outgoing {
            return Ok(None);
        }
        let Some(user_id) = msg.peer.user_id() else {
            return Ok(None);
        };
        let Some(target) = self.store.target_for(user_id).await else {
            return Ok(None);
        };

        log::info!("reactor: got message {:?} sent at {}", msg.text, msg.date);

        if let Some(policy) = &self.policy {
            if !policy.permit() {
                log::debug!("reactor: dispatch policy skipped msg_id {}", msg.id);
                return Ok(None);
            }
        }

        match self.store.asset().await {
            Some(asset) if self.coin.flip() => {
                self.ignored(&target, msg.id, &asset).await?;
                Ok(Some(Reaction::Ignored))
            }
            _ => {
                self.revoke(&target, msg.id).await?;
                Ok(Some(Reaction::Revoked))
            }
        }
    }

    async fn ignored(
        &self,
        target: &ResolvedTarget,
        msg_id: MessageId,
        asset: &CachedAsset,
    ) -> Result<(), TrollError> {
        log::info!("reactor: answer sticker to msg_id {}", msg_id);
        self.messenger
            .send_reply(target, msg_id, asset)
            .await
            .map_err(TrollError::Reply)
    }

    async fn revoke(&self, target: &ResolvedTarget, msg_id: MessageId) -> Result<(), TrollError> {
        log::info!("reactor: delete message {}", msg_id);
        if let Err(e) = self
            .messenger
            .forward(target, ForwardDestination::Own, msg_id)
            .await
        {
            log::warn!("reactor: forward failed: {}", e);
        }
        self.messenger
            .revoke(target, msg_id)
            .await
            .map_err(TrollError::Revoke)
    }
}
