//! Recording in-memory `Messenger` shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use troll::channels::{
    AssetDescriptor, CachedAsset, ForwardDestination, InboundMessage, MessageId, Messenger, Peer,
    ResolvedTarget, TransportError, Update,
};
use troll::troll::Coin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    Fetch(String),
    Reply {
        peer: i64,
        reply_to: MessageId,
        file_id: String,
    },
    Forward {
        from: i64,
        to: ForwardDestination,
        message_id: MessageId,
    },
    Revoke {
        peer: i64,
        message_id: MessageId,
    },
    Presence(bool),
}

pub struct FakeMessenger {
    /// None: identity resolution fails.
    pub target: Option<ResolvedTarget>,
    /// None: collection fetch fails.
    pub collection: Option<Vec<AssetDescriptor>>,
    pub fail_reply: AtomicBool,
    pub fail_forward: AtomicBool,
    pub fail_revoke: AtomicBool,
    pub fail_presence: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

fn fake_error(method: &'static str) -> TransportError {
    TransportError::Api {
        method,
        description: "injected failure".to_string(),
    }
}

pub fn sticker(n: usize) -> AssetDescriptor {
    AssetDescriptor {
        file_id: format!("file-{}", n),
        file_unique_id: format!("uniq-{}", n),
        emoji: Some("🙂".to_string()),
    }
}

impl FakeMessenger {
    /// Resolves to `user_id`, collection of `stickers` items.
    pub fn new(user_id: i64, stickers: usize) -> Self {
        Self {
            target: Some(ResolvedTarget {
                user_id,
                username: Some("target".to_string()),
            }),
            collection: Some((0..stickers).map(sticker).collect()),
            fail_reply: AtomicBool::new(false),
            fail_forward: AtomicBool::new(false),
            fail_revoke: AtomicBool::new(false),
            fail_presence: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn resolve_identity(&self, address: &str) -> Result<ResolvedTarget, TransportError> {
        self.record(Call::Resolve(address.to_string()));
        self.target.clone().ok_or_else(|| fake_error("getChat"))
    }

    async fn fetch_asset_collection(
        &self,
        name: &str,
    ) -> Result<Vec<AssetDescriptor>, TransportError> {
        self.record(Call::Fetch(name.to_string()));
        self.collection
            .clone()
            .ok_or_else(|| fake_error("getStickerSet"))
    }

    async fn send_reply(
        &self,
        peer: &ResolvedTarget,
        reply_to: MessageId,
        asset: &CachedAsset,
    ) -> Result<(), TransportError> {
        self.record(Call::Reply {
            peer: peer.user_id,
            reply_to,
            file_id: asset.file_id.clone(),
        });
        if self.fail_reply.load(Ordering::SeqCst) {
            return Err(fake_error("sendSticker"));
        }
        Ok(())
    }

    async fn forward(
        &self,
        from: &ResolvedTarget,
        to: ForwardDestination,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        self.record(Call::Forward {
            from: from.user_id,
            to,
            message_id,
        });
        if self.fail_forward.load(Ordering::SeqCst) {
            return Err(fake_error("forwardMessage"));
        }
        Ok(())
    }

    async fn revoke(
        &self,
        peer: &ResolvedTarget,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        self.record(Call::Revoke {
            peer: peer.user_id,
            message_id,
        });
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(fake_error("deleteMessage"));
        }
        Ok(())
    }

    async fn update_presence(&self, offline: bool) -> Result<(), TransportError> {
        self.record(Call::Presence(offline));
        if self.fail_presence.load(Ordering::SeqCst) {
            return Err(fake_error("getMe"));
        }
        Ok(())
    }
}

/// Coin that always lands the same way.
pub struct FixedCoin(pub bool);

impl Coin for FixedCoin {
    fn flip(&self) -> bool {
        self.0
    }
}

pub fn message_from(peer: Peer, id: MessageId, text: &str) -> Update {
    Update::Message(InboundMessage {
        id,
        peer,
        text: text.to_string(),
        date: Utc::now(),
        outgoing: false,
    })
}

pub fn outgoing_to(peer: Peer, id: MessageId) -> Update {
    Update::Message(InboundMessage {
        id,
        peer,
        text: "mine".to_string(),
        date: Utc::now(),
        outgoing: true,
    })
}
