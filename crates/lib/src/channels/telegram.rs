//! Telegram channel: long-poll getUpdates and the Bot API calls behind `Messenger`.

use crate::channels::inbound::{InboundMessage, MessageId, Peer, Update};
use crate::channels::messenger::{
    AssetDescriptor, CachedAsset, ForwardDestination, Messenger, ResolvedTarget, TransportError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub(crate) struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramMessage {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub new_chat_members: Option<Vec<TelegramUser>>,
    #[serde(default)]
    pub left_chat_member: Option<TelegramUser>,
    #[serde(default)]
    pub new_chat_title: Option<String>,
    #[serde(default)]
    pub pinned_message: Option<serde_json::Value>,
    #[serde(default)]
    pub group_chat_created: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StickerSet {
    #[serde(default)]
    stickers: Vec<Sticker>,
}

#[derive(Debug, Deserialize)]
struct Sticker {
    #[serde(default)]
    file_id: String,
    #[serde(default)]
    file_unique_id: String,
    #[serde(default)]
    emoji: Option<String>,
}

impl TelegramChat {
    fn peer(&self) -> Peer {
        match self.kind.as_str() {
            "private" => Peer::User(self.id),
            "channel" => Peer::Channel(self.id),
            _ => Peer::Group(self.id),
        }
    }
}

impl TelegramMessage {
    fn is_service(&self) -> bool {
        self.new_chat_members.is_some()
            || self.left_chat_member.is_some()
            || self.new_chat_title.is_some()
            || self.pinned_message.is_some()
            || self.group_chat_created
    }
}

impl TelegramUpdate {
    /// Map to the engine's update model. `self_id` is the bot's own user id, used to flag outgoing messages.
    pub(crate) fn into_update(self, self_id: Option<i64>) -> Update {
        let Some(msg) = self.message else {
            return Update::Other;
        };
        let peer = msg.chat.peer();
        if msg.is_service() {
            return Update::Service {
                id: msg.message_id,
                peer,
            };
        }
        let outgoing = match (self_id, msg.from.as_ref()) {
            (Some(me), Some(from)) => from.id == me,
            _ => false,
        };
        let date = DateTime::<Utc>::from_timestamp(msg.date, 0).unwrap_or_default();
        let text = msg.text.or(msg.caption).unwrap_or_default();
        Update::Message(InboundMessage {
            id: msg.message_id,
            peer,
            text,
            date,
            outgoing,
        })
    }
}

/// Telegram channel connector: long-polls for updates and performs the engine's remote calls.
pub struct TelegramChannel {
    token: Option<String>,
    api_base: String,
    own_chat_id: Option<i64>,
    running: AtomicBool,
    self_id: OnceCell<i64>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        Self {
            token,
            api_base,
            own_chat_id: None,
            running: AtomicBool::new(false),
            self_id: OnceCell::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Chat that receives messages forwarded to `ForwardDestination::Own`.
    pub fn with_own_chat(mut self, chat_id: Option<i64>) -> Self {
        self.own_chat_id = chat_id;
        self
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the getUpdates loop after the in-flight poll returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Start the getUpdates long-poll loop and push updates into `updates_tx`. Returns a handle to await on shutdown.
    pub fn start_inbound(self: Arc<Self>, updates_tx: mpsc::Sender<Update>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, updates_tx).await;
        })
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: serde_json::Value,
    ) -> Result<T, TransportError> {
        let token = self
            .token
            .as_ref()
            .ok_or(TransportError::NotConfigured("telegram bot token"))?;
        let url = format!("{}/bot{}/{}", self.api_base, token, method);
        let res = self.client.post(&url).json(&body).send().await?;
        let status = res.status();
        let data: ApiResponse<T> = match res.json().await {
            Ok(d) => d,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Api {
                    method,
                    description: status.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        if !data.ok {
            return Err(TransportError::Api {
                method,
                description: data.description.unwrap_or_else(|| status.to_string()),
            });
        }
        data.result.ok_or_else(|| TransportError::Api {
            method,
            description: "response has no result".to_string(),
        })
    }

    /// The bot's own user id (getMe), fetched once.
    pub async fn self_id(&self) -> Result<i64, TransportError> {
        self.self_id
            .get_or_try_init(|| async {
                let me: TelegramUser = self.call("getMe", json!({})).await?;
                Ok::<i64, TransportError>(me.id)
            })
            .await
            .copied()
    }

    /// Call getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), TransportError> {
        let mut body = json!({ "timeout": LONG_POLL_TIMEOUT });
        if let Some(off) = offset {
            body["offset"] = json!(off);
        }
        let updates: Vec<TelegramUpdate> = self.call("getUpdates", body).await?;
        let next_offset = updates.iter().map(|u| u.update_id).max().map(|id| id + 1);
        Ok((updates, next_offset))
    }

    /// Remove any webhook so getUpdates is allowed.
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: bool = self.call("deleteWebhook", json!({})).await?;
        Ok(())
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, updates_tx: mpsc::Sender<Update>) {
    if let Err(e) = channel.delete_webhook().await {
        log::debug!("telegram: deleteWebhook before polling: {}", e);
    }
    let self_id = match channel.self_id().await {
        Ok(id) => Some(id),
        Err(e) => {
            log::warn!("telegram: getMe failed, outgoing messages cannot be told apart: {}", e);
            None
        }
    };
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                if next.is_some() {
                    offset = next;
                }
                for u in updates {
                    if updates_tx.send(u.into_update(self_id)).await.is_err() {
                        log::debug!("telegram: update channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram: getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram: getUpdates loop stopped");
}

#[async_trait]
impl Messenger for TelegramChannel {
    async fn resolve_identity(&self, address: &str) -> Result<ResolvedTarget, TransportError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(TransportError::NotConfigured("target address"));
        }
        let chat_id = match address.parse::<i64>() {
            Ok(id) => json!(id),
            Err(_) => json!(format!("@{}", address.trim_start_matches('@'))),
        };
        let chat: TelegramChat = self.call("getChat", json!({ "chat_id": chat_id })).await?;
        match chat.peer() {
            Peer::User(user_id) => Ok(ResolvedTarget {
                user_id,
                username: chat.username,
            }),
            _ => Err(TransportError::UnexpectedPeer(format!(
                "{} is a {} chat",
                address, chat.kind
            ))),
        }
    }

    async fn fetch_asset_collection(
        &self,
        name: &str,
    ) -> Result<Vec<AssetDescriptor>, TransportError> {
        let set: StickerSet = self.call("getStickerSet", json!({ "name": name })).await?;
        Ok(set
            .stickers
            .into_iter()
            .map(|s| AssetDescriptor {
                file_id: s.file_id,
                file_unique_id: s.file_unique_id,
                emoji: s.emoji,
            })
            .collect())
    }

    async fn send_reply(
        &self,
        peer: &ResolvedTarget,
        reply_to: MessageId,
        asset: &CachedAsset,
    ) -> Result<(), TransportError> {
        let body = json!({
            "chat_id": peer.user_id,
            "sticker": asset.file_id,
            "reply_parameters": { "message_id": reply_to },
        });
        let _: serde_json::Value = self.call("sendSticker", body).await?;
        Ok(())
    }

    async fn forward(
        &self,
        from: &ResolvedTarget,
        to: ForwardDestination,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        let ForwardDestination::Own = to;
        let to = self
            .own_chat_id
            .ok_or(TransportError::NotConfigured("telegram own chat id"))?;
        let body = json!({
            "chat_id": to,
            "from_chat_id": from.user_id,
            "message_id": message_id,
        });
        let _: serde_json::Value = self.call("forwardMessage", body).await?;
        Ok(())
    }

    async fn revoke(
        &self,
        peer: &ResolvedTarget,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        let body = json!({ "chat_id": peer.user_id, "message_id": message_id });
        let _: bool = self.call("deleteMessage", body).await?;
        Ok(())
    }

    /// Bots have no online status; the liveness signal is a getMe round trip.
    async fn update_presence(&self, offline: bool) -> Result<(), TransportError> {
        if offline {
            return Ok(());
        }
        let _: TelegramUser = self.call("getMe", json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(v: serde_json::Value) -> TelegramUpdate {
        serde_json::from_value(v).expect("valid update")
    }

    #[test]
    fn private_text_message_maps_to_user_peer() {
        let u = parse(json!({
            "update_id": 7,
            "message": {
                "message_id": 11,
                "from": { "id": 42, "is_bot": false },
                "chat": { "id": 42, "type": "private" },
                "date": 1_700_000_000,
                "text": "hi"
            }
        }));
        let Update::Message(msg) = u.into_update(Some(1)) else {
            panic!("expected message");
        };
        assert_eq!(msg.id, 11);
        assert_eq!(msg.peer, Peer::User(42));
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.date.timestamp(), 1_700_000_000);
        assert!(!msg.outgoing);
    }

    #[test]
    fn message_from_self_is_outgoing() {
        let u = parse(json!({
            "update_id": 1,
            "message": {
                "message_id": 2,
                "from": { "id": 99, "is_bot": true },
                "chat": { "id": 42, "type": "private" },
                "date": 0,
                "text": "echo"
            }
        }));
        let Update::Message(msg) = u.into_update(Some(99)) else {
            panic!("expected message");
        };
        assert!(msg.outgoing);
    }

    #[test]
    fn group_and_channel_chats_are_not_user_peers() {
        assert_eq!(
            TelegramChat { id: -5, kind: "supergroup".into(), username: None }.peer(),
            Peer::Group(-5)
        );
        assert_eq!(
            TelegramChat { id: -7, kind: "channel".into(), username: None }.peer(),
            Peer::Channel(-7)
        );
    }

    #[test]
    fn service_message_maps_to_service_update() {
        let u = parse(json!({
            "update_id": 3,
            "message": {
                "message_id": 4,
                "chat": { "id": -5, "type": "group" },
                "date": 0,
                "new_chat_title": "renamed"
            }
        }));
        assert!(matches!(
            u.into_update(None),
            Update::Service { id: 4, peer: Peer::Group(-5) }
        ));
    }

    #[test]
    fn update_without_message_is_other() {
        let u = parse(json!({ "update_id": 5, "edited_message": { "message_id": 1 } }));
        assert!(matches!(u.into_update(None), Update::Other));
    }
}
