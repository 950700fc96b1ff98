//! Transport binding.
//!
//! The `Messenger` trait is the contract the reaction engine calls into; the
//! Telegram channel implements it over the Bot API and feeds inbound updates
//! to the engine through an mpsc channel.

mod inbound;
mod messenger;
mod telegram;

pub use inbound::{InboundMessage, MessageId, Peer, Update};
pub use messenger::{
    AssetDescriptor, CachedAsset, ForwardDestination, Messenger, ResolvedTarget, TransportError,
};
pub use telegram::TelegramChannel;
