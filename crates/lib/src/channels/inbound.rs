//! Inbound updates from the transport: delivered to the reactor one at a time.

use chrono::{DateTime, Utc};

/// Message identifier, unique within the chat it was sent to.
pub type MessageId = i64;

/// Who a message was exchanged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// One-to-one conversation with an individual user.
    User(i64),
    /// Group or supergroup.
    Group(i64),
    Channel(i64),
}

impl Peer {
    /// The user id when this is an individual-user peer.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Peer::User(id) => Some(*id),
            _ => None,
        }
    }
}

/// A plain message received from the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub peer: Peer,
    pub text: String,
    pub date: DateTime<Utc>,
    /// Sent by this agent itself.
    pub outgoing: bool,
}

/// One event from the transport's update stream.
#[derive(Debug, Clone)]
pub enum Update {
    /// A regular message.
    Message(InboundMessage),
    /// Service message (member joined, title changed, pin, ...).
    Service { id: MessageId, peer: Peer },
    /// Anything the reactor never looks at (edits, channel posts, callbacks).
    Other,
}
