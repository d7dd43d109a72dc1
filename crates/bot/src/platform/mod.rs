#![forbid(unsafe_code)]

//! Seam between the bot and the chat platform.
//!
//! Channels have stable numeric ids; topics only have a title. Every call is
//! a blocking round-trip and a non-success response surfaces as
//! [`RemoteError::Api`].

mod zulip;

pub use zulip::{ZulipClient, ZulipEvent, ZulipQueue};

use crate::error::RemoteError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
}

/// Where an inbound message was posted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Place {
    Stream {
        stream_id: u64,
        stream: String,
        topic: String,
    },
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub sender_id: u64,
    pub sender_email: String,
    pub content: String,
    pub place: Place,
}

impl Message {
    pub fn stream(&self) -> Option<&str> {
        match &self.place {
            Place::Stream { stream, .. } => Some(stream),
            Place::Private => None,
        }
    }
}

/// Which messages of a topic an edit applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagate {
    All,
}

impl Propagate {
    pub fn as_str(self) -> &'static str {
        match self {
            Propagate::All => "change_all",
        }
    }
}

pub trait ChatPlatform {
    /// Fails when no channel carries `name`.
    fn resolve_channel_id(&self, name: &str) -> Result<u64, RemoteError>;

    /// Create-or-get; `owner` is subscribed either way.
    fn ensure_channel(&self, name: &str, description: &str, owner: u64)
    -> Result<u64, RemoteError>;

    fn list_channels(&self) -> Result<Vec<Channel>, RemoteError>;

    fn list_topics(&self, channel_id: u64) -> Result<Vec<Topic>, RemoteError>;

    /// Id of the oldest message in `channel_id` whose topic is exactly `topic`.
    fn find_first_message(&self, channel_id: u64, topic: &str)
    -> Result<Option<u64>, RemoteError>;

    fn rename_topic(
        &self,
        message_id: u64,
        title: &str,
        propagate: Propagate,
    ) -> Result<(), RemoteError>;

    fn move_topic(
        &self,
        message_id: u64,
        channel_id: u64,
        propagate: Propagate,
    ) -> Result<(), RemoteError>;

    /// Returns the id of the posted message.
    fn post_message(&self, channel: &str, topic: &str, body: &str) -> Result<u64, RemoteError>;

    fn send_private(&self, user_id: u64, body: &str) -> Result<u64, RemoteError>;

    fn add_reaction(&self, message_id: u64, emoji: &str) -> Result<(), RemoteError>;
}
