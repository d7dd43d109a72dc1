#![forbid(unsafe_code)]
#![allow(dead_code)]

use gtd_bot::{Channel, ChatPlatform, Message, Place, Propagate, RemoteError, Topic};
use gtd_core::{Context, Project, ProjectList, Task};
use gtd_storage::SqliteStore;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

pub const SENDER_ID: u64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ResolveChannelId(String),
    EnsureChannel { name: String, owner: u64 },
    ListChannels,
    ListTopics(u64),
    FindFirstMessage { channel_id: u64, topic: String },
    Rename { message_id: u64, title: String },
    Move { message_id: u64, channel_id: u64 },
    Post { channel: String, topic: String, body: String },
    Private { user_id: u64, body: String },
    Reaction { message_id: u64, emoji: String },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::EnsureChannel { .. }
                | Call::Rename { .. }
                | Call::Move { .. }
                | Call::Post { .. }
                | Call::Private { .. }
                | Call::Reaction { .. }
        )
    }
}

#[derive(Clone, Debug)]
struct FakeTopic {
    title: String,
    // `None` models a topic whose first message cannot be fetched.
    anchor: Option<u64>,
}

/// In-memory platform that records every call.
pub struct FakePlatform {
    channels: RefCell<Vec<Channel>>,
    topics: RefCell<BTreeMap<u64, Vec<FakeTopic>>>,
    next_channel_id: Cell<u64>,
    next_message_id: Cell<u64>,
    calls: RefCell<Vec<Call>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(Vec::new()),
            topics: RefCell::new(BTreeMap::new()),
            next_channel_id: Cell::new(100),
            next_message_id: Cell::new(1000),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_channel(self, id: u64, name: &str) -> Self {
        self.channels.borrow_mut().push(Channel {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn with_topic(self, channel_id: u64, title: &str, anchor: u64) -> Self {
        self.push_topic(channel_id, title, Some(anchor));
        self
    }

    pub fn with_orphan_topic(self, channel_id: u64, title: &str) -> Self {
        self.push_topic(channel_id, title, None);
        self
    }

    pub fn with_next_message_id(self, id: u64) -> Self {
        self.next_message_id.set(id);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn renames(&self) -> Vec<(u64, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Rename { message_id, title } => Some((*message_id, title.clone())),
                _ => None,
            })
            .collect()
    }

    /// Body of the most recent stream post or private message.
    pub fn last_reply(&self) -> String {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::Post { body, .. } | Call::Private { body, .. } => Some(body.clone()),
                _ => None,
            })
            .expect("bot should have replied")
    }

    pub fn topic_titles(&self, channel_id: u64) -> Vec<String> {
        self.topics
            .borrow()
            .get(&channel_id)
            .map(|topics| topics.iter().map(|topic| topic.title.clone()).collect())
            .unwrap_or_default()
    }

    fn push_topic(&self, channel_id: u64, title: &str, anchor: Option<u64>) {
        self.topics
            .borrow_mut()
            .entry(channel_id)
            .or_default()
            .push(FakeTopic {
                title: title.to_string(),
                anchor,
            });
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn channel_named(&self, name: &str) -> Option<u64> {
        self.channels
            .borrow()
            .iter()
            .find(|channel| channel.name == name)
            .map(|channel| channel.id)
    }

    fn mint_message_id(&self) -> u64 {
        let id = self.next_message_id.get();
        self.next_message_id.set(id + 1);
        id
    }

    /// Removes the topic a message anchors, returning its channel.
    fn take_topic(&self, message_id: u64) -> Option<(u64, FakeTopic)> {
        let mut topics = self.topics.borrow_mut();
        for (channel_id, list) in topics.iter_mut() {
            if let Some(index) = list.iter().position(|topic| topic.anchor == Some(message_id)) {
                return Some((*channel_id, list.remove(index)));
            }
        }
        None
    }
}

fn api_error(msg: &str) -> RemoteError {
    RemoteError::Api {
        msg: msg.to_string(),
    }
}

impl ChatPlatform for FakePlatform {
    fn resolve_channel_id(&self, name: &str) -> Result<u64, RemoteError> {
        self.record(Call::ResolveChannelId(name.to_string()));
        self.channel_named(name)
            .ok_or_else(|| api_error(&format!("Invalid stream name '{name}'")))
    }

    fn ensure_channel(&self, name: &str, _description: &str, owner: u64) -> Result<u64, RemoteError> {
        self.record(Call::EnsureChannel {
            name: name.to_string(),
            owner,
        });
        if let Some(id) = self.channel_named(name) {
            return Ok(id);
        }
        let id = self.next_channel_id.get();
        self.next_channel_id.set(id + 1);
        self.channels.borrow_mut().push(Channel {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    fn list_channels(&self) -> Result<Vec<Channel>, RemoteError> {
        self.record(Call::ListChannels);
        Ok(self.channels.borrow().clone())
    }

    fn list_topics(&self, channel_id: u64) -> Result<Vec<Topic>, RemoteError> {
        self.record(Call::ListTopics(channel_id));
        Ok(self
            .topic_titles(channel_id)
            .into_iter()
            .map(|name| Topic { name })
            .collect())
    }

    fn find_first_message(&self, channel_id: u64, topic: &str) -> Result<Option<u64>, RemoteError> {
        self.record(Call::FindFirstMessage {
            channel_id,
            topic: topic.to_string(),
        });
        Ok(self.topics.borrow().get(&channel_id).and_then(|topics| {
            topics
                .iter()
                .find(|candidate| candidate.title == topic)
                .and_then(|candidate| candidate.anchor)
        }))
    }

    fn rename_topic(&self, message_id: u64, title: &str, propagate: Propagate) -> Result<(), RemoteError> {
        assert_eq!(propagate, Propagate::All, "renames must cover the whole topic");
        self.record(Call::Rename {
            message_id,
            title: title.to_string(),
        });
        let (channel_id, mut topic) = self
            .take_topic(message_id)
            .ok_or_else(|| api_error("Invalid message(s)"))?;
        topic.title = title.to_string();
        self.topics.borrow_mut().entry(channel_id).or_default().push(topic);
        Ok(())
    }

    fn move_topic(&self, message_id: u64, channel_id: u64, _propagate: Propagate) -> Result<(), RemoteError> {
        self.record(Call::Move {
            message_id,
            channel_id,
        });
        if let Some((_, topic)) = self.take_topic(message_id) {
            self.topics.borrow_mut().entry(channel_id).or_default().push(topic);
        }
        Ok(())
    }

    fn post_message(&self, channel: &str, topic: &str, body: &str) -> Result<u64, RemoteError> {
        self.record(Call::Post {
            channel: channel.to_string(),
            topic: topic.to_string(),
            body: body.to_string(),
        });
        let channel_id = self
            .channel_named(channel)
            .ok_or_else(|| api_error(&format!("Stream '{channel}' does not exist")))?;
        let id = self.mint_message_id();
        let exists = self
            .topic_titles(channel_id)
            .iter()
            .any(|title| title == topic);
        if !exists {
            self.push_topic(channel_id, topic, Some(id));
        }
        Ok(id)
    }

    fn send_private(&self, user_id: u64, body: &str) -> Result<u64, RemoteError> {
        self.record(Call::Private {
            user_id,
            body: body.to_string(),
        });
        Ok(self.mint_message_id())
    }

    fn add_reaction(&self, message_id: u64, emoji: &str) -> Result<(), RemoteError> {
        self.record(Call::Reaction {
            message_id,
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}

pub fn stream_message(id: u64, stream_id: u64, stream: &str, topic: &str, content: &str) -> Message {
    Message {
        id,
        sender_id: SENDER_ID,
        sender_email: "alice@example.com".to_string(),
        content: content.to_string(),
        place: Place::Stream {
            stream_id,
            stream: stream.to_string(),
            topic: topic.to_string(),
        },
    }
}

pub fn private_message(content: &str) -> Message {
    Message {
        id: 1,
        sender_id: SENDER_ID,
        sender_email: "alice@example.com".to_string(),
        content: content.to_string(),
        place: Place::Private,
    }
}

/// List 7 `Projects.Home`, context 9 `@Errands`, project 3 `Groceries`.
pub fn seeded_store() -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().expect("in-memory store should open");
    store
        .upsert_project_list(&ProjectList {
            id: 7,
            name: "Projects.Home".to_string(),
        })
        .expect("seed project list");
    store
        .upsert_context(&Context {
            id: 9,
            name: "@Errands".to_string(),
        })
        .expect("seed context");
    store
        .upsert_project(&Project {
            id: 3,
            name: "Groceries #L7-P3".to_string(),
            project_list_id: 7,
            completed: false,
        })
        .expect("seed project");
    store
}

pub fn seed_task(store: &mut SqliteStore, id: u64, name: &str, project_id: Option<u64>) -> Task {
    store
        .upsert_task(&Task {
            id,
            name: name.to_string(),
            project_id,
            context_id: 9,
            completed: false,
        })
        .expect("seed task")
}
