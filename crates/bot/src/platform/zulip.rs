#![forbid(unsafe_code)]

use super::{Channel, ChatPlatform, Message, Place, Propagate, Topic};
use crate::error::RemoteError;
use reqwest::Method;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

// Long-polling on /events holds the request open for about a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Zulip REST API v1 over blocking HTTP with basic auth.
#[derive(Debug, Clone)]
pub struct ZulipClient {
    http: Client,
    site: String,
    email: String,
    api_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZulipQueue {
    pub queue_id: String,
    pub last_event_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZulipEvent {
    Message(Message),
    Heartbeat,
    Other(String),
}

#[derive(Deserialize)]
struct StreamIdResponse {
    stream_id: u64,
}

#[derive(Deserialize)]
struct StreamsResponse {
    streams: Vec<WireStream>,
}

#[derive(Deserialize)]
struct WireStream {
    stream_id: u64,
    name: String,
}

#[derive(Deserialize)]
struct TopicsResponse {
    topics: Vec<WireTopic>,
}

#[derive(Deserialize)]
struct WireTopic {
    name: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    messages: Vec<WireMessageId>,
}

#[derive(Deserialize)]
struct WireMessageId {
    id: u64,
}

#[derive(Deserialize)]
struct SentResponse {
    id: u64,
}

#[derive(Deserialize)]
struct Empty {}

#[derive(Deserialize)]
struct RegisterResponse {
    queue_id: String,
    last_event_id: i64,
}

#[derive(Deserialize)]
struct EventsResponse {
    events: Vec<WireEvent>,
}

#[derive(Deserialize)]
struct WireEvent {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    id: u64,
    sender_id: u64,
    sender_email: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    stream_id: Option<u64>,
    display_recipient: Value,
    #[serde(default)]
    subject: String,
    content: String,
}

impl WireMessage {
    fn into_message(self) -> Message {
        let place = match (self.kind.as_str(), self.stream_id, self.display_recipient) {
            ("stream", Some(stream_id), Value::String(stream)) => Place::Stream {
                stream_id,
                stream,
                topic: self.subject,
            },
            _ => Place::Private,
        };
        Message {
            id: self.id,
            sender_id: self.sender_id,
            sender_email: self.sender_email,
            content: self.content,
            place,
        }
    }
}

impl ZulipClient {
    pub fn new(site: &str, email: &str, api_key: &str) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            site: site.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Registers a queue for message events with raw markdown content.
    pub fn register_queue(&self) -> Result<ZulipQueue, RemoteError> {
        let response: RegisterResponse = self.call(
            Method::POST,
            "register",
            &[
                ("event_types", json!(["message"]).to_string()),
                ("apply_markdown", "false".to_string()),
            ],
        )?;
        Ok(ZulipQueue {
            queue_id: response.queue_id,
            last_event_id: response.last_event_id,
        })
    }

    /// Blocks until the server has events past `queue.last_event_id`, then
    /// advances the cursor.
    pub fn poll_events(&self, queue: &mut ZulipQueue) -> Result<Vec<ZulipEvent>, RemoteError> {
        let response: EventsResponse = self.call(
            Method::GET,
            "events",
            &[
                ("queue_id", queue.queue_id.clone()),
                ("last_event_id", queue.last_event_id.to_string()),
            ],
        )?;

        let mut out = Vec::with_capacity(response.events.len());
        for event in response.events {
            queue.last_event_id = queue.last_event_id.max(event.id);
            out.push(match (event.kind.as_str(), event.message) {
                ("message", Some(message)) => ZulipEvent::Message(message.into_message()),
                ("heartbeat", _) => ZulipEvent::Heartbeat,
                (other, _) => ZulipEvent::Other(other.to_string()),
            });
        }
        Ok(out)
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}/api/v1/{path}", self.site);
        let request = self
            .http
            .request(method.clone(), &url)
            .basic_auth(&self.email, Some(&self.api_key));
        let request = if method == Method::GET {
            request.query(params)
        } else {
            request.form(params)
        };

        let body: Value = serde_json::from_str(&request.send()?.text()?)?;
        if body.get("result").and_then(Value::as_str) != Some("success") {
            let msg = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            tracing::debug!(path, %msg, "zulip call failed");
            return Err(RemoteError::Api { msg });
        }
        Ok(serde_json::from_value(body)?)
    }
}

impl ChatPlatform for ZulipClient {
    fn resolve_channel_id(&self, name: &str) -> Result<u64, RemoteError> {
        let response: StreamIdResponse =
            self.call(Method::GET, "get_stream_id", &[("stream", name.to_string())])?;
        Ok(response.stream_id)
    }

    fn ensure_channel(
        &self,
        name: &str,
        description: &str,
        owner: u64,
    ) -> Result<u64, RemoteError> {
        let _: Empty = self.call(
            Method::POST,
            "users/me/subscriptions",
            &[
                (
                    "subscriptions",
                    json!([{ "name": name, "description": description }]).to_string(),
                ),
                ("principals", json!([owner]).to_string()),
                ("authorization_errors_fatal", "true".to_string()),
                ("announce", "true".to_string()),
            ],
        )?;
        self.resolve_channel_id(name)
    }

    fn list_channels(&self) -> Result<Vec<Channel>, RemoteError> {
        let response: StreamsResponse = self.call(Method::GET, "streams", &[])?;
        Ok(response
            .streams
            .into_iter()
            .map(|stream| Channel {
                id: stream.stream_id,
                name: stream.name,
            })
            .collect())
    }

    fn list_topics(&self, channel_id: u64) -> Result<Vec<Topic>, RemoteError> {
        let response: TopicsResponse =
            self.call(Method::GET, &format!("users/me/{channel_id}/topics"), &[])?;
        Ok(response
            .topics
            .into_iter()
            .map(|topic| Topic { name: topic.name })
            .collect())
    }

    fn find_first_message(
        &self,
        channel_id: u64,
        topic: &str,
    ) -> Result<Option<u64>, RemoteError> {
        let narrow = json!([
            { "operator": "stream", "operand": channel_id },
            { "operator": "topic", "operand": topic },
        ]);
        let response: MessagesResponse = self.call(
            Method::GET,
            "messages",
            &[
                ("anchor", "oldest".to_string()),
                ("num_before", "0".to_string()),
                ("num_after", "1".to_string()),
                ("narrow", narrow.to_string()),
                ("apply_markdown", "false".to_string()),
            ],
        )?;
        Ok(response.messages.first().map(|message| message.id))
    }

    fn rename_topic(
        &self,
        message_id: u64,
        title: &str,
        propagate: Propagate,
    ) -> Result<(), RemoteError> {
        let _: Empty = self.call(
            Method::PATCH,
            &format!("messages/{message_id}"),
            &[
                ("topic", title.to_string()),
                ("propagate_mode", propagate.as_str().to_string()),
            ],
        )?;
        Ok(())
    }

    fn move_topic(
        &self,
        message_id: u64,
        channel_id: u64,
        propagate: Propagate,
    ) -> Result<(), RemoteError> {
        let _: Empty = self.call(
            Method::PATCH,
            &format!("messages/{message_id}"),
            &[
                ("stream_id", channel_id.to_string()),
                ("propagate_mode", propagate.as_str().to_string()),
            ],
        )?;
        Ok(())
    }

    fn post_message(&self, channel: &str, topic: &str, body: &str) -> Result<u64, RemoteError> {
        let response: SentResponse = self.call(
            Method::POST,
            "messages",
            &[
                ("type", "stream".to_string()),
                ("to", channel.to_string()),
                ("topic", topic.to_string()),
                ("content", body.to_string()),
            ],
        )?;
        Ok(response.id)
    }

    fn send_private(&self, user_id: u64, body: &str) -> Result<u64, RemoteError> {
        let response: SentResponse = self.call(
            Method::POST,
            "messages",
            &[
                ("type", "private".to_string()),
                ("to", json!([user_id]).to_string()),
                ("content", body.to_string()),
            ],
        )?;
        Ok(response.id)
    }

    fn add_reaction(&self, message_id: u64, emoji: &str) -> Result<(), RemoteError> {
        let _: Empty = self.call(
            Method::POST,
            &format!("messages/{message_id}/reactions"),
            &[("emoji_name", emoji.to_string())],
        )?;
        Ok(())
    }
}
