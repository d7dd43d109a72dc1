#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod embed;
pub mod entry;
pub mod error;
pub mod logging;
pub mod platform;
pub mod resolve;

pub use commands::{Message, Place, handle_message};
pub use error::{GtdError, RemoteError};
pub use platform::{Channel, ChatPlatform, Propagate, Topic};
pub use resolve::{Attributes, ChannelQuery, ProjectQuery, Resolver, TaskQuery};
