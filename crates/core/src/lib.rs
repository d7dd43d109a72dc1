#![forbid(unsafe_code)]

pub mod codes;
pub mod model;
pub mod title;

pub use codes::{DecodeError, decode, decode_all, decode_id, encode};
pub use model::{Context, Entity, EntityKind, Project, ProjectList, Task};
pub use title::{CanonicalName, Chain, ParsedTitle, TitleStyle, canonical_name, parse_name};
