#![forbid(unsafe_code)]

//! Topic title micro-format.
//!
//! Topics have no platform id, so a topic-level entity carries its identity
//! in the title itself: `<text> #<code>[-<code>...]`. The suffix is always
//! last, separated from the text by whitespace, and lists one code per
//! ancestor level ending with the entity's own code.

use crate::codes::{self, SEGMENT_DELIMITER};
use crate::model::{EntityKind, Project, Task};
use regex::Regex;
use std::sync::LazyLock;

pub const SUFFIX_MARKER: char = '#';
pub const TASK_TEXT_LIMIT: usize = 45;
pub const ELLIPSIS: &str = "...";

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<text>.*?)\s+#(?P<codes>[0-9A-Z]+(?:-[0-9A-Z]+)*)$")
        .expect("title pattern must compile")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTitle<'a> {
    pub text: &'a str,
    pub codes: Vec<&'a str>,
}

impl ParsedTitle<'_> {
    pub fn decoded(&self) -> Vec<(EntityKind, u64)> {
        self.codes
            .iter()
            .filter_map(|code| codes::decode(code).ok())
            .collect()
    }

    /// Id in the segment tagged `kind`. Zero never names a stored entity.
    pub fn id_of(&self, kind: EntityKind) -> Option<u64> {
        self.decoded()
            .into_iter()
            .find(|(segment_kind, _)| *segment_kind == kind)
            .map(|(_, id)| id)
            .filter(|id| *id != 0)
    }
}

pub fn parse_name(title: &str) -> Option<ParsedTitle<'_>> {
    let captures = TITLE_PATTERN.captures(title)?;
    let text = captures.name("text")?.as_str();
    let codes = captures
        .name("codes")?
        .as_str()
        .split(SEGMENT_DELIMITER)
        .collect();
    Some(ParsedTitle { text, codes })
}

/// Ancestor-id chain of a topic-level entity, outermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chain(Vec<(EntityKind, u64)>);

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EntityKind, id: u64) -> Self {
        self.0.push((kind, id));
        self
    }

    pub fn segments(&self) -> &[(EntityKind, u64)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_project(project: &Project) -> Self {
        Self::new()
            .with(EntityKind::ProjectList, project.project_list_id)
            .with(EntityKind::Project, project.id)
    }

    /// `project` must be the row referenced by `task.project_id`.
    pub fn for_task(task: &Task, project: Option<&Project>) -> Self {
        let chain = match project {
            Some(project) => Self::for_project(project),
            None => Self::new(),
        };
        chain
            .with(EntityKind::Context, task.context_id)
            .with(EntityKind::Task, task.id)
    }

    pub fn suffix(&self) -> String {
        codes::encode_all(&self.0)
    }

    fn matches(&self, codes: &[&str]) -> bool {
        codes.len() == self.0.len()
            && codes
                .iter()
                .zip(self.0.iter())
                .all(|(code, expected)| codes::decode(code).ok().as_ref() == Some(expected))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TitleStyle {
    Project,
    Task,
}

impl TitleStyle {
    fn text_limit(self) -> Option<usize> {
        match self {
            TitleStyle::Project => None,
            TitleStyle::Task => Some(TASK_TEXT_LIMIT),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalName {
    pub name: String,
    /// The remote title must be replaced by `name`.
    pub dirty: bool,
}

pub fn canonical_name(title: &str, chain: &Chain, style: TitleStyle) -> CanonicalName {
    if let Some(parsed) = parse_name(title)
        && chain.matches(&parsed.codes)
    {
        return CanonicalName {
            name: title.to_string(),
            dirty: false,
        };
    }

    let text = strip_suffix(title).trim();
    let text = match style.text_limit() {
        Some(limit) => truncate_text(text, limit),
        None => text.to_string(),
    };

    CanonicalName {
        name: format!("{text} {SUFFIX_MARKER}{}", chain.suffix()),
        dirty: true,
    }
}

/// Title text without its embedded suffix. A trailing `#...` that holds no
/// decodable code is ordinary text and stays.
pub fn strip_suffix(title: &str) -> &str {
    match parse_name(title) {
        Some(parsed) if !parsed.decoded().is_empty() => parsed.text,
        _ => title,
    }
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out = text.chars().take(limit).collect::<String>();
    out.push_str(ELLIPSIS);
    out
}
