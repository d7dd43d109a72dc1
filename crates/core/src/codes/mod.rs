#![forbid(unsafe_code)]

//! Public codes for cached entities.
//!
//! A code is the kind tag followed by the canonical decimal id: `T501` is
//! task 501. Codes only use `[0-9A-Z]`, so they can be embedded in topic
//! titles without escaping. Several codes joined with [`SEGMENT_DELIMITER`]
//! form a multi-code (`L7-P3-C9-T501`).

use crate::model::EntityKind;

pub const SEGMENT_DELIMITER: char = '-';

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("code is empty")]
    Empty,
    #[error("unknown kind tag '{0}'")]
    UnknownKind(char),
    #[error("code has no digits")]
    MissingDigits,
    #[error("code contains invalid character '{ch}' at {index}")]
    InvalidChar { ch: char, index: usize },
    #[error("code has a leading zero")]
    NonCanonical,
    #[error("code overflows a 64-bit id")]
    Overflow,
}

pub fn encode(kind: EntityKind, id: u64) -> String {
    format!("{}{id}", kind.tag())
}

pub fn decode(code: &str) -> Result<(EntityKind, u64), DecodeError> {
    let mut chars = code.chars();
    let Some(tag) = chars.next() else {
        return Err(DecodeError::Empty);
    };
    let kind = EntityKind::from_tag(tag).ok_or(DecodeError::UnknownKind(tag))?;

    let digits = chars.as_str();
    if digits.is_empty() {
        return Err(DecodeError::MissingDigits);
    }
    for (offset, ch) in digits.chars().enumerate() {
        if !ch.is_ascii_digit() {
            return Err(DecodeError::InvalidChar {
                ch,
                index: offset + 1,
            });
        }
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(DecodeError::NonCanonical);
    }

    let id = digits.parse::<u64>().map_err(|_| DecodeError::Overflow)?;
    Ok((kind, id))
}

pub fn decode_id(code: &str) -> Option<u64> {
    decode(code).ok().map(|(_, id)| id)
}

/// Decodes every segment of a multi-code, skipping segments that do not decode.
pub fn decode_all(multikey: &str) -> Vec<(EntityKind, u64)> {
    multikey
        .split(SEGMENT_DELIMITER)
        .filter_map(|segment| decode(segment).ok())
        .collect()
}

pub fn encode_all(segments: &[(EntityKind, u64)]) -> String {
    let mut out = String::new();
    for (index, (kind, id)) in segments.iter().enumerate() {
        if index > 0 {
            out.push(SEGMENT_DELIMITER);
        }
        out.push_str(&encode(*kind, *id));
    }
    out
}
