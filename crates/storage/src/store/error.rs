#![forbid(unsafe_code)]

use gtd_core::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("unknown id")]
    UnknownId,
    #[error("{kind} name is already taken by another id: {name}")]
    DuplicateName { kind: EntityKind, name: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "STORE_ERROR",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UnknownId => "UNKNOWN_ID",
            Self::DuplicateName { .. } => "DUPLICATE_NAME",
        }
    }
}
