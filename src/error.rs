//! Shared error type for the engine. See `DESIGN.md`.
//!
//! One typed error enum for the whole crate, with a hand-written `Display`
//! rather than a derive-macro crate, carrying a structured message and
//! optional metadata per variant.

use std::collections::HashMap;
use std::fmt;

/// Crate-wide error type.
#[derive(Debug)]
pub enum EngineError {
    /// A caller supplied malformed or contradictory input.
    InvalidArgument {
        message: String,
        metadata: HashMap<String, String>,
    },
    /// A referenced entity, room, connection, or combatant does not exist.
    NotFound {
        message: String,
        metadata: HashMap<String, String>,
    },
    /// An id that must be unique was already registered.
    AlreadyExists {
        message: String,
        metadata: HashMap<String, String>,
    },
    /// A counter was consumed beyond its remaining availability.
    ResourceExhausted {
        message: String,
        metadata: HashMap<String, String>,
    },
    /// An operation was attempted outside the state it requires.
    InvalidState {
        message: String,
        metadata: HashMap<String, String>,
    },
    /// A cancellable context observed cancellation.
    Cancelled { message: String },
    /// A lower-level cause (I/O, serialization) wrapped for propagation.
    Wrapped {
        message: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl EngineError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Attach a metadata key/value to a variant that carries metadata.
    /// No-op on `Cancelled`/`Wrapped`, which carry none.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            Self::InvalidArgument { metadata, .. }
            | Self::NotFound { metadata, .. }
            | Self::AlreadyExists { metadata, .. }
            | Self::ResourceExhausted { metadata, .. }
            | Self::InvalidState { metadata, .. } => {
                metadata.insert(key.into(), value.into());
            }
            Self::Cancelled { .. } | Self::Wrapped { .. } => {}
        }
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { message, .. } => write!(f, "invalid argument: {message}"),
            Self::NotFound { message, .. } => write!(f, "not found: {message}"),
            Self::AlreadyExists { message, .. } => write!(f, "already exists: {message}"),
            Self::ResourceExhausted { message, .. } => write!(f, "resource exhausted: {message}"),
            Self::InvalidState { message, .. } => write!(f, "invalid state: {message}"),
            Self::Cancelled { message } => write!(f, "cancelled: {message}"),
            Self::Wrapped { message, source } => write!(f, "{message}: {source}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wrapped { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Wrapped {
            message: "I/O error".to_string(),
            source: Box::new(e),
        }
    }
}

impl From<ron::Error> for EngineError {
    fn from(e: ron::Error) -> Self {
        Self::Wrapped {
            message: "RON serialization error".to_string(),
            source: Box::new(e),
        }
    }
}

impl From<ron::error::SpannedError> for EngineError {
    fn from(e: ron::error::SpannedError) -> Self {
        Self::Wrapped {
            message: "RON deserialization error".to_string(),
            source: Box::new(e),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
