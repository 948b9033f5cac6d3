use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Identifier of a chat room (one conversation thread).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an artist account. Rooms may be tied to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtistId(pub String);

impl ArtistId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ArtistId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ArtistId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outcome of a read against an external collaborator.
///
/// Keeps "nothing there" and "could not ask" apart at the type level even
/// though current callers collapse both into absence via [`Lookup::found`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }

    /// Collapse into an `Option`, treating a failed lookup exactly like a
    /// missing value. The failure is logged under `what` before it is dropped.
    ///
    /// Callers cannot tell a storage outage from a genuinely empty result
    /// after this point.
    pub fn found(self, what: &str) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
            Lookup::Failed(reason) => {
                warn!(lookup = what, %reason, "lookup failed, treating as not found");
                None
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Failed(reason) => Lookup::Failed(reason),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

impl<T, E: fmt::Display> From<std::result::Result<Option<T>, E>> for Lookup<T> {
    fn from(res: std::result::Result<Option<T>, E>) -> Self {
        match res {
            Ok(opt) => opt.into(),
            Err(e) => Lookup::Failed(e.to_string()),
        }
    }
}
