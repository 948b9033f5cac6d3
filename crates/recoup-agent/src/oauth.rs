//! Resume a chat after a third-party authorization redirect.
//!
//! When a tool sends the user off to connect an account, the callback lands
//! back on the chat with a query parameter describing the outcome. The
//! session restarts with a single user message that tells the assistant what
//! happened so it can pick up where it left off.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::warn;

use crate::message::{Message, MessageIdGen};

pub const YOUTUBE_AUTH_PARAM: &str = "youtube_auth";
pub const YOUTUBE_AUTH_ERROR_PARAM: &str = "youtube_auth_error";

const YOUTUBE_SUCCESS_TEXT: &str =
    "Great! I've successfully connected my YouTube account. Please continue with what you were helping me with.";

/// Outcome carried back through the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    YouTubeConnected,
    YouTubeFailed(String),
}

impl Continuation {
    /// Read the outcome from callback parameters. Success wins over an error
    /// when both are present; unrelated parameters and an empty error value
    /// are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        if params.get(YOUTUBE_AUTH_PARAM).map(String::as_str) == Some("success") {
            return Some(Self::YouTubeConnected);
        }
        params
            .get(YOUTUBE_AUTH_ERROR_PARAM)
            .filter(|raw| !raw.is_empty())
            .map(|raw| Self::YouTubeFailed(decode(raw).into_owned()))
    }

    /// Text of the synthesized user turn.
    pub fn text(&self) -> String {
        match self {
            Self::YouTubeConnected => YOUTUBE_SUCCESS_TEXT.to_string(),
            Self::YouTubeFailed(reason) => format!(
                "I encountered an issue while connecting my YouTube account: {reason}. \
                 Can you help me try connecting again?"
            ),
        }
    }

    pub fn into_message(self, ids: &dyn MessageIdGen) -> Message {
        Message::user(ids.next_id(), self.text())
    }
}

fn decode(raw: &str) -> Cow<'_, str> {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "undecodable oauth error parameter, using raw value");
            Cow::Borrowed(raw)
        }
    }
}
