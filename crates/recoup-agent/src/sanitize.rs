use tracing::debug;

use crate::message::Message;

/// Stand-in body for messages whose content is empty or whitespace-only.
/// Model APIs reject empty text blocks.
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "...";

/// Replace blank message content with [`EMPTY_CONTENT_PLACEHOLDER`].
///
/// Length, order and every other field are preserved. Applying it twice
/// gives the same result as applying it once.
pub fn sanitize_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut replaced = 0usize;
    let out: Vec<Message> = messages
        .into_iter()
        .map(|mut msg| {
            if msg.content.trim().is_empty() {
                msg.content = EMPTY_CONTENT_PLACEHOLDER.to_string();
                replaced += 1;
            }
            msg
        })
        .collect();
    if replaced > 0 {
        debug!(replaced, total = out.len(), "filled blank message content");
    }
    out
}
