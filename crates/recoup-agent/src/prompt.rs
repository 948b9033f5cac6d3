use std::sync::Arc;

use recoup_core::{ArtistId, RoomId};
use recoup_memory::{KnowledgeBase, RoomDirectory};
use tracing::{debug, info, instrument, warn};

pub const KNOWLEDGE_BASE_START: &str = "-----CURRENT ARTIST KNOWLEDGE BASE-----";
pub const KNOWLEDGE_BASE_END: &str = "-----END ARTIST KNOWLEDGE BASE-----";

/// Knowledge block size cap in bytes (UTF-8) before head/tail truncation.
/// Cut points are moved onto char boundaries.
const MAX_KNOWLEDGE_BYTES: usize = 100_000;

// ---------------------------------------------------------------------------
// BasePrompt
// ---------------------------------------------------------------------------

/// The fixed instruction every session prompt starts with.
///
/// Loaded once at startup and shared; cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePrompt(Arc<str>);

impl BasePrompt {
    /// Read the prompt from `path`, falling back to the built-in instruction
    /// when no path is configured or the file can't be read or is empty.
    pub fn load(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => {
                info!(path, chars = text.len(), "loaded base prompt");
                Self::from_text(text)
            }
            Ok(_) => {
                warn!(path, "base prompt file is empty, using built-in prompt");
                Self::default()
            }
            Err(e) => {
                warn!(path, error = %e, "failed to load base prompt, using built-in prompt");
                Self::default()
            }
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self(Arc::from(text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BasePrompt {
    fn default() -> Self {
        Self::from_text(DEFAULT_INSTRUCTION)
    }
}

// ---------------------------------------------------------------------------
// SystemPromptResolver
// ---------------------------------------------------------------------------

/// Builds the system prompt for a session from the base prompt and, when the
/// room belongs to an artist with a knowledge base, that knowledge.
///
/// Never fails: any lookup that doesn't produce knowledge leaves the base
/// prompt as the result.
pub struct SystemPromptResolver {
    base: BasePrompt,
    rooms: Arc<dyn RoomDirectory>,
    knowledge: Arc<dyn KnowledgeBase>,
}

impl SystemPromptResolver {
    pub fn new(
        base: BasePrompt,
        rooms: Arc<dyn RoomDirectory>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            base,
            rooms,
            knowledge,
        }
    }

    pub fn base(&self) -> &BasePrompt {
        &self.base
    }

    /// Without a room the base prompt is returned as-is, even if an artist
    /// is given. A supplied artist id wins over the room's own artist.
    #[instrument(skip(self), fields(room_id = ?room_id, artist_id = ?artist_id))]
    pub async fn resolve(&self, room_id: Option<&RoomId>, artist_id: Option<&ArtistId>) -> String {
        let Some(room_id) = room_id else {
            return self.base.as_str().to_string();
        };

        let artist_id = match artist_id {
            Some(a) => Some(a.clone()),
            None => self
                .rooms
                .resolve_artist_id(room_id)
                .await
                .found("artist_for_room"),
        };
        let Some(artist_id) = artist_id else {
            debug!("no artist for room, using base prompt");
            return self.base.as_str().to_string();
        };

        let knowledge = self
            .knowledge
            .fetch_knowledge_base(&artist_id)
            .await
            .found("knowledge_base")
            .filter(|k| !k.trim().is_empty());
        match knowledge {
            Some(k) => with_knowledge(self.base.as_str(), &k, &artist_id),
            None => {
                debug!(artist_id = %artist_id, "no knowledge base, using base prompt");
                self.base.as_str().to_string()
            }
        }
    }
}

fn with_knowledge(base: &str, knowledge: &str, artist_id: &ArtistId) -> String {
    let knowledge = truncate_content(knowledge, MAX_KNOWLEDGE_BYTES);
    format!(
        "{base}\n\n{KNOWLEDGE_BASE_START}\n{knowledge}\n{KNOWLEDGE_BASE_END}\n\n\
         The active artist_account_id is {artist_id}"
    )
}

/// Truncate content to `max_chars` using 70% head / 20% tail / 10% marker.
pub(crate) fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        return content.to_string();
    }

    let head_chars = floor_boundary(content, max_chars * 70 / 100);
    let tail_chars = max_chars * 20 / 100;
    let marker = "\n\n[... content truncated ...]\n\n";

    // Break on line ends where possible
    let head_end = content[..head_chars]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(head_chars);
    let tail_from = ceil_boundary(content, content.len() - tail_chars);
    let tail_start = content[tail_from..]
        .find('\n')
        .map(|i| tail_from + i + 1)
        .unwrap_or(tail_from);

    let mut out = String::with_capacity(head_end + marker.len() + (content.len() - tail_start));
    out.push_str(&content[..head_end]);
    out.push_str(marker);
    out.push_str(&content[tail_start..]);
    out
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

const DEFAULT_INSTRUCTION: &str = "You are an AI agent specializing in music marketing rollouts. \
You are designed to help record label executives quickly uncover actionable insights and unique \
opportunities from their artist's fan data and campaign data.

Response Format:
1. Always start with a brief, welcoming introduction sentence
2. Structure your response with numbered sections and clear headers
3. Under each section, use bullet points with bold lead-ins followed by explanations
4. Add a line break between major sections

Guidelines for Different Response Types:
1. For Metrics and Data:
   • Lead with the specific number/metric in bold
   • Follow with context and implications
   • Group related metrics under clear headers

2. For Strategies and Recommendations:
   • Use clear section headers
   • Each bullet point should start with a bold action item
   • Include specific, actionable details

3. For Analysis and Insights:
   • Group insights by theme
   • Bold key findings
   • Support with relevant data

Always:
• Keep responses concise and focused
• Use data to support recommendations
• Maintain consistent formatting
• Be direct and actionable
• Skip greetings/closings

Your goal is to provide clear, structured insights that are immediately useful for music marketing decisions.";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recoup_core::Lookup;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Rooms(Lookup<ArtistId>);

    #[async_trait]
    impl RoomDirectory for Rooms {
        async fn resolve_artist_id(&self, _room_id: &RoomId) -> Lookup<ArtistId> {
            self.0.clone()
        }
    }

    /// Returns a fixed lookup and counts how often it was asked.
    struct Knowledge {
        answer: Lookup<String>,
        calls: AtomicUsize,
    }

    impl Knowledge {
        fn new(answer: Lookup<String>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl KnowledgeBase for Knowledge {
        async fn fetch_knowledge_base(&self, _artist_id: &ArtistId) -> Lookup<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn resolver(rooms: Lookup<ArtistId>, knowledge: Arc<Knowledge>) -> SystemPromptResolver {
        SystemPromptResolver::new(
            BasePrompt::from_text("BASE"),
            Arc::new(Rooms(rooms)),
            knowledge,
        )
    }

    #[tokio::test]
    async fn no_room_returns_base_unchanged() {
        let kb = Knowledge::new(Lookup::Found("K".into()));
        let r = resolver(Lookup::Found(ArtistId::from("a1")), kb.clone());

        assert_eq!(r.resolve(None, None).await, "BASE");
        assert_eq!(r.resolve(None, Some(&ArtistId::from("a1"))).await, "BASE");
        assert_eq!(kb.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn room_artist_knowledge_is_appended() {
        let r = resolver(
            Lookup::Found(ArtistId::from("a1")),
            Knowledge::new(Lookup::Found("K".into())),
        );
        let prompt = r.resolve(Some(&RoomId::from("r1")), None).await;

        assert_eq!(
            prompt,
            "BASE\n\n-----CURRENT ARTIST KNOWLEDGE BASE-----\nK\n\
             -----END ARTIST KNOWLEDGE BASE-----\n\nThe active artist_account_id is a1"
        );
    }

    #[tokio::test]
    async fn supplied_artist_skips_room_lookup() {
        let r = resolver(
            Lookup::Failed("should not be asked".into()),
            Knowledge::new(Lookup::Found("K".into())),
        );
        let prompt = r
            .resolve(Some(&RoomId::from("r1")), Some(&ArtistId::from("a9")))
            .await;
        assert!(prompt.ends_with("The active artist_account_id is a9"));
    }

    #[tokio::test]
    async fn knowledge_failure_degrades_to_base() {
        let r = resolver(
            Lookup::Found(ArtistId::from("a1")),
            Knowledge::new(Lookup::Failed("timeout".into())),
        );
        assert_eq!(r.resolve(Some(&RoomId::from("r1")), None).await, "BASE");
    }

    #[tokio::test]
    async fn blank_knowledge_degrades_to_base() {
        let r = resolver(
            Lookup::Found(ArtistId::from("a1")),
            Knowledge::new(Lookup::Found("  \n".into())),
        );
        assert_eq!(r.resolve(Some(&RoomId::from("r1")), None).await, "BASE");
    }

    #[tokio::test]
    async fn unresolvable_artist_returns_base() {
        let kb = Knowledge::new(Lookup::Found("K".into()));
        let r = resolver(Lookup::NotFound, kb.clone());
        assert_eq!(r.resolve(Some(&RoomId::from("r1")), None).await, "BASE");

        let r = resolver(Lookup::Failed("db down".into()), kb.clone());
        assert_eq!(r.resolve(Some(&RoomId::from("r1")), None).await, "BASE");
        assert_eq!(kb.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn base_prompt_loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("base.md");
        fs::write(&path, "custom instruction").expect("write");

        let base = BasePrompt::load(path.to_str());
        assert_eq!(base.as_str(), "custom instruction");
    }

    #[test]
    fn base_prompt_falls_back_to_default() {
        assert!(BasePrompt::load(None).as_str().contains("music marketing"));
        assert!(BasePrompt::load(Some("/nonexistent/base.md"))
            .as_str()
            .contains("music marketing"));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.md");
        fs::write(&path, "  \n").expect("write");
        assert_eq!(BasePrompt::load(path.to_str()), BasePrompt::default());
    }

    #[test]
    fn truncate_preserves_small_content() {
        let content = "Hello, world!\nSecond line.";
        assert_eq!(truncate_content(content, 1000), content);
    }

    #[test]
    fn truncate_applies_head_tail_split() {
        let content = (0..200).map(|i| format!("Line {i}\n")).collect::<String>();
        let result = truncate_content(&content, 200);

        assert!(result.contains("[... content truncated ...]"));
        assert!(result.starts_with("Line 0\n"));
        assert!(result.ends_with("Line 199\n"));
        assert!(result.len() < content.len());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let content = "é".repeat(500);
        let result = truncate_content(&content, 111);
        assert!(result.contains("[... content truncated ...]"));
    }
}
