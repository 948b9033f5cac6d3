use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use recoup_core::config::KnowledgeConfig;
use recoup_core::{ArtistId, Lookup};
use tracing::{debug, warn};

use crate::manager::MemoryManager;
use crate::store::KnowledgeBase;
use crate::types::KnowledgeEntry;

/// Renders an artist's knowledge files into one prompt-ready text block.
///
/// Only textual types listed in the config are used. Inline content is taken
/// as-is; entries that only carry a URL are downloaded concurrently. A file
/// that cannot be downloaded is dropped without affecting the others.
pub struct KnowledgeRenderer {
    store: Arc<MemoryManager>,
    http: reqwest::Client,
    supported_types: Vec<String>,
}

impl KnowledgeRenderer {
    pub fn new(store: Arc<MemoryManager>, config: &KnowledgeConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            store,
            http,
            supported_types: config.supported_types.clone(),
        })
    }

    fn is_textual(&self, entry: &KnowledgeEntry) -> bool {
        self.supported_types.iter().any(|t| *t == entry.mime_type)
    }

    async fn entry_body(&self, entry: &KnowledgeEntry) -> Option<String> {
        if let Some(content) = entry.content.as_deref().filter(|c| !c.is_empty()) {
            return Some(content.to_string());
        }
        let url = entry.url.as_deref()?;
        match self.download(url).await {
            Ok(body) if !body.is_empty() => Some(body),
            Ok(_) => None,
            Err(e) => {
                warn!(name = %entry.name, url, error = %e, "failed to fetch knowledge file");
                None
            }
        }
    }

    async fn download(&self, url: &str) -> Result<String, reqwest::Error> {
        self.http.get(url).send().await?.error_for_status()?.text().await
    }
}

#[async_trait]
impl KnowledgeBase for KnowledgeRenderer {
    async fn fetch_knowledge_base(&self, artist_id: &ArtistId) -> Lookup<String> {
        let entries = match self.store.knowledge_entries(artist_id) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(artist_id = %artist_id, error = %e, "failed to load knowledge entries");
                return Lookup::Failed(e.to_string());
            }
        };

        let textual: Vec<&KnowledgeEntry> = entries.iter().filter(|e| self.is_textual(e)).collect();
        if textual.is_empty() {
            return Lookup::NotFound;
        }

        let bodies = join_all(textual.iter().map(|e| self.entry_body(e))).await;
        let sections: Vec<String> = textual
            .iter()
            .zip(bodies)
            .filter_map(|(entry, body)| body.map(|b| format!("--- {} ---\n{}", entry.name, b)))
            .collect();

        debug!(
            artist_id = %artist_id,
            files = sections.len(),
            skipped = entries.len() - sections.len(),
            "knowledge base rendered"
        );

        if sections.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::Found(sections.join("\n\n"))
        }
    }
}
