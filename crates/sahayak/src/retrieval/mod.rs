//! Retrieval seam: top-K scored snippets for a query.
//!
//! Embedding computation and similarity search are delegated entirely to
//! hosted services; this module owns only the adapter contract, the ordering
//! guarantee and the prompt-side context formatting. A failed retrieval is
//! "no context", never a failed turn.

pub mod hosted;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use hosted::HostedRetriever;

/// Default number of chunks requested per query.
pub const DEFAULT_TOP_K: usize = 5;
/// Character cap per snippet when rendering context into the prompt.
pub const SNIPPET_MAX_CHARS: usize = 200;
/// Rendered in place of a context block when retrieval is empty or failed.
pub const NO_CONTEXT_LINE: &str = "No specific context found in the knowledge base.";

/// One scored snippet. Read-only per turn; the engine never persists these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
    /// Provider-side identity of the source document, when known.
    pub source: Option<String>,
}

#[async_trait]
pub trait RetrievalAdapter: Send + Sync {
    /// Up to `k` chunks ordered by descending relevance score.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Enforce descending score order and the k cap locally, regardless of what
/// the provider returned.
pub fn rank_chunks(mut chunks: Vec<RetrievedChunk>, k: usize) -> Vec<RetrievedChunk> {
    chunks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    chunks.truncate(k);
    chunks
}

/// Render chunks as the context block injected into the user message. Each
/// snippet is truncated on a character boundary and prefixed uniformly so the
/// model can tell retrieved material from the question.
pub fn format_context(chunks: &[RetrievedChunk], snippet_max_chars: usize) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_LINE.to_string();
    }

    chunks
        .iter()
        .map(|chunk| {
            let mut snippet: String = chunk.text.chars().take(snippet_max_chars).collect();
            if chunk.text.chars().count() > snippet_max_chars {
                snippet.push_str("...");
            }
            format!("Document Context: {}", snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            score,
            source: None,
        }
    }

    #[test]
    fn test_rank_caps_at_k_with_non_increasing_scores() {
        let chunks = vec![
            chunk("c", 0.3),
            chunk("a", 0.9),
            chunk("d", 0.1),
            chunk("b", 0.7),
            chunk("e", 0.05),
            chunk("f", 0.5),
            chunk("g", 0.4),
        ];
        let ranked = rank_chunks(chunks, 5);
        assert_eq!(ranked.len(), 5);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(ranked[0].text, "a");
    }

    #[test]
    fn test_rank_with_fewer_than_k() {
        let ranked = rank_chunks(vec![chunk("only", 0.5)], 5);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_format_truncates_long_snippets() {
        let long_text = "x".repeat(500);
        let block = format_context(&[chunk(&long_text, 0.9)], SNIPPET_MAX_CHARS);
        assert!(block.starts_with("Document Context: "));
        assert!(block.ends_with("..."));
        // prefix + 200 chars + ellipsis
        assert_eq!(block.len(), "Document Context: ".len() + 200 + 3);
    }

    #[test]
    fn test_format_short_snippet_untouched() {
        let block = format_context(&[chunk("short note", 0.9)], SNIPPET_MAX_CHARS);
        assert_eq!(block, "Document Context: short note");
    }

    #[test]
    fn test_format_handles_multibyte_text() {
        // Truncation must count chars, not bytes
        let text = "é".repeat(300);
        let block = format_context(&[chunk(&text, 0.5)], SNIPPET_MAX_CHARS);
        assert!(block.ends_with("..."));
        assert_eq!(block.chars().count(), "Document Context: ".chars().count() + 200 + 3);
    }

    #[test]
    fn test_format_empty_is_the_fixed_line() {
        assert_eq!(format_context(&[], SNIPPET_MAX_CHARS), NO_CONTEXT_LINE);
    }

    #[test]
    fn test_format_joins_chunks_with_blank_lines() {
        let block = format_context(&[chunk("one", 0.9), chunk("two", 0.8)], SNIPPET_MAX_CHARS);
        assert_eq!(block, "Document Context: one\n\nDocument Context: two");
    }
}
