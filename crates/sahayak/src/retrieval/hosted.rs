//! Hosted retrieval: Gemini embeddings + a Pinecone-style vector index.
//!
//! Two REST calls per query: embed the text, then post the vector to the
//! index host's `/query` endpoint with metadata included. Both services are
//! black boxes here; the adapter owns nothing but the wire glue.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{rank_chunks, RetrievalAdapter, RetrievedChunk};
use crate::error::AgentError;

/// Default embedding model, matched to how the index was populated.
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
/// Default embedding dimensionality, matched to the index schema.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;

pub struct HostedRetriever {
    client: Client,
    embed_api_key: String,
    index_api_key: String,
    index_host: String,
    embedding_model: String,
    embedding_dimension: usize,
}

impl HostedRetriever {
    /// Build an adapter. Fails fast with `MissingCredential` when either key
    /// or the index host is absent.
    pub fn new(
        embed_api_key: String,
        index_api_key: String,
        index_host: String,
    ) -> Result<Self> {
        if embed_api_key.trim().is_empty() {
            return Err(AgentError::MissingCredential(
                "embedding API key is empty. Export GOOGLE_API_KEY or add it to .env".to_string(),
            )
            .into());
        }
        if index_api_key.trim().is_empty() {
            return Err(AgentError::MissingCredential(
                "vector index API key is empty. Export PINECONE_API_KEY or add it to .env"
                    .to_string(),
            )
            .into());
        }
        if index_host.trim().is_empty() {
            return Err(AgentError::MissingCredential(
                "vector index host is empty. Export PINECONE_INDEX_HOST or add it to .env"
                    .to_string(),
            )
            .into());
        }

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            embed_api_key,
            index_api_key,
            index_host,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        })
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimension = dimension;
        self
    }

    fn query_url(&self) -> String {
        let host = self.index_host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/query", host)
        } else {
            format!("https://{}/query", host)
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:embedContent",
            self.embedding_model
        );
        let request = embed_request_body(&self.embedding_model, self.embedding_dimension, text);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.embed_api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Embedding request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await?;
            return Err(anyhow!("Embedding API error ({}): {}", status, error));
        }

        let body: Value = response.json().await?;
        let values = body["embedding"]["values"]
            .as_array()
            .ok_or_else(|| anyhow!("Embedding response missing 'embedding.values'"))?;
        if values.is_empty() {
            return Err(anyhow!("Embedding API returned an empty vector"));
        }

        Ok(values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect())
    }
}

/// Request body for the Gemini embedContent endpoint.
fn embed_request_body(model: &str, dimension: usize, text: &str) -> Value {
    json!({
        "model": format!("models/{}", model),
        "content": { "parts": [{ "text": text }] },
        "outputDimensionality": dimension,
    })
}

/// Request body for a Pinecone-style `/query` call.
fn query_request_body(embedding: &[f32], k: usize) -> Value {
    json!({
        "vector": embedding,
        "topK": k,
        "includeMetadata": true,
    })
}

/// Map index matches to chunks. Matches without `metadata.text` are skipped;
/// the match id becomes the chunk source.
fn parse_query_matches(body: &Value) -> Vec<RetrievedChunk> {
    body["matches"]
        .as_array()
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| {
                    let text = m["metadata"]["text"].as_str()?.to_string();
                    Some(RetrievedChunk {
                        text,
                        score: m["score"].as_f64().unwrap_or(0.0) as f32,
                        source: m["id"].as_str().map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RetrievalAdapter for HostedRetriever {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let embedding = self.embed(text).await?;
        tracing::debug!(
            dimension = embedding.len(),
            top_k = k,
            "Querying vector index"
        );

        let response = self
            .client
            .post(self.query_url())
            .header("Api-Key", &self.index_api_key)
            .json(&query_request_body(&embedding, k))
            .send()
            .await
            .map_err(|e| anyhow!("Vector index request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await?;
            return Err(anyhow!("Vector index error ({}): {}", status, error));
        }

        let body: Value = response.json().await?;
        let chunks = parse_query_matches(&body);
        tracing::debug!(matches = chunks.len(), "Vector index responded");
        Ok(rank_chunks(chunks, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = HostedRetriever::new("".into(), "pk".into(), "host".into())
            .err()
            .unwrap();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let err = HostedRetriever::new("gk".into(), "".into(), "host".into())
            .err()
            .unwrap();
        assert!(err.to_string().contains("PINECONE_API_KEY"));

        let err = HostedRetriever::new("gk".into(), "pk".into(), "  ".into())
            .err()
            .unwrap();
        assert!(err.to_string().contains("PINECONE_INDEX_HOST"));
    }

    #[test]
    fn test_query_url_accepts_bare_and_schemed_hosts() {
        let bare = HostedRetriever::new("gk".into(), "pk".into(), "my-index.svc.pinecone.io".into())
            .unwrap();
        assert_eq!(bare.query_url(), "https://my-index.svc.pinecone.io/query");

        let schemed = HostedRetriever::new(
            "gk".into(),
            "pk".into(),
            "https://my-index.svc.pinecone.io/".into(),
        )
        .unwrap();
        assert_eq!(schemed.query_url(), "https://my-index.svc.pinecone.io/query");
    }

    #[test]
    fn test_embed_request_shape() {
        let body = embed_request_body(DEFAULT_EMBEDDING_MODEL, 1024, "what is rust");
        assert_eq!(body["model"], "models/gemini-embedding-001");
        assert_eq!(body["content"]["parts"][0]["text"], "what is rust");
        assert_eq!(body["outputDimensionality"], 1024);
    }

    #[test]
    fn test_query_request_shape() {
        let body = query_request_body(&[0.1, 0.2], 5);
        assert_eq!(body["topK"], 5);
        assert_eq!(body["includeMetadata"], true);
        assert_eq!(body["vector"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_matches_maps_metadata_and_skips_textless() {
        let body = json!({
            "matches": [
                { "id": "doc-0", "score": 0.92, "metadata": { "text": "Rust is a language" } },
                { "id": "doc-1", "score": 0.85, "metadata": {} },
                { "id": "doc-2", "score": 0.63, "metadata": { "text": "Ownership and borrowing" } },
            ]
        });
        let chunks = parse_query_matches(&body);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source.as_deref(), Some("doc-0"));
        assert!((chunks[0].score - 0.92).abs() < 1e-6);
        assert_eq!(chunks[1].text, "Ownership and borrowing");
    }

    #[test]
    fn test_parse_matches_tolerates_absent_array() {
        assert!(parse_query_matches(&json!({})).is_empty());
    }
}
