//! AI reranking of substitution candidates
//!
//! Sends the scored candidate list plus context signals to an LLM server
//! (Ollama, or any OpenAI-compatible API as fallback) and reorders
//! candidates by the returned preference. The reranker is advisory: any
//! failure, timeout, or malformed output leaves the deterministic order
//! untouched, and it never adds or removes candidates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::context::UserContext;
use crate::substitution::ScoredCandidate;

/// One reranked position with the model's stated reason
#[derive(Debug, Clone)]
pub struct RerankEntry {
    pub entity_id: Uuid,
    pub rationale: Option<String>,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Propose a new ordering over the given candidates
    ///
    /// Returning an empty list means "no opinion".
    async fn rerank(
        &self,
        source_name: &str,
        candidates: &[ScoredCandidate],
        context: &UserContext,
    ) -> Vec<RerankEntry>;
}

/// Reranker that never changes the order
pub struct PassthroughReranker;

#[async_trait]
impl Reranker for PassthroughReranker {
    async fn rerank(
        &self,
        _source_name: &str,
        _candidates: &[ScoredCandidate],
        _context: &UserContext,
    ) -> Vec<RerankEntry> {
        Vec::new()
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: i32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageContent,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessageContent {
    content: String,
}

/// Expected JSON output from the model
#[derive(Debug, Deserialize)]
struct RerankOutput {
    order: Vec<RerankOutputEntry>,
}

#[derive(Debug, Deserialize)]
struct RerankOutputEntry {
    id: Uuid,
    reason: Option<String>,
}

/// LLM-backed reranker using a local HTTP API
pub struct LlmReranker {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl LlmReranker {
    /// Returns None when no endpoint is configured
    pub fn from_config(endpoint: &str, model: &str, timeout: Duration) -> Option<Self> {
        if endpoint.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
        Some(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn build_prompt(
        &self,
        source_name: &str,
        candidates: &[ScoredCandidate],
        context: &UserContext,
    ) -> String {
        let listing = candidates
            .iter()
            .map(|c| {
                format!(
                    "- id={} name=\"{}\" score={:.2} equipment={} pattern={}",
                    c.entity.id,
                    c.entity.display_name,
                    c.score,
                    c.entity.primary_equipment,
                    c.entity.movement_pattern
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let injuries = if context.injuries.is_empty() {
            "none".to_string()
        } else {
            context
                .injuries
                .iter()
                .map(|i| i.body_part.clone())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            r#"You rank exercise substitutes for a lifter who cannot perform "{source_name}".
Lifter's injured areas: {injuries}.

Candidates:
{listing}

Order ALL candidate ids from best to worst for this lifter.
Output ONLY valid JSON, no explanation or markdown:
{{"order":[{{"id":"<uuid>","reason":"<short reason>"}}]}}"#
        )
    }

    async fn generate_ollama(&self, prompt: &str) -> Result<String, String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: 0.1,
                num_predict: 512,
            },
        };

        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("API returned status: {}", response.status()));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {e}"))?;
        Ok(body.response)
    }

    async fn generate_openai(&self, prompt: &str) -> Result<String, String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.1,
            max_tokens: 512,
        };

        let url = format!("{}/v1/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("API returned status: {}", response.status()));
        }

        let body: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {e}"))?;
        body.choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| "No response from API".to_string())
    }

    /// Try Ollama first, fall back to an OpenAI-compatible API
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        if let Ok(response) = self.generate_ollama(prompt).await {
            return Ok(response);
        }
        self.generate_openai(prompt).await
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(
        &self,
        source_name: &str,
        candidates: &[ScoredCandidate],
        context: &UserContext,
    ) -> Vec<RerankEntry> {
        let prompt = self.build_prompt(source_name, candidates, context);
        let raw = match self.generate(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("reranker unavailable: {}", e);
                return Vec::new();
            }
        };

        let json_str = extract_json(&raw);
        match serde_json::from_str::<RerankOutput>(&json_str) {
            Ok(output) => output
                .order
                .into_iter()
                .map(|e| RerankEntry {
                    entity_id: e.id,
                    rationale: e.reason,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("reranker output unparseable: {}, raw: {}", e, raw);
                Vec::new()
            }
        }
    }
}

/// Reorder candidates by the model's preference
///
/// Ids the model did not mention keep their deterministic relative order
/// at the tail; ids the model invented are ignored. The result always has
/// exactly the input candidates.
pub fn apply_rerank(
    candidates: Vec<ScoredCandidate>,
    order: &[RerankEntry],
) -> Vec<(ScoredCandidate, Option<String>)> {
    if order.is_empty() {
        return candidates.into_iter().map(|c| (c, None)).collect();
    }

    let mut remaining: Vec<ScoredCandidate> = candidates;
    let mut reordered = Vec::with_capacity(remaining.len());

    for entry in order {
        if let Some(pos) = remaining.iter().position(|c| c.entity.id == entry.entity_id) {
            reordered.push((remaining.remove(pos), entry.rationale.clone()));
        }
    }
    // Unmentioned candidates follow in their original order
    reordered.extend(remaining.into_iter().map(|c| (c, None)));
    reordered
}

fn extract_json(output: &str) -> String {
    let cleaned = output
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Some(start) = cleaned.find('{') {
        let mut depth = 0;
        let mut end = start;
        for (i, c) in cleaned[start..].chars().enumerate() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = start + i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        cleaned[start..end].to_string()
    } else {
        cleaned.to_string()
    }
}
