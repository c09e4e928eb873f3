use async_trait::async_trait;

use crate::config::GeminiConfig;
use crate::model::Roadmap;
use crate::provider::{
    ProviderError, ProviderKind, RoadmapProvider, TEMPERATURE, parse_roadmap_text, roadmap_prompt,
    roadmap_schema, send_json,
};

const KIND: ProviderKind = ProviderKind::Primary;

pub fn generate_content_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:generateContent")
}

pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    async fn try_generate(&self, topic: &str) -> Result<Roadmap, ProviderError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ProviderError::MissingCredentials {
                provider: KIND,
                var: "GEMINI_API_KEY",
            });
        };

        let endpoint = generate_content_endpoint(&self.config.base_url, &self.config.model);
        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": roadmap_prompt(topic) } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": roadmap_schema(),
                "temperature": TEMPERATURE,
            },
        });

        tracing::info!(provider = %KIND, model = %self.config.model, topic, "generate roadmap");

        let request = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body);
        let value = send_json(KIND, request).await?;

        let text = extract_candidate_text(&value)?;
        parse_roadmap_text(KIND, topic, &text)
    }
}

#[async_trait]
impl RoadmapProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn generate_roadmap(&self, topic: &str) -> Result<Roadmap, ProviderError> {
        self.try_generate(topic).await.inspect_err(|err| {
            tracing::error!(provider = %KIND, topic, error = %err, "roadmap generation failed");
        })
    }
}

fn extract_candidate_text(value: &serde_json::Value) -> Result<String, ProviderError> {
    let candidate = value
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|candidates| candidates.first());

    let Some(candidate) = candidate else {
        if let Some(reason) = value
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
        {
            return Err(ProviderError::UpstreamRejection {
                provider: KIND,
                status: 200,
                message: format!("prompt blocked: {reason}"),
            });
        }
        return Err(ProviderError::MalformedResponse {
            provider: KIND,
            message: "missing `candidates` in response".to_owned(),
        });
    };

    let mut text = String::new();
    if let Some(parts) = candidate
        .pointer("/content/parts")
        .and_then(|v| v.as_array())
    {
        for part in parts {
            if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(part_text);
            }
        }
    }

    if text.trim().is_empty() {
        let reason = candidate
            .get("finishReason")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        return Err(ProviderError::UpstreamRejection {
            provider: KIND,
            status: 200,
            message: format!("empty candidate (finish reason: {reason})"),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        assert_eq!(
            generate_content_endpoint("https://g.example/v1beta/", "gemini-2.5-pro"),
            "https://g.example/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn candidate_text_concatenates_parts() -> anyhow::Result<()> {
        let value = serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "{\"topic\":" }, { "text": "\"x\"}" } ] } }
            ]
        });
        assert_eq!(extract_candidate_text(&value)?, "{\"topic\":\"x\"}");
        Ok(())
    }

    #[test]
    fn blocked_prompt_is_an_upstream_rejection() {
        let value = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_candidate_text(&value).unwrap_err();
        assert!(matches!(err, ProviderError::UpstreamRejection { .. }));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let value = serde_json::json!({
            "candidates": [ { "content": { "parts": [] }, "finishReason": "MAX_TOKENS" } ]
        });
        let err = extract_candidate_text(&value).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
