use async_trait::async_trait;

use crate::config::OpenRouterConfig;
use crate::model::Roadmap;
use crate::provider::{
    ProviderError, ProviderKind, RoadmapProvider, TEMPERATURE, parse_roadmap_text, roadmap_prompt,
    roadmap_schema, send_json,
};

const KIND: ProviderKind = ProviderKind::Secondary;
const APP_TITLE: &str = "AI Learning Roadmap Builder";

pub fn chat_completions_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/chat/completions")
}

pub struct OpenRouterProvider {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    pub fn new(client: reqwest::Client, config: OpenRouterConfig) -> Self {
        Self { client, config }
    }

    async fn try_generate(&self, topic: &str) -> Result<Roadmap, ProviderError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ProviderError::MissingCredentials {
                provider: KIND,
                var: "OPENROUTER_API_KEY",
            });
        };

        let schema = serde_json::to_string_pretty(&roadmap_schema()).map_err(|err| {
            ProviderError::SchemaViolation {
                provider: KIND,
                message: format!("serialize schema: {err}"),
            }
        })?;
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [ { "role": "user", "content": chat_prompt(topic, &schema) } ],
            "response_format": { "type": "json_object" },
            "temperature": TEMPERATURE,
        });

        tracing::info!(provider = %KIND, model = %self.config.model, topic, "generate roadmap");

        let mut request = self
            .client
            .post(chat_completions_endpoint(&self.config.base_url))
            .bearer_auth(api_key)
            .header("X-Title", APP_TITLE)
            .json(&body);
        if let Some(referer) = self.config.referer.as_deref() {
            request = request.header("HTTP-Referer", referer);
        }
        let value = send_json(KIND, request).await?;

        let text = value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: KIND,
                message: "missing `choices[0].message.content` in response".to_owned(),
            })?;
        parse_roadmap_text(KIND, topic, text)
    }
}

#[async_trait]
impl RoadmapProvider for OpenRouterProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn generate_roadmap(&self, topic: &str) -> Result<Roadmap, ProviderError> {
        self.try_generate(topic).await.inspect_err(|err| {
            tracing::error!(provider = %KIND, topic, error = %err, "roadmap generation failed");
        })
    }
}

/// Chat models get the schema inline since there is no structured-output field.
fn chat_prompt(topic: &str, schema: &str) -> String {
    format!(
        "{base} Your response MUST be a single, valid JSON object that strictly adheres to the following schema. \
Do not include any text, markdown, or explanations outside of the JSON object itself.\n\
\n\
JSON Schema:\n\
{schema}",
        base = roadmap_prompt(topic),
    )
}
