use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::model::{Chapter, Difficulty, Exercise, Resource, ResourceKind, Roadmap};

pub mod gemini;
pub mod openrouter;

/// Caller-facing tag that picks one of the interchangeable backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ProviderKind {
    /// Gemini `generateContent` API.
    #[default]
    #[value(alias = "gemini")]
    Primary,
    /// OpenRouter chat completions API.
    #[value(alias = "openrouter")]
    Secondary,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "Gemini",
            Self::Secondary => "OpenRouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} API key is not set ({var})")]
    MissingCredentials {
        provider: ProviderKind,
        var: &'static str,
    },

    #[error("{provider} request failed: {message}")]
    Network {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} API error ({status}): {message}")]
    UpstreamRejection {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an unreadable roadmap: {message}")]
    MalformedResponse {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} roadmap does not match the expected schema: {message}")]
    SchemaViolation {
        provider: ProviderKind,
        message: String,
    },
}

#[async_trait]
pub trait RoadmapProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Every progress flag on the returned roadmap is `false`.
    async fn generate_roadmap(&self, topic: &str) -> Result<Roadmap, ProviderError>;
}

/// Implementation table keyed by [`ProviderKind`].
#[derive(Clone)]
pub struct ProviderSet {
    primary: Arc<dyn RoadmapProvider>,
    secondary: Arc<dyn RoadmapProvider>,
}

impl ProviderSet {
    pub fn new(primary: Arc<dyn RoadmapProvider>, secondary: Arc<dyn RoadmapProvider>) -> Self {
        Self { primary, secondary }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|err| anyhow::anyhow!("build http client: {err}"))?;

        Ok(Self::new(
            Arc::new(gemini::GeminiProvider::new(
                client.clone(),
                config.gemini.clone(),
            )),
            Arc::new(openrouter::OpenRouterProvider::new(
                client,
                config.openrouter.clone(),
            )),
        ))
    }

    pub fn get(&self, kind: ProviderKind) -> Arc<dyn RoadmapProvider> {
        match kind {
            ProviderKind::Primary => Arc::clone(&self.primary),
            ProviderKind::Secondary => Arc::clone(&self.secondary),
        }
    }
}

pub const TEMPERATURE: f32 = 0.7;

pub fn roadmap_prompt(topic: &str) -> String {
    format!(
        "Generate a comprehensive, structured learning roadmap for the topic: \"{topic}\". \
The roadmap should be broken down into logical chapters, progressing from basic concepts to advanced topics. \
For each chapter, include learning objectives, key concepts, a mix of resources (videos, articles, documentation), \
and practical exercises."
    )
}

/// JSON schema both backends are asked to follow.
pub fn roadmap_schema() -> serde_json::Value {
    let string = serde_json::json!({ "type": "STRING" });
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "topic": {
                "type": "STRING",
                "description": "The main topic of the learning roadmap."
            },
            "chapters": {
                "type": "ARRAY",
                "description": "An array of chapters for the learning roadmap, ordered logically from basic to advanced.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": {
                            "type": "STRING",
                            "description": "A unique identifier for the chapter, e.g., \"chapter-1\"."
                        },
                        "title": { "type": "STRING", "description": "The title of the chapter." },
                        "description": {
                            "type": "STRING",
                            "description": "A brief summary of what the chapter covers."
                        },
                        "learningObjectives": {
                            "type": "ARRAY",
                            "description": "A list of skills or knowledge the learner will gain.",
                            "items": string
                        },
                        "keyConcepts": {
                            "type": "ARRAY",
                            "description": "A list of key concepts, terms, or technologies covered in the chapter.",
                            "items": string
                        },
                        "resources": {
                            "type": "ARRAY",
                            "description": "A list of learning resources like videos, articles, and documentation.",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "type": {
                                        "type": "STRING",
                                        "description": "The type of the resource (e.g., \"video\", \"article\", \"documentation\", \"book\", \"interactive\")."
                                    },
                                    "title": { "type": "STRING", "description": "The title of the resource." },
                                    "url": { "type": "STRING", "description": "The URL of the resource." }
                                },
                                "required": ["type", "title", "url"]
                            }
                        },
                        "exercises": {
                            "type": "ARRAY",
                            "description": "A list of practical exercises to reinforce learning.",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "description": {
                                        "type": "STRING",
                                        "description": "A description of the exercise."
                                    },
                                    "difficulty": {
                                        "type": "STRING",
                                        "description": "The difficulty of the exercise (e.g., \"easy\", \"medium\", \"hard\")."
                                    }
                                },
                                "required": ["description", "difficulty"]
                            }
                        }
                    },
                    "required": ["id", "title", "description", "learningObjectives", "keyConcepts", "resources", "exercises"]
                }
            }
        },
        "required": ["topic", "chapters"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRoadmap {
    #[serde(default)]
    topic: String,
    chapters: Vec<RawChapter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChapter {
    id: String,
    title: String,
    description: String,
    learning_objectives: Vec<String>,
    key_concepts: Vec<String>,
    resources: Vec<RawResource>,
    exercises: Vec<RawExercise>,
}

#[derive(Debug, Deserialize)]
struct RawResource {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawExercise {
    description: String,
    difficulty: String,
}

/// Turns model output text into a [`Roadmap`] with all progress flags cleared.
///
/// Markdown code fences and prose around the JSON object are tolerated. A
/// blank `topic` falls back to the requested one.
pub fn parse_roadmap_text(
    provider: ProviderKind,
    requested_topic: &str,
    text: &str,
) -> Result<Roadmap, ProviderError> {
    let malformed = |message: String| ProviderError::MalformedResponse { provider, message };
    let schema = |message: String| ProviderError::SchemaViolation { provider, message };

    let body = strip_code_fence(text);
    let json = extract_json_object(body).map_err(malformed)?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|err| malformed(format!("parse json: {err}")))?;
    let raw: RawRoadmap =
        serde_json::from_value(value).map_err(|err| schema(err.to_string()))?;

    let topic = if raw.topic.trim().is_empty() {
        requested_topic.trim().to_owned()
    } else {
        raw.topic
    };

    let mut seen_ids = HashSet::new();
    let mut chapters = Vec::with_capacity(raw.chapters.len());
    for (idx, ch) in raw.chapters.into_iter().enumerate() {
        if ch.id.trim().is_empty() {
            return Err(schema(format!("chapter {idx} has an empty id")));
        }
        if !seen_ids.insert(ch.id.clone()) {
            return Err(schema(format!("duplicate chapter id: {}", ch.id)));
        }

        let mut seen_urls = HashSet::new();
        let mut resources = Vec::with_capacity(ch.resources.len());
        for res in ch.resources {
            let kind = ResourceKind::parse(&res.kind)
                .ok_or_else(|| schema(format!("unknown resource type: {:?}", res.kind)))?;
            if !seen_urls.insert(res.url.clone()) {
                tracing::warn!(
                    %provider,
                    chapter_id = %ch.id,
                    url = %res.url,
                    "duplicate resource url in chapter; keeping first"
                );
                continue;
            }
            resources.push(Resource {
                kind,
                title: res.title,
                url: res.url,
                is_completed: false,
                is_helpful: false,
            });
        }

        let exercises = ch
            .exercises
            .into_iter()
            .map(|ex| {
                let difficulty = Difficulty::parse(&ex.difficulty)
                    .ok_or_else(|| schema(format!("unknown difficulty: {:?}", ex.difficulty)))?;
                Ok(Exercise {
                    description: ex.description,
                    difficulty,
                })
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        chapters.push(Chapter {
            id: ch.id,
            title: ch.title,
            description: ch.description,
            learning_objectives: ch.learning_objectives,
            key_concepts: ch.key_concepts,
            resources,
            exercises,
            is_completed: false,
        });
    }

    Ok(Roadmap { topic, chapters })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_json_object(text: &str) -> Result<&str, String> {
    let start = text.find('{').ok_or_else(|| "missing `{`".to_owned())?;
    let end = text.rfind('}').ok_or_else(|| "missing `}`".to_owned())?;
    if end <= start {
        return Err("invalid json object span".to_owned());
    }
    Ok(&text[start..=end])
}

/// `error.message` from a provider error payload.
pub(crate) fn error_payload_message(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error")?;
    let message = error
        .get("message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}

/// Sends a JSON request and returns the parsed JSON body of a 2xx response.
pub(crate) async fn send_json(
    provider: ProviderKind,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|err| ProviderError::Network {
            provider,
            message: err.to_string(),
        })?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .map_err(|err| ProviderError::Network {
            provider,
            message: format!("read response body: {err}"),
        })?;

    let parsed = serde_json::from_str::<serde_json::Value>(&raw);
    if !status.is_success() {
        if let Some(message) = parsed.as_ref().ok().and_then(error_payload_message) {
            return Err(ProviderError::UpstreamRejection {
                provider,
                status: status.as_u16(),
                message,
            });
        }
        return Err(ProviderError::Network {
            provider,
            message: format!("unexpected status {status}: {}", raw.trim()),
        });
    }

    let value = parsed.map_err(|err| ProviderError::MalformedResponse {
        provider,
        message: format!("parse response envelope: {err}"),
    })?;
    if let Some(message) = error_payload_message(&value) {
        return Err(ProviderError::UpstreamRejection {
            provider,
            status: status.as_u16(),
            message,
        });
    }
    Ok(value)
}
