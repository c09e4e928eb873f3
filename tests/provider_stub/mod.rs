use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const GEMINI_PATH: &str = "/v1beta/models/stub-gemini:generateContent";
pub const OPENROUTER_PATH: &str = "/api/v1/chat/completions";

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Valid roadmap for the prompted topic, with every progress flag set.
    Roadmap,
    /// Same roadmap wrapped in a markdown code fence.
    Fenced,
    /// Model text that contains no JSON object.
    Garbage,
    /// Valid roadmap with no chapters.
    EmptyChapters,
    /// Error payload with the given status.
    Reject { status: u16, message: String },
    /// Plain-text body with the given status.
    PlainStatus(u16),
    /// Status 200 whose body is an error payload.
    ErrorEnvelope(String),
    /// Status 200 envelope with no model text in it.
    MissingContent,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[allow(dead_code)]
impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct ProviderStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl ProviderStub {
    pub fn spawn(behavior: StubBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start provider stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let is_gemini = path == GEMINI_PATH;
                if request.method() != &tiny_http::Method::Post
                    || !(is_gemini || path == OPENROUTER_PATH)
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let Ok(parsed) = serde_json::from_str::<Value>(&body) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid json").with_status_code(400),
                    );
                    continue;
                };

                let headers = request
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().to_string(), h.value.as_str().to_owned()))
                    .collect();
                recorded.lock().expect("lock requests").push(RecordedRequest {
                    path: path.clone(),
                    headers,
                    body: parsed.clone(),
                });

                let prompt = if is_gemini {
                    parsed.pointer("/contents/0/parts/0/text")
                } else {
                    parsed.pointer("/messages/0/content")
                }
                .and_then(|v| v.as_str())
                .unwrap_or_default();
                let topic = prompted_topic(prompt).unwrap_or("Stub Topic");

                let (status, response_body) = match &behavior {
                    StubBehavior::Reject { status, message } => (
                        *status,
                        serde_json::json!({ "error": { "code": status, "message": message } })
                            .to_string(),
                    ),
                    StubBehavior::PlainStatus(status) => (*status, "upstream down".to_owned()),
                    StubBehavior::ErrorEnvelope(message) => (
                        200,
                        serde_json::json!({ "error": { "message": message, "code": 402 } })
                            .to_string(),
                    ),
                    StubBehavior::MissingContent => (
                        200,
                        serde_json::json!({ "id": "gen-stub", "choices": [] }).to_string(),
                    ),
                    other => {
                        let text = model_text(other, topic);
                        (200, envelope(is_gemini, &text).to_string())
                    }
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(response_body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn gemini_base_url(&self) -> String {
        format!("{}/v1beta", self.base_url)
    }

    pub fn openrouter_base_url(&self) -> String {
        format!("{}/api/v1", self.base_url)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl Drop for ProviderStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn prompted_topic(prompt: &str) -> Option<&str> {
    let begin = "topic: \"";
    let start = prompt.find(begin)? + begin.len();
    let rest = &prompt[start..];
    let end = rest.find("\".")?;
    Some(&rest[..end])
}

#[allow(dead_code)]
pub fn stub_roadmap(topic: &str) -> Value {
    serde_json::json!({
        "topic": topic,
        "chapters": [
            {
                "id": "chapter-1",
                "title": "Foundations",
                "description": "Start here.",
                "learningObjectives": ["Set up a toolchain"],
                "keyConcepts": ["syntax", "tooling"],
                "resources": [
                    {
                        "type": "documentation",
                        "title": "Official docs",
                        "url": "https://docs.example/intro",
                        "isCompleted": true,
                        "isHelpful": true
                    },
                    {
                        "type": "video",
                        "title": "Intro talk",
                        "url": "https://video.example/intro",
                        "isCompleted": true
                    }
                ],
                "exercises": [ { "description": "Write hello world", "difficulty": "Easy" } ],
                "isCompleted": true
            },
            {
                "id": "chapter-2",
                "title": "Going further",
                "description": "Deeper topics.",
                "learningObjectives": ["Ship something"],
                "keyConcepts": ["testing"],
                "resources": [
                    {
                        "type": "article",
                        "title": "Deep dive",
                        "url": "https://blog.example/deep"
                    }
                ],
                "exercises": [ { "description": "Build a CLI", "difficulty": "hard" } ]
            }
        ]
    })
}

fn model_text(behavior: &StubBehavior, topic: &str) -> String {
    match behavior {
        StubBehavior::Roadmap => stub_roadmap(topic).to_string(),
        StubBehavior::Fenced => format!(
            "Here is your roadmap:\n```json\n{}\n```",
            serde_json::to_string_pretty(&stub_roadmap(topic)).expect("serialize stub roadmap")
        ),
        StubBehavior::Garbage => "I cannot help with that.".to_owned(),
        StubBehavior::EmptyChapters => {
            serde_json::json!({ "topic": topic, "chapters": [] }).to_string()
        }
        StubBehavior::Reject { .. }
        | StubBehavior::PlainStatus(_)
        | StubBehavior::ErrorEnvelope(_)
        | StubBehavior::MissingContent => {
            unreachable!("handled before building model text")
        }
    }
}

fn envelope(is_gemini: bool, text: &str) -> Value {
    if is_gemini {
        serde_json::json!({
            "candidates": [
                {
                    "content": { "role": "model", "parts": [ { "text": text } ] },
                    "finishReason": "STOP"
                }
            ]
        })
    } else {
        serde_json::json!({
            "id": "gen-stub",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": { "role": "assistant", "content": text },
                    "finish_reason": "stop"
                }
            ]
        })
    }
}
