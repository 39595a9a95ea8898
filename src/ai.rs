use crate::model::{Grade, Lesson, MappingDetail, MappingType};
use crate::registry::{self, Competency};
use crate::setup::AiSetup;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI engine is not configured; set setup.ai.apiKey or EDUPLAN_AI_API_KEY")]
    NotConfigured,
    #[error("AI request failed with HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("AI transport error: {0}")]
    Transport(String),
    #[error("AI response was not understood: {0}")]
    BadResponse(String),
}

impl AiError {
    /// Rate-limit and quota failures, the only ones worth retrying.
    pub fn is_quota(&self) -> bool {
        match self {
            AiError::Http { status: 429, .. } => true,
            AiError::Http { body, .. } => body.contains("RESOURCE_EXHAUSTED") || body.contains("429"),
            AiError::Transport(msg) => msg.contains("429"),
            AiError::NotConfigured | AiError::BadResponse(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub retryable: fn(&AiError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            multiplier: 2,
            retryable: AiError::is_quota,
        }
    }
}

impl RetryPolicy {
    pub fn from_setup(setup: &AiSetup) -> Self {
        RetryPolicy {
            max_retries: setup.max_retries,
            base_delay: Duration::from_millis(setup.base_delay_ms),
            multiplier: setup.multiplier.max(1),
            ..RetryPolicy::default()
        }
    }

    /// Runs `op`, sleeping and retrying while the error is retryable and
    /// attempts remain. The delay grows by `multiplier` after each retry.
    pub fn run<T>(
        &self,
        sleep: &dyn Fn(Duration),
        mut op: impl FnMut() -> Result<T, AiError>,
    ) -> Result<T, AiError> {
        let mut delay = self.base_delay;
        let mut retries_left = self.max_retries;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if retries_left > 0 && (self.retryable)(&e) => {
                    warn!(retries_left, delay_ms = delay.as_millis() as u64, "AI quota error, retrying: {e}");
                    sleep(delay);
                    delay = delay.saturating_mul(self.multiplier);
                    retries_left -= 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub lesson_title: String,
    pub subject: String,
    pub grade: Grade,
    pub requirements: Vec<String>,
    pub competencies: Vec<Competency>,
}

impl SuggestionRequest {
    pub fn for_lesson(lesson: &Lesson, subject: &str, grade: Grade) -> Self {
        SuggestionRequest {
            lesson_title: lesson.title.clone(),
            subject: subject.to_string(),
            grade,
            requirements: lesson.yccd.iter().filter(|y| !y.trim().is_empty()).cloned().collect(),
            competencies: registry::for_grade(grade).to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    #[serde(flatten)]
    pub context: SuggestionRequest,
    pub code: String,
    pub current_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub code: String,
    pub reason: String,
}

pub trait SuggestionEngine {
    fn suggest(&self, req: &SuggestionRequest) -> Result<Vec<Suggestion>, AiError>;
    fn rewrite_reason(&self, req: &RewriteRequest) -> Result<String, AiError>;
}

/// Engine used when no API key is available.
pub struct NullEngine;

impl SuggestionEngine for NullEngine {
    fn suggest(&self, _req: &SuggestionRequest) -> Result<Vec<Suggestion>, AiError> {
        Err(AiError::NotConfigured)
    }

    fn rewrite_reason(&self, _req: &RewriteRequest) -> Result<String, AiError> {
        Err(AiError::NotConfigured)
    }
}

pub struct GeminiEngine {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiEngine {
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Self {
        GeminiEngine {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn generate(&self, prompt: String, schema: Value) -> Result<Value, AiError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });
        debug!(model = %self.model, "calling generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiError::Http {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        let envelope: Value = response
            .json()
            .map_err(|e| AiError::BadResponse(format!("invalid JSON envelope: {e}")))?;
        let text = envelope
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| AiError::BadResponse("no candidate text".to_string()))?;
        serde_json::from_str(text).map_err(|e| AiError::BadResponse(format!("candidate is not JSON: {e}")))
    }
}

fn context_json(req: &SuggestionRequest) -> String {
    serde_json::to_string_pretty(req).unwrap_or_default()
}

impl SuggestionEngine for GeminiEngine {
    fn suggest(&self, req: &SuggestionRequest) -> Result<Vec<Suggestion>, AiError> {
        let prompt = format!(
            "Bạn là chuyên gia giáo dục. Dựa vào bài học dưới đây, chọn các năng lực số \
             (chỉ dùng mã trong danh sách competencies) phù hợp để tích hợp và nêu minh chứng \
             ngắn gọn cho từng mã.\n{}",
            context_json(req)
        );
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "code": { "type": "STRING" },
                    "reason": { "type": "STRING" }
                },
                "required": ["code", "reason"]
            }
        });
        let value = self.generate(prompt, schema)?;
        serde_json::from_value(value).map_err(|e| AiError::BadResponse(e.to_string()))
    }

    fn rewrite_reason(&self, req: &RewriteRequest) -> Result<String, AiError> {
        let prompt = format!(
            "Viết lại minh chứng tích hợp năng lực số {} cho bài học dưới đây, cụ thể và \
             ngắn gọn.\nMinh chứng hiện tại: {}\n{}",
            req.code,
            req.current_reason,
            context_json(&req.context)
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": { "reason": { "type": "STRING" } },
            "required": ["reason"]
        });
        let value = self.generate(prompt, schema)?;
        value
            .get("reason")
            .and_then(|r| r.as_str())
            .map(|r| r.trim().to_string())
            .ok_or_else(|| AiError::BadResponse("missing reason".to_string()))
    }
}

pub fn engine_from_setup(setup: &AiSetup) -> Box<dyn SuggestionEngine> {
    match setup.api_key.as_deref() {
        Some(key) => Box::new(GeminiEngine::new(&setup.endpoint, &setup.model, key)),
        None => Box::new(NullEngine),
    }
}

/// An engine wrapped in its retry policy.
pub struct AiAdapter<'a> {
    engine: &'a dyn SuggestionEngine,
    policy: RetryPolicy,
    sleep: &'a dyn Fn(Duration),
}

impl<'a> AiAdapter<'a> {
    pub fn new(engine: &'a dyn SuggestionEngine, policy: RetryPolicy, sleep: &'a dyn Fn(Duration)) -> Self {
        AiAdapter { engine, policy, sleep }
    }

    pub fn suggest(&self, req: &SuggestionRequest) -> Result<Vec<Suggestion>, AiError> {
        self.policy.run(self.sleep, || self.engine.suggest(req))
    }

    pub fn rewrite_reason(&self, req: &RewriteRequest) -> Result<String, AiError> {
        self.policy.run(self.sleep, || self.engine.rewrite_reason(req))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedSuggestions {
    pub accepted: Vec<String>,
    pub discarded: Vec<String>,
}

/// Merges suggestions into a copy of `lesson`. Codes outside the grade's
/// registry are discarded; manual mappings are never overwritten.
pub fn apply_suggestions(lesson: &Lesson, grade: Grade, suggestions: &[Suggestion]) -> (Lesson, AppliedSuggestions) {
    let mut next = lesson.clone();
    let mut applied = AppliedSuggestions::default();
    for s in suggestions {
        let code = s.code.trim();
        if registry::lookup(grade, code).is_none() {
            applied.discarded.push(code.to_string());
            continue;
        }
        let is_manual = next
            .mappings
            .get(code)
            .map(|m| m.kind == Some(MappingType::Manual))
            .unwrap_or(false);
        if is_manual {
            continue;
        }
        next.mappings
            .insert(code.to_string(), MappingDetail::suggested(s.reason.trim()));
        applied.accepted.push(code.to_string());
    }
    (next, applied)
}
