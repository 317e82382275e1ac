use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Payload for `POST {base}/recommend`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendRequest {
    pub query: String,
}

/// Successful `/recommend` payload as the backend documents it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecommendResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Response body as captured by the transport.
///
/// JSON bodies that fail to parse are stored as an empty object, never as null.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn empty() -> Self {
        ResponseBody::Json(Value::Object(Map::new()))
    }

    /// Look up a top-level field; only meaningful for JSON object bodies.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            ResponseBody::Json(Value::Object(map)) => map.get(key),
            _ => None,
        }
    }

    /// Top-level field rendered as text. Null, empty strings and `false` read as absent.
    pub fn field_text(&self, key: &str) -> Option<String> {
        match self.field(key)? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn field_flag(&self, key: &str) -> bool {
        self.field(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Human-readable dump used when a health probe fails.
    pub fn pretty(&self) -> String {
        match self {
            ResponseBody::Json(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
            ResponseBody::Text(t) => t.clone(),
        }
    }
}

/// Uniform result of one backend call. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    pub ok: bool,
    pub status: Option<u16>,
    pub body: ResponseBody,
    pub latency: Duration,
    pub error: Option<String>,
}

impl RequestResult {
    pub fn from_response(status: u16, body: ResponseBody, latency: Duration) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status: Some(status),
            body,
            latency,
            error: None,
        }
    }

    pub fn transport_failure(message: impl Into<String>, latency: Duration) -> Self {
        Self {
            ok: false,
            status: None,
            body: ResponseBody::empty(),
            latency,
            error: Some(message.into()),
        }
    }

    /// The request never produced an HTTP response.
    pub fn is_transport_failure(&self) -> bool {
        self.status.is_none() && self.error.is_some()
    }

    /// Answer text from a `/recommend` body; absent or null becomes empty.
    pub fn answer_text(&self) -> String {
        self.body.field_text("response").unwrap_or_default()
    }

    /// Source citations from a `/recommend` body.
    ///
    /// Anything other than an array yields an empty list. Non-string entries are
    /// rendered with their JSON text.
    pub fn sources(&self) -> Vec<String> {
        match self.body.field("sources") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Diagnostic detail for a failed call: `detail`, then `error`, then a raw text body.
    pub fn detail(&self) -> Option<String> {
        match &self.body {
            ResponseBody::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(truncate(trimmed, MAX_TEXT_DETAIL))
                }
            }
            body => body.field_text("detail").or_else(|| body.field_text("error")),
        }
    }
}

const MAX_TEXT_DETAIL: usize = 500;

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Typed view of the `/health` body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HealthReport {
    pub status: Option<String>,
    pub has_vector_store: bool,
    pub has_model: bool,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn from_body(body: &ResponseBody) -> Self {
        Self {
            status: body.field_text("status"),
            has_vector_store: body.field_flag("has_vector_store"),
            has_model: body.field_flag("has_model"),
            error: body.field_text("error"),
        }
    }

    /// A missing status is read as ready; the backend always sends one.
    pub fn is_ready(&self) -> bool {
        self.status.as_deref().is_none_or(|s| s == "ok")
    }

    pub fn readiness_text(&self) -> String {
        let heading = if self.is_ready() {
            "Backend ready."
        } else {
            "Backend not ready."
        };
        let mut text = format!(
            "{heading}\n\nVector store: {}\nModel: {}",
            loaded_label(self.has_vector_store),
            loaded_label(self.has_model)
        );
        if let Some(error) = &self.error {
            text.push_str(&format!("\nStartup error: {error}"));
        }
        text
    }
}

fn loaded_label(present: bool) -> &'static str {
    if present { "loaded" } else { "missing" }
}

/// Which user action a pending cycle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Recommend,
    HealthCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { answer: String, sources: Vec<String> },
    Failure { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Pending(Action),
    Settled(Outcome),
}

impl UiState {
    pub fn is_pending(&self) -> bool {
        matches!(self, UiState::Pending(_))
    }
}

/// Tone of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Info,
    Ok,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_result(body: Value) -> RequestResult {
        RequestResult::from_response(200, ResponseBody::Json(body), Duration::from_millis(5))
    }

    #[test]
    fn test_sources_coerced_when_not_array() {
        assert!(ok_result(json!({"response": "x"})).sources().is_empty());
        assert!(ok_result(json!({"sources": "Recipe A"})).sources().is_empty());
        assert!(ok_result(json!({"sources": null})).sources().is_empty());
    }

    #[test]
    fn test_sources_keep_order_and_stringify() {
        let result = ok_result(json!({"sources": ["Recipe A", 7, "Recipe B"]}));
        assert_eq!(result.sources(), vec!["Recipe A", "7", "Recipe B"]);
    }

    #[test]
    fn test_answer_text_defaults_to_empty() {
        assert_eq!(ok_result(json!({})).answer_text(), "");
        assert_eq!(ok_result(json!({"response": null})).answer_text(), "");
        assert_eq!(
            ok_result(json!({"response": "Try dish X"})).answer_text(),
            "Try dish X"
        );
    }

    #[test]
    fn test_status_range_sets_ok() {
        let r = RequestResult::from_response(503, ResponseBody::empty(), Duration::ZERO);
        assert!(!r.ok);
        assert_eq!(r.status, Some(503));
        assert!(!r.is_transport_failure());
    }

    #[test]
    fn test_detail_prefers_detail_then_error() {
        let r = RequestResult::from_response(
            500,
            ResponseBody::Json(json!({"detail": "vector store unavailable", "error": "x"})),
            Duration::ZERO,
        );
        assert_eq!(r.detail().as_deref(), Some("vector store unavailable"));

        let r = RequestResult::from_response(
            500,
            ResponseBody::Json(json!({"error": "boom"})),
            Duration::ZERO,
        );
        assert_eq!(r.detail().as_deref(), Some("boom"));
    }

    #[test]
    fn test_detail_from_text_body_is_truncated() {
        let long = "x".repeat(MAX_TEXT_DETAIL + 20);
        let r = RequestResult::from_response(502, ResponseBody::Text(long), Duration::ZERO);
        let detail = r.detail().expect("text body should give detail");
        assert_eq!(detail.chars().count(), MAX_TEXT_DETAIL + 1);
        assert!(detail.ends_with('…'));
    }

    #[test]
    fn test_transport_failure_shape() {
        let r = RequestResult::transport_failure("connection refused", Duration::from_millis(3));
        assert!(r.is_transport_failure());
        assert_eq!(r.body, ResponseBody::empty());
    }

    #[test]
    fn test_health_report_readiness() {
        let body = ResponseBody::Json(json!({
            "status": "ok",
            "has_vector_store": true,
            "has_model": false
        }));
        let report = HealthReport::from_body(&body);
        assert_eq!(report.status.as_deref(), Some("ok"));
        let text = report.readiness_text();
        assert!(text.starts_with("Backend ready."));
        assert!(text.contains("Vector store: loaded"));
        assert!(text.contains("Model: missing"));
    }

    #[test]
    fn test_health_report_not_ready_mentions_startup_error() {
        let body = ResponseBody::Json(json!({
            "status": "not_ready",
            "error": "Missing FAISS store",
            "has_vector_store": false,
            "has_model": false
        }));
        let report = HealthReport::from_body(&body);
        assert!(!report.is_ready());
        let text = report.readiness_text();
        assert!(text.starts_with("Backend not ready."));
        assert!(text.contains("Startup error: Missing FAISS store"));
    }

    #[test]
    fn test_recommend_response_defaults() {
        let parsed: RecommendResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, RecommendResponse::default());
    }
}
