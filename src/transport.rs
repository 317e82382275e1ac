use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::models::{RecommendRequest, RequestResult, ResponseBody};

/// The two calls the demo makes against the recommendation backend.
///
/// Neither call returns an error: HTTP failures come back with `ok == false`
/// and transport failures with `status == None` and `error` set.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn check_health(&self, base_url: &str) -> RequestResult;
    async fn recommend(&self, base_url: &str, query: &str) -> RequestResult;
}

pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn check_health(&self, base_url: &str) -> RequestResult {
        let url = format!("{base_url}/health");
        let start_time = Instant::now();

        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = read_json_body(response).await;
                let latency = start_time.elapsed();
                tracing::debug!(
                    %url,
                    status,
                    latency_ms = latency.as_millis() as u64,
                    "health probe finished"
                );
                RequestResult::from_response(status, body, latency)
            }
            Err(e) => {
                let message = describe_transport_error(&e);
                tracing::warn!(%url, "health probe failed: {}", message);
                RequestResult::transport_failure(message, start_time.elapsed())
            }
        }
    }

    async fn recommend(&self, base_url: &str, query: &str) -> RequestResult {
        let url = format!("{base_url}/recommend");
        let start_time = Instant::now();
        let payload = RecommendRequest {
            query: query.to_string(),
        };

        match self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = if declares_non_json(&response) {
                    read_text_body(response).await
                } else {
                    read_json_body(response).await
                };
                let latency = start_time.elapsed();
                tracing::debug!(
                    %url,
                    status,
                    latency_ms = latency.as_millis() as u64,
                    "recommend finished"
                );
                RequestResult::from_response(status, body, latency)
            }
            Err(e) => {
                let message = describe_transport_error(&e);
                tracing::warn!(%url, "recommend request failed: {}", message);
                RequestResult::transport_failure(message, start_time.elapsed())
            }
        }
    }
}

/// True only when the server names a content type and it is not JSON.
fn declares_non_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| !is_json_content_type(ct))
}

fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Parse the body as JSON; anything unparsable (or a bare `null`) becomes `{}`.
async fn read_json_body(response: Response) -> ResponseBody {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return ResponseBody::empty();
        }
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Null) => ResponseBody::empty(),
        Ok(value) => ResponseBody::Json(value),
        Err(e) => {
            tracing::debug!("Response body is not JSON ({}), using empty object", e);
            ResponseBody::empty()
        }
    }
}

async fn read_text_body(response: Response) -> ResponseBody {
    match response.text().await {
        Ok(text) => ResponseBody::Text(text),
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            ResponseBody::Text(String::new())
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    let mut message = if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("could not connect: {error}")
    } else if error.is_builder() {
        format!("invalid request: {error}")
    } else {
        error.to_string()
    };

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendResponse;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend() -> HttpBackend {
        HttpBackend::new(None).expect("client should build")
    }

    #[tokio::test]
    async fn test_check_health_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "has_vector_store": true,
                "has_model": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend().check_health(&server.uri()).await;
        assert!(result.ok);
        assert_eq!(result.status, Some(200));
        assert_eq!(result.body.field_text("status").as_deref(), Some("ok"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_check_health_non_json_body_becomes_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let result = backend().check_health(&server.uri()).await;
        assert!(result.ok);
        assert_eq!(result.body, ResponseBody::empty());
    }

    #[tokio::test]
    async fn test_recommend_sends_query_payload() {
        let server = MockServer::start().await;
        let reply = RecommendResponse {
            response: "Try dish X".to_string(),
            sources: vec!["Recipe A".to_string(), "Recipe B".to_string()],
        };
        Mock::given(method("POST"))
            .and(path("/recommend"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"query": "best vegan tacos"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend().recommend(&server.uri(), "best vegan tacos").await;
        assert!(result.ok);
        assert_eq!(result.answer_text(), "Try dish X");
        assert_eq!(result.sources(), vec!["Recipe A", "Recipe B"]);
    }

    #[tokio::test]
    async fn test_recommend_server_error_is_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"detail": "vector store unavailable"})),
            )
            .mount(&server)
            .await;

        let result = backend().recommend(&server.uri(), "soup").await;
        assert!(!result.ok);
        assert_eq!(result.status, Some(500));
        assert!(!result.is_transport_failure());
        assert_eq!(result.detail().as_deref(), Some("vector store unavailable"));
    }

    #[tokio::test]
    async fn test_recommend_non_json_content_type_kept_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend"))
            .respond_with(
                ResponseTemplate::new(502).set_body_raw("<html>Bad gateway</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let result = backend().recommend(&server.uri(), "soup").await;
        assert!(!result.ok);
        assert_eq!(
            result.body,
            ResponseBody::Text("<html>Bad gateway</html>".to_string())
        );
    }

    #[tokio::test]
    async fn test_recommend_invalid_json_falls_back_to_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{oops", "application/json"))
            .mount(&server)
            .await;

        let result = backend().recommend(&server.uri(), "soup").await;
        assert!(result.ok);
        assert_eq!(result.body, ResponseBody::empty());
        assert!(result.sources().is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_becomes_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = backend().recommend(&format!("http://{addr}"), "soup").await;
        assert!(result.is_transport_failure());
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("could not connect"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ok"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let backend = HttpBackend::new(Some(Duration::from_millis(50))).unwrap();
        let result = backend.check_health(&server.uri()).await;
        assert!(result.is_transport_failure());
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_schemeless_url_is_transport_failure() {
        let result = backend().check_health("localhost-without-scheme").await;
        assert!(result.is_transport_failure());
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/html; charset=utf-8"));
        assert!(!is_json_content_type("text/plain"));
    }
}
