//! Request/UI-state controller.
//!
//! Owns the single [`UiState`] of the recommendation form and a separate state for
//! health probes. Every action handler takes `&mut self`, so at most one call is
//! in flight; a submission that arrives while one is pending is rejected anyway.

use std::sync::Arc;

use crate::config::UiConfig;
use crate::error::{ClientError, Result};
use crate::field::FieldAccessor;
use crate::models::{Action, HealthReport, Outcome, RequestResult, StatusKind, UiState};
use crate::render::PresentationSink;
use crate::store::BaseUrlStore;
use crate::transport::Backend;

pub const GENERATING_TEXT: &str = "Generating recommendations…";
pub const WORKING_PLACEHOLDER: &str = "Working…";
pub const NETWORK_HINT: &str = "Network error. Check the URL/CORS.";
pub const HEALTH_NETWORK_HINT: &str = "Could not reach the backend. Check the URL/CORS.";

/// Input fields the controller reads and writes.
pub struct Surface {
    /// Authoritative query input
    pub query: Arc<dyn FieldAccessor>,
    /// Derived copy of `query`, when the layout has one
    pub mirror: Option<Arc<dyn FieldAccessor>>,
    pub base_url: Arc<dyn FieldAccessor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub hero_surface: bool,
    pub clear_query_on_failure: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            hero_surface: true,
            clear_query_on_failure: false,
        }
    }
}

impl From<&UiConfig> for ControllerOptions {
    fn from(cfg: &UiConfig) -> Self {
        Self {
            hero_surface: cfg.hero_surface,
            clear_query_on_failure: cfg.clear_query_on_failure,
        }
    }
}

pub struct ViewController {
    backend: Arc<dyn Backend>,
    urls: BaseUrlStore,
    sink: Arc<dyn PresentationSink>,
    surface: Surface,
    options: ControllerOptions,
    state: UiState,
    health: UiState,
    submit_enabled: bool,
    generating: bool,
}

impl ViewController {
    pub fn new(
        backend: Arc<dyn Backend>,
        urls: BaseUrlStore,
        sink: Arc<dyn PresentationSink>,
        surface: Surface,
        options: ControllerOptions,
    ) -> Self {
        Self {
            backend,
            urls,
            sink,
            surface,
            options,
            state: UiState::Idle,
            health: UiState::Idle,
            submit_enabled: true,
            generating: false,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn health_state(&self) -> &UiState {
        &self.health
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Current resolved base URL (field value, else the configured default).
    pub fn base_url(&self) -> String {
        self.urls.resolve(Some(&self.surface.base_url.get()))
    }

    /// Fill the base URL field from storage and bring the mirror in line.
    pub fn init(&mut self) {
        let initial = self
            .urls
            .load()
            .unwrap_or_else(|| self.urls.default_base_url().to_string());
        self.surface.base_url.set(&initial);
        self.sync_mirror();
        self.sink.submit_enabled(true);
        tracing::info!(base_url = %initial, "controller initialised");
    }

    /// Change handler for the primary query input. Leaving a settled result marks
    /// the displayed answer as stale.
    pub fn on_query_input(&mut self, text: &str) {
        self.surface.query.set(text);
        self.sync_mirror();
        if matches!(self.state, UiState::Settled(_)) {
            self.state = UiState::Idle;
            self.sink.answer_stale();
        }
    }

    /// Write a preset prompt into the query and focus it.
    pub fn apply_example(&mut self, example: &str) {
        self.on_query_input(example);
        self.surface.query.focus();
    }

    /// Change handler for the base URL input; persists the normalized value.
    pub fn on_base_url_change(&mut self, raw: &str) {
        self.surface.base_url.set(raw);
        if let Err(e) = self.urls.save(raw) {
            tracing::warn!("Failed to persist base URL: {}", e);
        }
    }

    /// Run one recommendation cycle.
    ///
    /// Returns the settled outcome, or an error when the submission was rejected
    /// before any request was made.
    pub async fn submit(&mut self) -> Result<Outcome> {
        if self.state.is_pending() || !self.submit_enabled {
            tracing::debug!("submission ignored, a request is in progress");
            return Err(ClientError::Busy);
        }

        let query = self.surface.query.get().trim().to_string();
        if query.is_empty() {
            self.sink.status("Enter a query first.", StatusKind::Info);
            self.surface.query.focus();
            return Err(ClientError::validation("Query must not be empty."));
        }

        let base_url = self.base_url();
        if base_url.is_empty() {
            let message = "Set a backend URL first.";
            self.sink.status(message, StatusKind::Error);
            self.surface.base_url.focus();
            return Err(ClientError::validation(message));
        }

        self.enter_pending(Action::Recommend);
        tracing::info!(%base_url, "submitting recommendation query");

        let result = self.backend.recommend(&base_url, &query).await;
        let outcome = self.settle_recommendation(&result);

        self.exit_pending();
        let clear_query = match &outcome {
            Outcome::Success { .. } => true,
            Outcome::Failure { .. } => self.options.clear_query_on_failure,
        };
        if clear_query {
            self.surface.query.set("");
            self.sync_mirror();
        }
        if self.options.hero_surface {
            self.sink.scroll_to_result();
        }

        self.state = UiState::Settled(outcome.clone());
        Ok(outcome)
    }

    /// Probe backend readiness. Independent of the recommendation state.
    pub async fn check_health(&mut self) -> Result<HealthReport> {
        if self.health.is_pending() {
            return Err(ClientError::Busy);
        }

        self.sink.latency(None);
        let base_url = self.base_url();
        if base_url.is_empty() {
            let message = "Set a backend URL first.";
            self.sink.status(message, StatusKind::Error);
            return Err(ClientError::validation(message));
        }

        self.health = UiState::Pending(Action::HealthCheck);
        self.sink.status("Checking backend health…", StatusKind::Info);
        tracing::info!(%base_url, "checking backend health");

        let result = self.backend.check_health(&base_url).await;

        let (outcome, report) = if result.is_transport_failure() {
            let error = result.error.clone().unwrap_or_default();
            tracing::warn!("health check could not reach backend: {}", error);
            self.sink.status(HEALTH_NETWORK_HINT, StatusKind::Error);
            self.sink.answer(&error, &[]);
            (
                Outcome::Failure {
                    message: format!("{HEALTH_NETWORK_HINT}\n\n{error}"),
                },
                Err(ClientError::Transport(error)),
            )
        } else {
            self.sink.latency(Some(result.latency));
            let report = HealthReport::from_body(&result.body);
            if !result.ok {
                let label = report
                    .status
                    .clone()
                    .or_else(|| result.status.map(|s| s.to_string()))
                    .unwrap_or_else(|| "error".to_string());
                let message = format!("Health check failed ({label}).");
                let body = result.body.pretty();
                tracing::warn!("{}", message);
                self.sink.status(&message, StatusKind::Error);
                self.sink.answer(&body, &[]);
                (
                    Outcome::Failure {
                        message: format!("{message}\n\n{body}"),
                    },
                    Err(ClientError::Server {
                        status: label,
                        detail: body,
                    }),
                )
            } else {
                let status = report.status.clone().unwrap_or_else(|| "ok".to_string());
                let kind = if report.is_ready() {
                    StatusKind::Ok
                } else {
                    StatusKind::Error
                };
                let text = report.readiness_text();
                self.sink.status(&format!("Backend: {status}"), kind);
                self.sink.answer(&text, &[]);
                tracing::info!(
                    %status,
                    has_vector_store = report.has_vector_store,
                    has_model = report.has_model,
                    "health check settled"
                );
                (
                    Outcome::Success {
                        answer: text,
                        sources: Vec::new(),
                    },
                    Ok(report),
                )
            }
        };

        self.health = UiState::Settled(outcome);
        report
    }

    fn enter_pending(&mut self, action: Action) {
        self.state = UiState::Pending(action);
        self.set_submit_enabled(false);
        self.sink.latency(None);
        self.sink.status(GENERATING_TEXT, StatusKind::Info);
        self.sink.answer(WORKING_PLACEHOLDER, &[]);
        if self.options.hero_surface {
            self.set_generating(true, Some(GENERATING_TEXT));
        }
    }

    /// Leaving Pending always restores the submit control.
    fn exit_pending(&mut self) {
        if self.options.hero_surface {
            self.set_generating(false, None);
        }
        self.set_submit_enabled(true);
    }

    fn settle_recommendation(&self, result: &RequestResult) -> Outcome {
        if result.is_transport_failure() {
            let error = result.error.clone().unwrap_or_default();
            let message = format!("{NETWORK_HINT}\n\n{error}");
            tracing::warn!("recommend could not reach backend: {}", error);
            self.sink.status(NETWORK_HINT, StatusKind::Error);
            self.sink.answer(&message, &[]);
            return Outcome::Failure { message };
        }

        self.sink.latency(Some(result.latency));

        if !result.ok {
            let message = failure_message(result);
            tracing::warn!(status = ?result.status, "recommend failed");
            self.sink
                .status("Request failed. See response for details.", StatusKind::Error);
            self.sink.answer(&message, &[]);
            return Outcome::Failure { message };
        }

        let answer = result.answer_text();
        let sources = result.sources();
        tracing::info!(
            sources = sources.len(),
            latency_ms = result.latency.as_millis() as u64,
            "recommendation settled"
        );
        self.sink.status("Done.", StatusKind::Ok);
        self.sink.answer(&answer, &sources);
        Outcome::Success { answer, sources }
    }

    fn sync_mirror(&self) {
        if let Some(mirror) = &self.surface.mirror {
            mirror.set(&self.surface.query.get());
        }
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
        self.sink.submit_enabled(enabled);
    }

    fn set_generating(&mut self, active: bool, text: Option<&str>) {
        self.generating = active;
        self.sink.generating(active, text);
    }
}

/// `Error (<status>).` plus the body's detail on its own paragraph.
fn failure_message(result: &RequestResult) -> String {
    let label = result
        .status
        .map(|s| s.to_string())
        .or_else(|| result.body.field_text("status"))
        .unwrap_or_else(|| "HTTP error".to_string());
    match result.detail() {
        Some(detail) => format!("Error ({label}).\n\n{detail}"),
        None => format!("Error ({label})."),
    }
}
