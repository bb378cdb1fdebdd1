//! Stateless HTTP request builder and response parser for the Fomo events API.
//!
//! # Design
//! `FomoClient` holds only its immutable `ClientConfig` and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The transport-driven methods (`get_event`,
//! `create_event`, ...) chain the two through a `Transport`.

use tracing::{debug, warn};

use crate::codec;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::{DeleteAck, Event, EventDraft, EventId, EventPage, PageRequest};

const EVENTS_PATH: &str = "/api/v1/applications/me/events";

/// Synchronous, stateless client for the Fomo events API.
#[derive(Debug, Clone)]
pub struct FomoClient {
    config: ClientConfig,
}

impl FomoClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Client for the default endpoint authenticated with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(ClientConfig::new(token))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_get_event(&self, id: EventId) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{EVENTS_PATH}/{id}"), None)
    }

    pub fn build_list_events(&self, page: PageRequest) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            format!("{EVENTS_PATH}?per={}&page={}", page.per_page, page.page),
            None,
        )
    }

    pub fn build_list_events_with_meta(&self, page: PageRequest) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            format!(
                "{EVENTS_PATH}?per={}&page={}&show_meta=true",
                page.per_page, page.page
            ),
            None,
        )
    }

    pub fn build_create_event(&self, draft: &EventDraft) -> Result<HttpRequest, ApiError> {
        draft.validate().map_err(ApiError::Validation)?;
        let body = codec::serialize_envelope(draft)?;
        Ok(self.request(HttpMethod::Post, EVENTS_PATH.to_string(), Some(body)))
    }

    pub fn build_update_event(&self, id: EventId, draft: &EventDraft) -> Result<HttpRequest, ApiError> {
        let body = codec::serialize_envelope(draft)?;
        Ok(self.request(HttpMethod::Patch, format!("{EVENTS_PATH}/{id}"), Some(body)))
    }

    pub fn build_delete_event(&self, id: EventId) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("{EVENTS_PATH}/{id}"), None)
    }

    pub fn parse_get_event(&self, response: HttpResponse) -> Result<Event, ApiError> {
        check_status(&response)?;
        log_malformed(codec::deserialize_event(&response.body))
    }

    pub fn parse_list_events(&self, response: HttpResponse) -> Result<Vec<Event>, ApiError> {
        check_status(&response)?;
        let events = log_malformed(codec::deserialize_events(&response.body))?;
        debug!(count = events.len(), "parsed event list");
        Ok(events)
    }

    pub fn parse_list_events_with_meta(&self, response: HttpResponse) -> Result<EventPage, ApiError> {
        check_status(&response)?;
        let page = log_malformed(codec::deserialize_page(&response.body))?;
        debug!(
            count = page.events.len(),
            page = page.meta.page,
            total_count = page.meta.total_count,
            "parsed event page"
        );
        Ok(page)
    }

    pub fn parse_create_event(&self, response: HttpResponse) -> Result<Event, ApiError> {
        check_status(&response)?;
        log_malformed(codec::deserialize_event(&response.body))
    }

    pub fn parse_update_event(&self, response: HttpResponse) -> Result<Event, ApiError> {
        check_status(&response)?;
        log_malformed(codec::deserialize_event(&response.body))
    }

    pub fn parse_delete_event(&self, response: HttpResponse) -> Result<DeleteAck, ApiError> {
        check_status(&response)?;
        log_malformed(codec::deserialize_delete_ack(&response.body))
    }

    pub fn get_event(&self, transport: &impl Transport, id: EventId) -> Result<Event, ApiError> {
        let response = send(transport, &self.build_get_event(id))?;
        self.parse_get_event(response)
    }

    pub fn list_events(&self, transport: &impl Transport, page: PageRequest) -> Result<Vec<Event>, ApiError> {
        let response = send(transport, &self.build_list_events(page))?;
        self.parse_list_events(response)
    }

    pub fn list_events_with_meta(
        &self,
        transport: &impl Transport,
        page: PageRequest,
    ) -> Result<EventPage, ApiError> {
        let response = send(transport, &self.build_list_events_with_meta(page))?;
        self.parse_list_events_with_meta(response)
    }

    pub fn create_event(&self, transport: &impl Transport, draft: &EventDraft) -> Result<Event, ApiError> {
        let response = send(transport, &self.build_create_event(draft)?)?;
        self.parse_create_event(response)
    }

    /// Send the event's draft fields back to the service under its id.
    pub fn update_event(&self, transport: &impl Transport, event: &Event) -> Result<Event, ApiError> {
        let id = event.id.ok_or(ApiError::MissingEventId)?;
        let response = send(transport, &self.build_update_event(id, &event.draft)?)?;
        self.parse_update_event(response)
    }

    pub fn delete_event(&self, transport: &impl Transport, id: EventId) -> Result<DeleteAck, ApiError> {
        let response = send(transport, &self.build_delete_event(id))?;
        self.parse_delete_event(response)
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        let mut headers = vec![
            ("Authorization".to_string(), format!("Token {}", self.config.token())),
            ("User-Agent".to_string(), self.config.user_agent().to_string()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        let url = format!("{}{path}", self.config.endpoint());
        debug!(method = method.as_str(), %url, "built fomo request");
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

fn send(transport: &impl Transport, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
    transport.send(request).map_err(|e| {
        warn!(method = request.method.as_str(), url = %request.url, error = %e, "transport failure");
        ApiError::TransportFailure(e)
    })
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    warn!(status = response.status, "fomo request failed");
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

fn log_malformed<T>(result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(ApiError::MalformedResponse(reason)) = &result {
        warn!(%reason, "malformed fomo response");
    }
    result
}
