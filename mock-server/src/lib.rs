use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const EVENTS_PATH: &str = "/api/v1/applications/me/events";
pub const DEFAULT_TOKEN: &str = "test-token";
pub const APPLICATION_ID: u64 = 1;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub application_id: u64,
    pub created_at: String,
    pub updated_at: String,
    pub created_at_as_timestamp_in_seconds: i64,
    pub message: String,
    pub link: String,
    pub template_variables: Map<String, Value>,
    pub event_type_id: String,
    pub event_type_tag: String,
    pub url: String,
    pub first_name: String,
    pub email_address: String,
    pub ip_address: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub title: String,
    pub external_id: String,
    pub image_url: String,
    pub custom_event_fields_attributes: Vec<CustomAttribute>,
}

/// Incoming event fields. Absent fields leave the stored value unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct EventInput {
    pub event_type_id: Option<String>,
    pub event_type_tag: Option<String>,
    pub url: Option<String>,
    pub first_name: Option<String>,
    pub email_address: Option<String>,
    pub ip_address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub title: Option<String>,
    pub external_id: Option<String>,
    pub image_url: Option<String>,
    pub custom_event_fields_attributes: Option<Vec<CustomAttribute>>,
}

#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub event: EventInput,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub per: Option<usize>,
    pub page: Option<usize>,
    #[serde(default)]
    pub show_meta: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub per_page: usize,
    pub page: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub meta: PageMeta,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    events: BTreeMap<u64, Event>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    token: Arc<str>,
}

pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

/// Router that only accepts `Authorization: Token <token>`.
pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        db: Db::default(),
        token: Arc::from(token),
    };
    Router::new()
        .route(EVENTS_PATH, get(list_events).post(create_event))
        .route(
            &format!("{EVENTS_PATH}/{{id}}"),
            get(get_event).patch(update_event).delete(delete_event),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_token(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Token "))
}

async fn require_token(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if extract_token(req.headers()) != Some(&*state.token) {
        tracing::warn!(path = %req.uri().path(), "rejected request without a valid token");
        return error(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    next.run(req).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn list_events(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let per_page = query.per.filter(|&per| per > 0).unwrap_or(30);
    let page = query.page.filter(|&page| page > 0).unwrap_or(1);

    let store = state.db.read().await;
    let events: Vec<Event> = store
        .events
        .values()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .cloned()
        .collect();

    if !query.show_meta {
        return Json(events).into_response();
    }
    let total_count = store.events.len();
    let meta = PageMeta {
        per_page,
        page,
        total_count,
        total_pages: total_count.div_ceil(per_page).max(1),
    };
    Json(EventPage { events, meta }).into_response()
}

async fn create_event(State(state): State<AppState>, Json(envelope): Json<EventEnvelope>) -> Response {
    let input = envelope.event;
    let has_template = [&input.event_type_id, &input.event_type_tag]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.is_empty()));
    if !has_template {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "event_type_id or event_type_tag is required");
    }
    if input.url.as_deref().is_none_or(str::is_empty) {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "url is required");
    }

    let mut store = state.db.write().await;
    store.next_id += 1;
    let now = Utc::now();
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut event = Event {
        id: store.next_id,
        application_id: APPLICATION_ID,
        created_at: timestamp.clone(),
        updated_at: timestamp,
        created_at_as_timestamp_in_seconds: now.timestamp(),
        ..Event::default()
    };
    apply(&mut event, input);
    store.events.insert(event.id, event.clone());
    tracing::debug!(id = event.id, "created event");
    (StatusCode::CREATED, Json(event)).into_response()
}

async fn get_event(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let store = state.db.read().await;
    match store.events.get(&id) {
        Some(event) => Json(event.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Event not found"),
    }
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(envelope): Json<EventEnvelope>,
) -> Response {
    let mut store = state.db.write().await;
    let Some(event) = store.events.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Event not found");
    };
    apply(event, envelope.event);
    event.updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Json(event.clone()).into_response()
}

async fn delete_event(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut store = state.db.write().await;
    match store.events.remove(&id) {
        Some(_) => Json(json!({ "message": "Event successfully deleted" })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Event not found"),
    }
}

/// Copy the present input fields onto `event` and re-render its message.
fn apply(event: &mut Event, input: EventInput) {
    let fields = [
        (&mut event.event_type_id, input.event_type_id),
        (&mut event.event_type_tag, input.event_type_tag),
        (&mut event.url, input.url),
        (&mut event.first_name, input.first_name),
        (&mut event.email_address, input.email_address),
        (&mut event.ip_address, input.ip_address),
        (&mut event.city, input.city),
        (&mut event.province, input.province),
        (&mut event.country, input.country),
        (&mut event.title, input.title),
        (&mut event.external_id, input.external_id),
        (&mut event.image_url, input.image_url),
    ];
    for (slot, value) in fields {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(attributes) = input.custom_event_fields_attributes {
        event.custom_event_fields_attributes = attributes;
    }
    render(event);
}

fn render(event: &mut Event) {
    let who = if event.first_name.is_empty() { "Someone" } else { event.first_name.as_str() };
    event.message = if event.city.is_empty() {
        format!("{who} {}", event.title)
    } else {
        format!("{who} in {} {}", event.city, event.title)
    };
    event.link = event.url.clone();
    event.template_variables = event
        .custom_event_fields_attributes
        .iter()
        .map(|attr| (attr.key.clone(), Value::String(attr.value.clone())))
        .collect();
}
