//! Synchronous client core for the Fomo notification API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` executes the
//! round-trip; `UreqTransport` is bundled behind the default `ureq` feature.
//!
//! # Design
//! - `FomoClient` holds only its immutable `ClientConfig` (token, endpoint,
//!   user agent); there is no process-wide state.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - `codec` owns the JSON wire contract: every draft field is always
//!   emitted, keys are sorted, and inbound shapes are checked before typed
//!   deserialization.
//! - A plain event list and a list with pagination metadata are two calls
//!   with two result types (`Vec<Event>` and `EventPage`).
//!
//! ```no_run
//! use fomo_core::{EventDraft, FomoClient, UreqTransport};
//!
//! # fn main() -> Result<(), fomo_core::ApiError> {
//! let client = FomoClient::with_token("<token>");
//! let transport = UreqTransport::new();
//!
//! let mut draft = EventDraft::with_type_tag("new_order", "https://example.com");
//! draft.title = "Test event".to_string();
//! draft.add_custom_event_field("variable_name", "value");
//!
//! let created = client.create_event(&transport, &draft)?;
//! println!("created {:?}", created.id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;

pub use client::FomoClient;
pub use config::ClientConfig;
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{CustomAttribute, DeleteAck, Event, EventDraft, EventId, EventPage, PageMeta, PageRequest};
