//! Asynchronous JSON API client core for the clinic service.
//!
//! # Overview
//! A generic client that issues GET/POST/PUT/PATCH/DELETE requests against a
//! JSON API, encodes request payloads, decodes responses into caller-chosen
//! types, and drives a shared "network busy" signal across concurrent calls.
//!
//! # Design
//! - [`ApiClient`] is the facade: `*_raw` verbs return the response envelope,
//!   `*_json` verbs decode it. Typed verbs reject non-2xx responses with
//!   [`ClientError::Status`] instead of decoding the error body; use the
//!   `*_raw` form to read error documents.
//! - [`request::build_request`] picks the body encoding from an explicit
//!   [`Payload`]: empty, binary (`application/octet-stream`) or JSON.
//! - [`Transport`] is the I/O seam; [`ReqwestTransport`] lazily builds one
//!   pooled `reqwest::Client` and shares it.
//! - [`busy::ActivityTracker`] counts in-flight calls and notifies a
//!   [`BusySurface`] on the 0→1 and 1→0 transitions.
//! - Every failure is handed to a [`TelemetrySink`] once, then returned
//!   unchanged.

pub mod busy;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod request;
pub mod telemetry;
pub mod transport;

pub use busy::{BusySurface, NoopSurface, WatchSurface};
pub use client::{ApiClient, ClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError, DecodeError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::Payload;
pub use telemetry::{TelemetrySink, TracingSink};
pub use transport::{ReqwestTransport, Transport};
