//! Synchronous client for the Drip v2 REST API.
//!
//! # Overview
//! Every method on `DripClient` maps onto exactly one Drip endpoint, issues a
//! single blocking HTTP request, and returns the status code together with the
//! decoded JSON body (or just the status code, for deletions).
//!
//! # Design
//! - `ClientConfig` is validated once at construction: an account id plus an
//!   API key (basic auth) or a bearer token. It never changes afterwards.
//! - `Auth` renders its own `authorization` header, so request construction
//!   does not branch on the authentication mode.
//! - Request construction and I/O are split by the `Transport` trait.
//!   `UreqTransport` is the default; tests plug in their own.
//! - HTTP error statuses are data, not errors. Only transport failures and
//!   undecodable bodies surface as `ApiError`.
//!
//! ```no_run
//! use drip_core::{ClientConfig, DripClient};
//!
//! let config = ClientConfig::builder().account_id("123").api_key("k").build()?;
//! let client = DripClient::new(config);
//! let response = client.fetch_campaign("99")?;
//! println!("{} {}", response.status, response.body);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use auth::Auth;
pub use client::DripClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{ApiError, ConfigError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::ApiResponse;
