//! HTTP request/response data and the transport that executes them.
//!
//! # Design
//! Requests and responses are plain data. `DripClient` only ever builds an
//! `HttpRequest` and hands it to a `Transport`; the transport owns the actual
//! I/O. `UreqTransport` is the blocking default. Tests swap in a recording
//! transport to inspect exactly what would go over the wire.
//!
//! Transports must return 4xx/5xx responses as `Ok`: status interpretation
//! belongs to the caller, not the transport.
//!
//! `HttpRequest::url` holds identifiers exactly as the caller passed them.
//! `UreqTransport` percent-encodes characters that are illegal in a URI (space,
//! quotes, braces, non-ASCII) at send time; reserved delimiters and existing
//! `%XX` escapes pass through unchanged.

use std::borrow::Cow;
use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::ApiError;

/// HTTP method for a request. The Drip endpoints this crate covers only use
/// these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Bytes that may never appear raw in a URI.
const URI_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode only the characters of `url` that a URI cannot carry.
pub(crate) fn requote(url: &str) -> Cow<'_, str> {
    utf8_percent_encode(url, URI_UNSAFE).into()
}

/// Executes one `HttpRequest` and returns the raw response.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent (proxies, timeouts, TLS settings).
    ///
    /// The agent must be built with `http_status_as_error(false)`, otherwise
    /// 4xx/5xx responses surface as transport errors.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = requote(&request.url);
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(url.as_ref());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(url.as_ref());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(url.as_ref());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(ApiError::transport)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(ApiError::transport)?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_renders_uppercase() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/x".to_string(),
            headers: vec![("Authorization".to_string(), "Bearer t".to_string())],
            body: None,
        };
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn requote_encodes_characters_illegal_in_a_uri() {
        assert_eq!(
            requote("http://h/1/subscribers/a@b.co/tags/Big Spender"),
            "http://h/1/subscribers/a@b.co/tags/Big%20Spender"
        );
        assert_eq!(requote("http://h/1/forms/{x}|\"y\""), "http://h/1/forms/%7Bx%7D%7C%22y%22");
        assert_eq!(requote("http://h/1/goals/café"), "http://h/1/goals/caf%C3%A9");
    }

    #[test]
    fn requote_keeps_reserved_characters_and_escapes() {
        for url in [
            "http://h/1/subscribers?page=2",
            "http://h/1/subscribers/john+1@acme.com",
            "http://h/1/subscribers/a%20b/tags/x",
        ] {
            assert_eq!(requote(url), url);
        }
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        // Bind then drop, so nothing is listening on the port.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: format!("http://127.0.0.1:{port}/accounts"),
            headers: Vec::new(),
            body: None,
        };
        let err = UreqTransport::new().execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
