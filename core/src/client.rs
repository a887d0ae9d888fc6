//! The Drip API client.
//!
//! # Design
//! `DripClient` holds an immutable `ClientConfig` and a `Transport`. Every
//! public operation formats one URL from a fixed template, builds an
//! `HttpRequest` through `build_request`, and sends it through one of three
//! primitives: `get`, `post`, `delete`. Responses are passed through
//! untouched: no retries, no status checks, no pagination beyond the `page`
//! query parameter.
//!
//! Identifiers are substituted into URLs verbatim.

use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::ApiResponse;

/// Synchronous client for the Drip v2 REST API.
#[derive(Debug, Clone)]
pub struct DripClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl DripClient<UreqTransport> {
    /// Client using the default blocking `ureq` transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> DripClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ---------------------------------------------------------------------
    // Campaigns
    // ---------------------------------------------------------------------

    /// `GET /:account_id/campaigns/`
    pub fn fetch_all_campaigns(&self) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url("campaigns/"))
    }

    /// `GET /:account_id/campaigns/:campaign_id`
    pub fn fetch_campaign(&self, campaign_id: &str) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url(&format!("campaigns/{campaign_id}")))
    }

    /// `POST /:account_id/campaigns/:campaign_id/activate`
    pub fn activate_campaign(&self, campaign_id: &str) -> Result<ApiResponse, ApiError> {
        self.post(self.account_url(&format!("campaigns/{campaign_id}/activate")), None)
    }

    /// `POST /:account_id/campaigns/:campaign_id/pause`
    pub fn pause_campaign(&self, campaign_id: &str) -> Result<ApiResponse, ApiError> {
        self.post(self.account_url(&format!("campaigns/{campaign_id}/pause")), None)
    }

    /// `GET /:account_id/campaigns/:campaign_id/subscribers`
    pub fn fetch_everyone_subscribed_to_campaign(
        &self,
        campaign_id: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url(&format!("campaigns/{campaign_id}/subscribers")))
    }

    /// Subscribe someone to a campaign.
    ///
    /// `POST /:account_id/campaigns/:campaign_id/subscribers`
    pub fn subscribe_subscriber<P>(
        &self,
        campaign_id: &str,
        payload: &P,
    ) -> Result<ApiResponse, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode(payload)?;
        self.post(
            self.account_url(&format!("campaigns/{campaign_id}/subscribers")),
            Some(body),
        )
    }

    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    /// `GET /accounts`. Not scoped to the configured account.
    pub fn fetch_accounts(&self) -> Result<ApiResponse, ApiError> {
        self.get(format!("{}/accounts", self.config.base_url()))
    }

    // ---------------------------------------------------------------------
    // Subscribers
    // ---------------------------------------------------------------------

    /// `POST /:account_id/subscribers`
    pub fn create_or_update_subscriber<P>(&self, payload: &P) -> Result<ApiResponse, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode(payload)?;
        self.post(self.account_url("subscribers"), Some(body))
    }

    /// `POST /:account_id/subscribers/batches`
    pub fn create_or_update_subscriber_batch<P>(
        &self,
        payload: &P,
    ) -> Result<ApiResponse, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode(payload)?;
        self.post(self.account_url("subscribers/batches"), Some(body))
    }

    /// `GET /:account_id/subscribers/:subscriber_id`
    pub fn fetch_subscriber(&self, subscriber_id: &str) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url(&format!("subscribers/{subscriber_id}")))
    }

    /// `GET /:account_id/subscribers`, with `?page=N` appended when a page is
    /// given.
    pub fn list_of_all_subscribers(&self, page: Option<u32>) -> Result<ApiResponse, ApiError> {
        let url = match page {
            Some(page) => self.account_url(&format!("subscribers?page={page}")),
            None => self.account_url("subscribers"),
        };
        self.get(url)
    }

    /// `DELETE /:account_id/subscribers/:subscriber_id`. Returns the status
    /// code only.
    pub fn delete_subscriber(&self, subscriber_id: &str) -> Result<u16, ApiError> {
        self.delete(self.account_url(&format!("subscribers/{subscriber_id}")))
    }

    /// `GET /:account_id/subscribers/:subscriber_id/campaign_subscriptions`
    pub fn fetch_campaign_subscriptions(
        &self,
        subscriber_id: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url(&format!(
            "subscribers/{subscriber_id}/campaign_subscriptions"
        )))
    }

    // ---------------------------------------------------------------------
    // Tags
    // ---------------------------------------------------------------------

    /// `POST /:account_id/tags`
    pub fn tag_subscriber<P>(&self, payload: &P) -> Result<ApiResponse, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode(payload)?;
        self.post(self.account_url("tags"), Some(body))
    }

    /// `DELETE /:account_id/subscribers/:email/tags/:tag`. Returns the status
    /// code only.
    pub fn untag_subscriber(&self, email: &str, tag: &str) -> Result<u16, ApiError> {
        self.delete(self.account_url(&format!("subscribers/{email}/tags/{tag}")))
    }

    // ---------------------------------------------------------------------
    // Forms and goals
    // ---------------------------------------------------------------------

    /// `GET /:account_id/forms/:form_id`
    pub fn fetch_form(&self, form_id: &str) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url(&format!("forms/{form_id}")))
    }

    /// `GET /:account_id/goals`
    pub fn fetch_goals(&self) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url("goals"))
    }

    /// `GET /:account_id/goals/:goal_id`
    pub fn fetch_goal(&self, goal_id: &str) -> Result<ApiResponse, ApiError> {
        self.get(self.account_url(&format!("goals/{goal_id}")))
    }

    // ---------------------------------------------------------------------
    // Request plumbing
    // ---------------------------------------------------------------------

    /// Build a request carrying the configured headers and credential.
    pub fn build_request(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<String>,
    ) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: self.config.headers(),
            body,
        }
    }

    fn account_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url(),
            self.config.account_id(),
            path
        )
    }

    fn get(&self, url: String) -> Result<ApiResponse, ApiError> {
        let response = self.send(self.build_request(HttpMethod::Get, url, None))?;
        ApiResponse::from_http(response)
    }

    fn post(&self, url: String, body: Option<String>) -> Result<ApiResponse, ApiError> {
        let response = self.send(self.build_request(HttpMethod::Post, url, body))?;
        ApiResponse::from_http(response)
    }

    fn delete(&self, url: String) -> Result<u16, ApiError> {
        let response = self.send(self.build_request(HttpMethod::Delete, url, None))?;
        Ok(response.status)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            auth = self.config.auth().scheme(),
            "sending drip request"
        );
        match self.transport.execute(&request) {
            Ok(response) => {
                tracing::debug!(status = response.status, url = %request.url, "drip response");
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(error = %err, method = %request.method, url = %request.url, "drip request failed");
                Err(err)
            }
        }
    }
}

fn encode<P: Serialize + ?Sized>(payload: &P) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(ApiError::Serialization)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;

    /// Records every request and answers with a canned response.
    struct Recorder {
        requests: Mutex<Vec<HttpRequest>>,
        response: HttpResponse,
    }

    impl Recorder {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: HttpResponse {
                    status,
                    body: body.to_string(),
                },
            }
        }

        fn last(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct Failing;

    impl Transport for Failing {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            Err(ApiError::transport("connection reset"))
        }
    }

    fn key_client(recorder: Recorder) -> DripClient<Recorder> {
        let config = ClientConfig::builder()
            .account_id("123")
            .api_key("k")
            .build()
            .unwrap();
        DripClient::with_transport(config, recorder)
    }

    fn token_client(recorder: Recorder) -> DripClient<Recorder> {
        let config = ClientConfig::builder()
            .account_id("123")
            .token("t0k3n")
            .build()
            .unwrap();
        DripClient::with_transport(config, recorder)
    }

    #[test]
    fn fetch_campaign_uses_basic_auth_and_returns_body() {
        let client = key_client(Recorder::replying(200, r#"{"campaigns":[{"id":"99"}]}"#));
        let resp = client.fetch_campaign("99").unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["campaigns"][0]["id"], "99");

        let req = client.transport().last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.getdrip.com/v2/123/campaigns/99");
        assert_eq!(req.header("authorization"), Some("Basic azo="));
        assert!(req.body.is_none());
    }

    #[test]
    fn token_mode_sends_bearer_header_only() {
        let client = token_client(Recorder::replying(200, "{}"));
        client.fetch_goals().unwrap();
        client.delete_subscriber("abc").unwrap();
        client.tag_subscriber(&json!({"tags": []})).unwrap();

        for req in client.transport().requests.lock().unwrap().iter() {
            let auth: Vec<_> = req
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
                .collect();
            assert_eq!(auth.len(), 1, "{}: exactly one credential", req.url);
            assert_eq!(auth[0].1, "Bearer t0k3n");
        }
    }

    #[test]
    fn key_mode_never_sends_bearer() {
        let client = key_client(Recorder::replying(204, ""));
        client.pause_campaign("1").unwrap();
        client.untag_subscriber("a@b.co", "vip").unwrap();
        for req in client.transport().requests.lock().unwrap().iter() {
            let value = req.header("authorization").unwrap();
            assert!(value.starts_with("Basic "), "{}: {value}", req.url);
        }
    }

    #[test]
    fn every_request_carries_json_api_headers() {
        let client = key_client(Recorder::replying(200, "{}"));
        client.fetch_accounts().unwrap();
        let req = client.transport().last();
        assert_eq!(req.url, "https://api.getdrip.com/v2/accounts");
        assert_eq!(req.header("content-type"), Some("application/vnd.api+json"));
        assert_eq!(req.header("accept"), Some("*/*"));
    }

    #[test]
    fn list_subscribers_appends_page_only_when_given() {
        let client = key_client(Recorder::replying(200, "{}"));
        client.list_of_all_subscribers(Some(2)).unwrap();
        assert_eq!(
            client.transport().last().url,
            "https://api.getdrip.com/v2/123/subscribers?page=2"
        );
        client.list_of_all_subscribers(None).unwrap();
        assert_eq!(
            client.transport().last().url,
            "https://api.getdrip.com/v2/123/subscribers"
        );
    }

    #[test]
    fn delete_subscriber_returns_status_only() {
        let client = key_client(Recorder::replying(204, ""));
        let status: u16 = client.delete_subscriber("abc").unwrap();
        assert_eq!(status, 204);
        let req = client.transport().last();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "https://api.getdrip.com/v2/123/subscribers/abc");
    }

    #[test]
    fn delete_ignores_whatever_body_comes_back() {
        let client = key_client(Recorder::replying(404, "not json at all"));
        assert_eq!(client.untag_subscriber("a@b.co", "vip").unwrap(), 404);
    }

    #[test]
    fn post_serializes_payload() {
        let client = key_client(Recorder::replying(201, r#"{"subscribers":[]}"#));
        let payload = json!({"subscribers": [{"email": "john@acme.com", "tags": ["Customer"]}]});
        let resp = client.create_or_update_subscriber(&payload).unwrap();
        assert_eq!(resp.status, 201);

        let req = client.transport().last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.getdrip.com/v2/123/subscribers");
        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, payload);
    }

    #[test]
    fn post_accepts_typed_payloads() {
        #[derive(Serialize)]
        struct Tag<'a> {
            email: &'a str,
            tag: &'a str,
        }
        let client = key_client(Recorder::replying(201, ""));
        let mut payload = BTreeMap::new();
        payload.insert(
            "tags",
            vec![Tag {
                email: "john@acme.com",
                tag: "Customer",
            }],
        );
        client.tag_subscriber(&payload).unwrap();
        let sent: Value =
            serde_json::from_str(client.transport().last().body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["tags"][0]["tag"], "Customer");
    }

    #[test]
    fn activate_sends_no_body() {
        let client = key_client(Recorder::replying(204, ""));
        let resp = client.activate_campaign("7").unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(resp.body, Value::Null);
        let req = client.transport().last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.getdrip.com/v2/123/campaigns/7/activate");
        assert!(req.body.is_none());
    }

    #[test]
    fn error_statuses_are_returned_not_raised() {
        let client = key_client(Recorder::replying(
            401,
            r#"{"errors":[{"code":"authentication_error"}]}"#,
        ));
        let resp = client.fetch_all_campaigns().unwrap();
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body["errors"][0]["code"], "authentication_error");
        assert_eq!(
            client.transport().last().url,
            "https://api.getdrip.com/v2/123/campaigns/"
        );
    }

    #[test]
    fn identifiers_are_substituted_verbatim() {
        let client = key_client(Recorder::replying(204, ""));
        client.untag_subscriber("john+1@acme.com", "Big Spender").unwrap();
        assert_eq!(
            client.transport().last().url,
            "https://api.getdrip.com/v2/123/subscribers/john+1@acme.com/tags/Big Spender"
        );
    }

    #[test]
    fn transport_errors_propagate() {
        let config = ClientConfig::builder()
            .account_id("123")
            .api_key("k")
            .build()
            .unwrap();
        let client = DripClient::with_transport(config, Failing);
        assert!(matches!(
            client.fetch_goal("1").unwrap_err(),
            ApiError::Transport(_)
        ));
        assert!(matches!(
            client.delete_subscriber("1").unwrap_err(),
            ApiError::Transport(_)
        ));
    }

    #[test]
    fn borrowed_transport_works() {
        let recorder = Recorder::replying(200, "{}");
        let config = ClientConfig::builder()
            .account_id("123")
            .api_key("k")
            .build()
            .unwrap();
        let client = DripClient::with_transport(config, &recorder);
        client.fetch_form("f1").unwrap();
        assert_eq!(recorder.last().url, "https://api.getdrip.com/v2/123/forms/f1");
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DripClient>();
    }
}
