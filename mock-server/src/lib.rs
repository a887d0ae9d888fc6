//! In-memory imitation of the Drip v2 endpoints used by `drip-core`.
//!
//! Serves the same URL shapes as `https://api.getdrip.com/v2` (mounted at the
//! root, so point the client's base URL at `http://host:port`). Every request
//! must carry basic-auth credentials with an empty password or a bearer
//! token. State lives behind one `RwLock` and starts with a seeded account.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Account id the seeded store answers for.
pub const ACCOUNT_ID: &str = "9999999";

/// Subscribers returned per page by the list endpoint.
pub const PER_PAGE: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub status: String,
    pub tags: Vec<String>,
    pub custom_fields: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignSubscription {
    pub id: String,
    pub campaign_id: String,
    pub subscriber_id: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub headline: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct SubscriberInput {
    pub email: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct SubscribersPayload {
    pub subscribers: Vec<SubscriberInput>,
}

#[derive(Deserialize)]
pub struct BatchesPayload {
    pub batches: Vec<SubscribersPayload>,
}

#[derive(Deserialize)]
pub struct TagInput {
    pub email: String,
    pub tag: String,
}

#[derive(Deserialize)]
pub struct TagsPayload {
    pub tags: Vec<TagInput>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

#[derive(Debug)]
pub struct Store {
    pub account: Account,
    pub campaigns: Vec<Campaign>,
    pub subscribers: Vec<Subscriber>,
    pub subscriptions: Vec<CampaignSubscription>,
    pub forms: Vec<Form>,
    pub goals: Vec<Goal>,
}

impl Store {
    pub fn seeded() -> Self {
        Self {
            account: Account {
                id: ACCOUNT_ID.to_string(),
                name: "Acme, Inc.".to_string(),
            },
            campaigns: vec![
                Campaign {
                    id: "1001".to_string(),
                    name: "Welcome series".to_string(),
                    status: "active".to_string(),
                },
                Campaign {
                    id: "1002".to_string(),
                    name: "Win-back".to_string(),
                    status: "paused".to_string(),
                },
            ],
            subscribers: Vec::new(),
            subscriptions: Vec::new(),
            forms: vec![Form {
                id: "2001".to_string(),
                headline: "Join the newsletter".to_string(),
            }],
            goals: vec![
                Goal {
                    id: "3001".to_string(),
                    name: "Purchase".to_string(),
                },
                Goal {
                    id: "3002".to_string(),
                    name: "Signup".to_string(),
                },
            ],
        }
    }

    /// Look a subscriber up by id or email, as Drip does.
    fn subscriber(&self, id_or_email: &str) -> Option<&Subscriber> {
        self.subscribers
            .iter()
            .find(|s| s.id == id_or_email || s.email == id_or_email)
    }

    fn subscriber_mut(&mut self, id_or_email: &str) -> Option<&mut Subscriber> {
        self.subscribers
            .iter_mut()
            .find(|s| s.id == id_or_email || s.email == id_or_email)
    }

    fn upsert(&mut self, input: SubscriberInput) -> Subscriber {
        if let Some(existing) = self.subscriber_mut(&input.email) {
            for tag in input.tags {
                if !existing.tags.contains(&tag) {
                    existing.tags.push(tag);
                }
            }
            existing.custom_fields.extend(input.custom_fields);
            return existing.clone();
        }
        let subscriber = Subscriber {
            id: Uuid::new_v4().simple().to_string(),
            email: input.email,
            status: "active".to_string(),
            tags: input.tags,
            custom_fields: input.custom_fields,
        };
        self.subscribers.push(subscriber.clone());
        subscriber
    }

    fn campaign_mut(&mut self, id: &str) -> Option<&mut Campaign> {
        self.campaigns.iter_mut().find(|c| c.id == id)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Drip-style error document: `{"errors": [{"code", "message"}]}`.
#[derive(Debug)]
pub struct Failure {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl Failure {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found_error",
            message: format!("The {what} could not be found"),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "authentication_error",
            message: "You must provide valid credentials".to_string(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({"errors": [{"code": self.code, "message": self.message}]});
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, Failure>;

pub fn app() -> Router {
    app_with_store(Store::seeded())
}

pub fn app_with_store(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/{account_id}/campaigns", get(list_campaigns))
        .route("/{account_id}/campaigns/", get(list_campaigns))
        .route("/{account_id}/campaigns/{campaign_id}", get(get_campaign))
        .route("/{account_id}/campaigns/{campaign_id}/activate", post(activate_campaign))
        .route("/{account_id}/campaigns/{campaign_id}/pause", post(pause_campaign))
        .route(
            "/{account_id}/campaigns/{campaign_id}/subscribers",
            get(campaign_subscribers).post(subscribe_to_campaign),
        )
        .route(
            "/{account_id}/subscribers",
            get(list_subscribers).post(upsert_subscribers),
        )
        .route("/{account_id}/subscribers/batches", post(upsert_batches))
        .route(
            "/{account_id}/subscribers/{subscriber_id}",
            get(get_subscriber).delete(delete_subscriber),
        )
        .route(
            "/{account_id}/subscribers/{subscriber_id}/campaign_subscriptions",
            get(subscriber_subscriptions),
        )
        .route(
            "/{account_id}/subscribers/{subscriber_id}/tags/{tag}",
            delete(remove_tag),
        )
        .route("/{account_id}/tags", post(apply_tags))
        .route("/{account_id}/forms/{form_id}", get(get_form))
        .route("/{account_id}/goals", get(list_goals))
        .route("/{account_id}/goals/{goal_id}", get(get_goal))
        .layer(middleware::from_fn(require_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Accept `Basic base64(<key>:)` or `Bearer <token>`; anything else is 401.
async fn require_auth(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(credential_is_valid);
    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejecting request without valid credentials");
        return Failure::unauthorized().into_response();
    }
    next.run(request).await
}

fn credential_is_valid(value: &str) -> bool {
    if let Some(token) = value.strip_prefix("Bearer ") {
        return !token.trim().is_empty();
    }
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    match String::from_utf8(decoded).ok().as_deref().and_then(|s| s.split_once(':')) {
        Some((key, password)) => !key.is_empty() && password.is_empty(),
        None => false,
    }
}

async fn check_account(db: &Db, account_id: &str) -> ApiResult<()> {
    if db.read().await.account.id == account_id {
        Ok(())
    } else {
        Err(Failure::not_found("account"))
    }
}

// --- accounts ---

async fn list_accounts(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    Json(json!({"accounts": [store.account]}))
}

// --- campaigns ---

async fn list_campaigns(
    State(db): State<Db>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    Ok(Json(json!({"campaigns": store.campaigns})))
}

async fn get_campaign(
    State(db): State<Db>,
    Path((account_id, campaign_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    let campaign = store
        .campaigns
        .iter()
        .find(|c| c.id == campaign_id)
        .ok_or_else(|| Failure::not_found("campaign"))?;
    Ok(Json(json!({"campaigns": [campaign]})))
}

async fn set_campaign_status(
    db: &Db,
    account_id: &str,
    campaign_id: &str,
    status: &str,
) -> ApiResult<StatusCode> {
    check_account(db, account_id).await?;
    let mut store = db.write().await;
    let campaign = store
        .campaign_mut(campaign_id)
        .ok_or_else(|| Failure::not_found("campaign"))?;
    campaign.status = status.to_string();
    Ok(StatusCode::NO_CONTENT)
}

async fn activate_campaign(
    State(db): State<Db>,
    Path((account_id, campaign_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    set_campaign_status(&db, &account_id, &campaign_id, "active").await
}

async fn pause_campaign(
    State(db): State<Db>,
    Path((account_id, campaign_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    set_campaign_status(&db, &account_id, &campaign_id, "paused").await
}

async fn campaign_subscribers(
    State(db): State<Db>,
    Path((account_id, campaign_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    if !store.campaigns.iter().any(|c| c.id == campaign_id) {
        return Err(Failure::not_found("campaign"));
    }
    let subscribers: Vec<&Subscriber> = store
        .subscriptions
        .iter()
        .filter(|sub| sub.campaign_id == campaign_id)
        .filter_map(|sub| store.subscriber(&sub.subscriber_id))
        .collect();
    Ok(Json(json!({"subscribers": subscribers})))
}

async fn subscribe_to_campaign(
    State(db): State<Db>,
    Path((account_id, campaign_id)): Path<(String, String)>,
    Json(input): Json<SubscribersPayload>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    check_account(&db, &account_id).await?;
    let mut store = db.write().await;
    if !store.campaigns.iter().any(|c| c.id == campaign_id) {
        return Err(Failure::not_found("campaign"));
    }
    let mut subscribed = Vec::new();
    for entry in input.subscribers {
        let subscriber = store.upsert(entry);
        let already = store
            .subscriptions
            .iter()
            .any(|sub| sub.campaign_id == campaign_id && sub.subscriber_id == subscriber.id);
        if !already {
            store.subscriptions.push(CampaignSubscription {
                id: Uuid::new_v4().simple().to_string(),
                campaign_id: campaign_id.clone(),
                subscriber_id: subscriber.id.clone(),
                status: "active".to_string(),
            });
        }
        subscribed.push(subscriber);
    }
    Ok((StatusCode::CREATED, Json(json!({"subscribers": subscribed}))))
}

// --- subscribers ---

async fn list_subscribers(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    let page = query.page.unwrap_or(1).max(1);
    let total_count = store.subscribers.len();
    let total_pages = total_count.div_ceil(PER_PAGE).max(1);
    let subscribers: Vec<&Subscriber> = store
        .subscribers
        .iter()
        .skip(page.saturating_sub(1).saturating_mul(PER_PAGE))
        .take(PER_PAGE)
        .collect();
    Ok(Json(json!({
        "subscribers": subscribers,
        "meta": {
            "page": page,
            "count": subscribers.len(),
            "total_pages": total_pages,
            "total_count": total_count,
        }
    })))
}

async fn upsert_subscribers(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Json(input): Json<SubscribersPayload>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    check_account(&db, &account_id).await?;
    let mut store = db.write().await;
    let subscribers: Vec<Subscriber> = input
        .subscribers
        .into_iter()
        .map(|entry| store.upsert(entry))
        .collect();
    Ok((StatusCode::OK, Json(json!({"subscribers": subscribers}))))
}

async fn upsert_batches(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Json(input): Json<BatchesPayload>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    check_account(&db, &account_id).await?;
    let mut store = db.write().await;
    for batch in input.batches {
        for entry in batch.subscribers {
            store.upsert(entry);
        }
    }
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn get_subscriber(
    State(db): State<Db>,
    Path((account_id, subscriber_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    let subscriber = store
        .subscriber(&subscriber_id)
        .ok_or_else(|| Failure::not_found("subscriber"))?;
    Ok(Json(json!({"subscribers": [subscriber]})))
}

async fn delete_subscriber(
    State(db): State<Db>,
    Path((account_id, subscriber_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    check_account(&db, &account_id).await?;
    let mut store = db.write().await;
    let id = store
        .subscriber(&subscriber_id)
        .map(|s| s.id.clone())
        .ok_or_else(|| Failure::not_found("subscriber"))?;
    store.subscribers.retain(|s| s.id != id);
    store.subscriptions.retain(|sub| sub.subscriber_id != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriber_subscriptions(
    State(db): State<Db>,
    Path((account_id, subscriber_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    let id = store
        .subscriber(&subscriber_id)
        .map(|s| s.id.as_str())
        .ok_or_else(|| Failure::not_found("subscriber"))?;
    let subscriptions: Vec<&CampaignSubscription> = store
        .subscriptions
        .iter()
        .filter(|sub| sub.subscriber_id == id)
        .collect();
    Ok(Json(json!({"campaign_subscriptions": subscriptions})))
}

// --- tags ---

async fn apply_tags(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Json(input): Json<TagsPayload>,
) -> ApiResult<StatusCode> {
    check_account(&db, &account_id).await?;
    let mut store = db.write().await;
    for TagInput { email, tag } in input.tags {
        store.upsert(SubscriberInput {
            email,
            tags: vec![tag],
            custom_fields: Map::new(),
        });
    }
    Ok(StatusCode::CREATED)
}

async fn remove_tag(
    State(db): State<Db>,
    Path((account_id, subscriber_id, tag)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    check_account(&db, &account_id).await?;
    let mut store = db.write().await;
    let subscriber = store
        .subscriber_mut(&subscriber_id)
        .ok_or_else(|| Failure::not_found("subscriber"))?;
    subscriber.tags.retain(|t| *t != tag);
    Ok(StatusCode::NO_CONTENT)
}

// --- forms and goals ---

async fn get_form(
    State(db): State<Db>,
    Path((account_id, form_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    let form = store
        .forms
        .iter()
        .find(|f| f.id == form_id)
        .ok_or_else(|| Failure::not_found("form"))?;
    Ok(Json(json!({"forms": [form]})))
}

async fn list_goals(
    State(db): State<Db>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    Ok(Json(json!({"goals": store.goals})))
}

async fn get_goal(
    State(db): State<Db>,
    Path((account_id, goal_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    check_account(&db, &account_id).await?;
    let store = db.read().await;
    let goal = store
        .goals
        .iter()
        .find(|g| g.id == goal_id)
        .ok_or_else(|| Failure::not_found("goal"))?;
    Ok(Json(json!({"goals": [goal]})))
}
