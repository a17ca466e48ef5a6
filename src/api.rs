use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::{
    extract::{
        rejection::QueryRejection, DefaultBodyLimit, FromRequest, Multipart, Query, Request,
        State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::aggregate::{AggregateError, AggregateRequest, Aggregator, Family};
use crate::cache_hint::CacheHint;
use crate::config::AppConfig;
use crate::contact::{
    self, read_multipart, ContactError, ContactForm, DisabledMailer, MailTransport, SmtpMailer,
    ATTACHMENT_LIMIT_BYTES,
};
use crate::sources::{self, SourceContext};

/// Room for the attachment plus the text fields and multipart framing.
const CONTACT_BODY_LIMIT: usize = ATTACHMENT_LIMIT_BYTES * 2;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache_hint: CacheHint,
    leetcode: Arc<Aggregator>,
    devpost: Arc<Aggregator>,
    geeksforgeeks: Arc<Aggregator>,
    mailer: Arc<dyn MailTransport>,
}

impl AppState {
    /// Exactly one aggregator per family is required.
    pub fn new(
        config: AppConfig,
        aggregators: Vec<Aggregator>,
        mailer: Arc<dyn MailTransport>,
    ) -> anyhow::Result<Self> {
        let mut aggregators = aggregators;
        let mut take = |family: Family| -> anyhow::Result<Arc<Aggregator>> {
            let idx = aggregators
                .iter()
                .position(|a| a.family() == family)
                .ok_or_else(|| anyhow!("no aggregator for {}", family.label()))?;
            Ok(Arc::new(aggregators.swap_remove(idx)))
        };
        let leetcode = take(Family::LeetCode)?;
        let devpost = take(Family::Devpost)?;
        let geeksforgeeks = take(Family::GeeksforGeeks)?;
        if let Some(extra) = aggregators.first() {
            return Err(anyhow!("duplicate aggregator for {}", extra.family().label()));
        }

        Ok(Self {
            cache_hint: CacheHint::new(config.cache_max_age_secs),
            config: Arc::new(config),
            leetcode,
            devpost,
            geeksforgeeks,
            mailer,
        })
    }

    /// Wire real adapters and the SMTP relay from configuration.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let ctx = Arc::new(
            SourceContext::new(config.upstream.clone()).context("building http client")?,
        );

        let aggregators = Family::ALL
            .iter()
            .map(|&family| {
                Aggregator::new(family, sources::adapters_for(family, &ctx))
                    .map(|a| a.with_timeout(config.source_timeout))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mailer: Arc<dyn MailTransport> = match SmtpMailer::from_config(&config.mail)? {
            Some(m) => Arc::new(m),
            None => {
                info!("EMAIL_USER not set; contact relay disabled");
                Arc::new(DisabledMailer)
            }
        };

        Self::new(config, aggregators, mailer)
    }

    pub fn aggregator(&self, family: Family) -> &Aggregator {
        match family {
            Family::LeetCode => &self.leetcode,
            Family::Devpost => &self.devpost,
            Family::GeeksforGeeks => &self.geeksforgeeks,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/leetcode", get(leetcode))
        .route("/api/devpost", get(devpost))
        .route("/api/geeksforgeeks", get(geeksforgeeks))
        .route(
            "/api/contact",
            post(contact)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(CONTACT_BODY_LIMIT)),
        )
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ------------------------------------------------------------
// Errors
// ------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Aggregate {
        family: Family,
        err: AggregateError,
    },
    Contact {
        err: ContactError,
        expose_reason: bool,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Aggregate { family, err } => {
                error!(family = family.label(), error = %err, "aggregation failed");
                let body = json!({
                    "error": format!("Failed to fetch {} data", family.display_name()),
                    "message": "Internal error while aggregating sources",
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::Contact { err, .. } if err.is_client_error() => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": err.to_string() })))
                    .into_response()
            }
            ApiError::Contact { err, expose_reason } => {
                let mut body = json!({ "message": contact::MSG_SEND_FAILED });
                if expose_reason {
                    let reason = match &err {
                        ContactError::Transport(e) => format!("{e:#}"),
                        other => other.to_string(),
                    };
                    body["error"] = json!(reason);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

// ------------------------------------------------------------
// Aggregation endpoints
// ------------------------------------------------------------

/// Raw query pairs. A repeated or unparsable query string must not fail the request.
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// First non-blank `username` pair, if any.
fn requested_username(q: QueryPairs) -> Option<String> {
    let Query(pairs) = q.ok()?;
    pairs
        .into_iter()
        .filter(|(k, _)| k == "username")
        .map(|(_, v)| v.trim().to_string())
        .find(|v| !v.is_empty())
}

async fn leetcode(State(state): State<AppState>, q: QueryPairs) -> Result<Response, ApiError> {
    aggregate_family(&state, Family::LeetCode, requested_username(q)).await
}

async fn devpost(State(state): State<AppState>, q: QueryPairs) -> Result<Response, ApiError> {
    aggregate_family(&state, Family::Devpost, requested_username(q)).await
}

async fn geeksforgeeks(
    State(state): State<AppState>,
    q: QueryPairs,
) -> Result<Response, ApiError> {
    aggregate_family(&state, Family::GeeksforGeeks, requested_username(q)).await
}

async fn aggregate_family(
    state: &AppState,
    family: Family,
    requested: Option<String>,
) -> Result<Response, ApiError> {
    let username = requested
        .as_deref()
        .unwrap_or(&state.config.default_username);

    let req = AggregateRequest::new(username).ok_or(ApiError::Aggregate {
        family,
        err: AggregateError::EmptyIdentifier,
    })?;

    let resp = state
        .aggregator(family)
        .aggregate(&req)
        .await
        .map_err(|err| ApiError::Aggregate { family, err })?;

    Ok(state.cache_hint.apply(Json(resp)))
}

// ------------------------------------------------------------
// Contact relay
// ------------------------------------------------------------

async fn contact(State(state): State<AppState>, req: Request) -> Response {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        });

    let form = if is_multipart {
        match Multipart::from_request(req, &state).await {
            Ok(mp) => read_multipart(mp).await,
            Err(rej) => Err(ContactError::Malformed(rej.body_text())),
        }
    } else {
        Json::<ContactForm>::from_request(req, &state)
            .await
            .map(|Json(f)| f)
            .map_err(|rej| ContactError::Malformed(rej.body_text()))
    };

    let result = match form {
        Ok(form) => contact::relay(form, state.mailer.as_ref()).await,
        Err(e) => {
            counter!("contact_rejected_total").increment(1);
            info!(reason = %e, "contact body rejected");
            Err(e)
        }
    };

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": contact::MSG_SENT })),
        )
            .into_response(),
        Err(err) => ApiError::Contact {
            err,
            expose_reason: state.config.expose_mail_errors,
        }
        .into_response(),
    }
}

async fn method_not_allowed() -> Response {
    let mut resp = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "message": "Method not allowed" })),
    )
        .into_response();
    resp.headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST"));
    resp
}
