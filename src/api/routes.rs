use crate::api::api_error::APIError;
use crate::api::model::{
    CreateAuthorizationRequest, ExpireResult, LookupRecord, NameSecretRequest, PublishResponseRequest,
    PublishResult, ResultBody, SecretResult,
};
use crate::api::server::AppState;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const FORWARDED_FOR: &str = "x-forwarded-for";

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/publish_response", post(publish_response))
        .route("/expire_response", post(expire_response))
        .route("/create_authorisation", post(create_authorization))
        .route("/expire_authorisation", post(expire_authorization))
        .route("/dns/lookup/:qname/:qtype", get(lookup))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

/// The first `X-Forwarded-For` entry if the config trusts it and it parses, otherwise the
/// peer address.
fn client_ip(state: &AppState, headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    if state.config.trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn publish_response(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Form(payload), _): WithRejection<Form<PublishResponseRequest>, APIError>,
) -> Result<Json<ResultBody<PublishResult>>, APIError> {
    let client_ip = client_ip(&state, &headers, peer);
    let published = state
        .service
        .publish_response(&payload.name, &payload.response, &payload.secret, client_ip)
        .await?;
    Ok(Json(ResultBody::new(published.into())))
}

async fn expire_response(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Form(payload), _): WithRejection<Form<NameSecretRequest>, APIError>,
) -> Result<Json<ResultBody<ExpireResult>>, APIError> {
    let client_ip = client_ip(&state, &headers, peer);
    let expired = state
        .service
        .expire_response(&payload.name, &payload.secret, client_ip)
        .await?;
    Ok(Json(ResultBody::new(expired.into())))
}

async fn create_authorization(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Form(payload), _): WithRejection<Form<CreateAuthorizationRequest>, APIError>,
) -> Result<Json<ResultBody<SecretResult>>, APIError> {
    let client_ip = client_ip(&state, &headers, peer);
    let granted = state
        .service
        .create_authorization(
            &payload.name,
            payload.account_secret(),
            payload.suffix_match(),
            client_ip,
        )
        .await?;
    Ok(Json(ResultBody::new(granted.into())))
}

async fn expire_authorization(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Form(payload), _): WithRejection<Form<NameSecretRequest>, APIError>,
) -> Result<Json<ResultBody<SecretResult>>, APIError> {
    let client_ip = client_ip(&state, &headers, peer);
    let renewed = state
        .service
        .renew_authorization(&payload.name, &payload.secret, client_ip)
        .await?;
    Ok(Json(ResultBody::new(renewed.into())))
}

/// Other PowerDNS remote backend calls live under `/dns/` and aren't implemented.
#[allow(clippy::unused_async)]
async fn fallback(uri: Uri) -> impl IntoResponse {
    if uri.path().starts_with("/dns/") {
        (StatusCode::NOT_IMPLEMENTED, Json(json!({"result": false})))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"result": false, "error": "not found"})),
        )
    }
}

async fn lookup(
    State(state): State<AppState>,
    Path((qname, qtype)): Path<(String, String)>,
) -> Result<Json<ResultBody<Vec<LookupRecord>>>, APIError> {
    let zone = state.service.zone().await?;
    let records = zone.answers(&qname, &qtype).map(LookupRecord::from).collect();
    Ok(Json(ResultBody::new(records)))
}
