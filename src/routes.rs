//! HTTP routes for appending, listing, fetching and validating audit blocks.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::error::{ApiError, LedgerError};
use crate::ledger::ChainReport;
use crate::model::{Block, BlockEntry, FoldedObject};
use crate::AppState;

/// A third party's claim that the block stored under `hash` recorded the
/// event in `create_message`. Keys match in any casing, like [`BlockEntry`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationRequest {
    pub create_message: BlockEntry,
    pub hash: String,
}

impl<'de> Deserialize<'de> for ValidationRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = FoldedObject::from_deserializer(deserializer)?;
        Self::from_folded(&mut fields).map_err(de::Error::custom)
    }
}

impl ValidationRequest {
    fn from_folded(fields: &mut FoldedObject) -> Result<Self, serde_json::Error> {
        Ok(ValidationRequest {
            create_message: fields.take("createmessage")?,
            hash: fields.take("hash")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationResponse {
    pub validation_message: ValidationRequest,
    pub result: bool,
}

/// Wire every route onto `state`, with tracing, a request timeout and a body
/// size limit taken from `config`.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(list_blocks))
        .route("/block", post(add_block))
        .route("/block/:hash", get(get_block))
        .route("/validation", post(validate_event))
        .route("/verify", get(verify_chain))
        .route("/health", get(health))
        .route("/version", get(version))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Request bodies are decoded from raw bytes so a missing or odd
/// `Content-Type` header does not matter. Only the first JSON value is read;
/// anything after it is ignored.
fn decode<T: de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let first = serde_json::Deserializer::from_slice(body)
        .into_iter::<T>()
        .next()
        .unwrap_or_else(|| Err(de::Error::custom("empty request body")));
    first.map_err(|e| {
        tracing::warn!(error = %e, "malformed request body");
        ApiError::BadRequest(e.to_string())
    })
}

/// GET /
pub async fn list_blocks(State(state): State<AppState>) -> Result<Json<Vec<Block>>, ApiError> {
    Ok(Json(state.ledger.snapshot()?))
}

/// GET /block/:hash — `null` when the digest is unknown.
pub async fn get_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Option<Block>>, ApiError> {
    Ok(Json(state.ledger.get(&hash)?))
}

/// POST /block
pub async fn add_block(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    let entry: BlockEntry = decode(&body)?;
    if entry.event.is_empty() {
        tracing::warn!("rejected block with empty event");
        return Err(ApiError::Rejected {
            reason: LedgerError::EmptyEvent.to_string(),
            request: Box::new(entry),
        });
    }

    let block = state.ledger.append(entry)?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// POST /validation — 201 when the claim holds, 400 otherwise. The claim is
/// echoed back either way.
pub async fn validate_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ValidationResponse>), ApiError> {
    let claim: ValidationRequest = decode(&body)?;
    let result = state
        .ledger
        .validate_event(&claim.hash, &claim.create_message.event)?;

    tracing::info!(hash = %claim.hash, result, "validation requested");

    let status = if result {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((
        status,
        Json(ValidationResponse {
            validation_message: claim,
            result,
        }),
    ))
}

/// GET /verify — re-check every link and digest in the chain.
pub async fn verify_chain(State(state): State<AppState>) -> Result<Json<ChainReport>, ApiError> {
    let report = state.ledger.verify()?;
    if !report.ok {
        tracing::error!(errors = ?report.errors, "chain verification failed");
    }
    Ok(Json(report))
}

/// GET /health — liveness plus the current chain length and tip.
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub blocks: u64,
    pub tip: Option<String>,
}
pub async fn health(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    let tip = state.ledger.tip()?;
    Ok(Json(Health {
        status: "ok",
        blocks: tip.as_ref().map_or(0, |b| b.index + 1),
        tip: tip.map(|b| b.hash),
    }))
}

/// GET /version
#[derive(Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}
pub async fn version() -> Json<BuildInfo> {
    Json(BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}
