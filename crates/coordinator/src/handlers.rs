//! HTTP surface of the NodeSet directory mock
//!
//! ## API endpoints (served under `/api/` and `/api/dev/`)
//!
//! | Endpoint | Method | Auth | Description |
//! |----------|--------|------|-------------|
//! | `nonce` | GET | - | Start a session |
//! | `login` | POST | Bearer | Log a session in with a signed nonce |
//! | `node-address` | POST | - | Register a whitelisted node |
//! | `deposit-data` | GET | logged in | Latest deposit data set of a vault |
//! | `deposit-data` | POST | logged in | Upload deposit data |
//! | `deposit-data/meta` | GET | logged in | Version of the latest set |
//! | `validators` | GET | logged in | Validator statuses of the node |
//! | `validators` | PATCH | logged in | Upload signed exits |
//!
//! ## Admin endpoints (`/admin/`, GET with query parameters)
//!
//! | Endpoint | Parameters |
//! |----------|------------|
//! | `add-user` | `email` |
//! | `whitelist-node` | `email`, `address` |
//! | `add-vault` | `address`, `network` |
//! | `snapshot` | `name` |
//! | `revert` | `name` |
//! | `cycle-set` | `vault`, `network`, `user-limit` |
//!
//! Bodies are read as raw bytes and decoded here, so malformed JSON is
//! answered with the regular error envelope.

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use nsmock_common::api::{routes, AUTHORIZATION_HEADER, BEARER_SCHEME};
use nsmock_common::crypto::decode_signature;
use nsmock_common::{
    Address, DepositDataData, DepositDataMetaData, ExitData, ExtendedDepositData, LoginData,
    LoginRequest, NodeSetResponse, NonceData, RegisterNodeRequest, ValidatorsData,
};

use crate::error::DirectoryError;
use crate::manager::NodeSetManager;

// ════════════════════════════════════════════════════════════════════════════
// STATE
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    pub manager: Arc<NodeSetManager>,
}

impl AppState {
    pub fn new(manager: Arc<NodeSetManager>) -> Self {
        Self { manager }
    }
}

type ApiResponse = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, DirectoryError>;
type Params = Query<HashMap<String, String>>;

// ════════════════════════════════════════════════════════════════════════════
// ROUTER
// ════════════════════════════════════════════════════════════════════════════

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest(routes::API_PREFIX, api_routes())
        .nest(routes::DEV_PREFIX, api_routes())
        .nest(routes::ADMIN_PREFIX, admin_routes())
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

fn path(segment: &str) -> String {
    format!("/{}", segment)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&path(routes::NONCE), get(get_nonce))
        .route(&path(routes::LOGIN), post(login))
        .route(&path(routes::NODE_ADDRESS), post(register_node))
        .route(
            &path(routes::DEPOSIT_DATA),
            get(get_deposit_data).post(upload_deposit_data),
        )
        .route(&path(routes::DEPOSIT_DATA_META), get(deposit_data_meta))
        .route(
            &path(routes::VALIDATORS),
            get(get_validators).patch(upload_signed_exits),
        )
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&path(routes::ADMIN_ADD_USER), get(add_user))
        .route(&path(routes::ADMIN_WHITELIST_NODE), get(whitelist_node))
        .route(&path(routes::ADMIN_ADD_VAULT), get(add_vault))
        .route(&path(routes::ADMIN_SNAPSHOT), get(snapshot))
        .route(&path(routes::ADMIN_REVERT), get(revert))
        .route(&path(routes::ADMIN_CYCLE_SET), get(cycle_set))
}

/// Logs every request and the status it was answered with.
async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri_path = req.uri().path().to_string();
    info!(method = %method, path = %uri_path, "New request");

    let response = next.run(req).await;
    let status = response.status();
    if status.is_success() {
        info!(status = %status, "Responded");
    } else if status.is_server_error() {
        error!(status = %status, "Responded");
    } else {
        warn!(status = %status, "Responded");
    }
    response
}

// ════════════════════════════════════════════════════════════════════════════
// ENVELOPE HELPERS
// ════════════════════════════════════════════════════════════════════════════

fn failure(err: &DirectoryError) -> ApiResponse {
    let body = NodeSetResponse::<()>::failure(err.error_key(), err.to_string());
    (
        err.status_code(),
        Json(serde_json::to_value(body).unwrap_or_else(|_| json!({ "ok": false }))),
    )
}

fn respond<T: Serialize>(result: Result<T, DirectoryError>) -> ApiResponse {
    match result {
        Ok(data) => match serde_json::to_value(NodeSetResponse::success(data)) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "message": format!("error serializing response: {}", e) })),
            ),
        },
        Err(err) => failure(&err),
    }
}

fn respond_message(result: Result<(), DirectoryError>, message: &str) -> ApiResponse {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(
                serde_json::to_value(NodeSetResponse::<()>::success_message(message))
                    .unwrap_or_else(|_| json!({ "ok": true })),
            ),
        ),
        Err(err) => failure(&err),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// INPUT HELPERS
// ════════════════════════════════════════════════════════════════════════════

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, DirectoryError> {
    let value = headers
        .get(AUTHORIZATION_HEADER)
        .ok_or(DirectoryError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| DirectoryError::InvalidAuthHeader)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme == BEARER_SCHEME && !token.is_empty() => {
            Ok(token.to_string())
        }
        _ => Err(DirectoryError::InvalidAuthHeader),
    }
}

fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, DirectoryError> {
    serde_json::from_slice(body).map_err(|e| {
        DirectoryError::InvalidInput(format!("error deserializing request body: {}", e))
    })
}

fn required<'a>(params: &'a HashMap<String, String>, key: &str) -> Result<&'a str, DirectoryError> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DirectoryError::InvalidInput(format!("missing query arg: {}", key)))
}

fn parse_address(value: &str, field: &str) -> Result<Address, DirectoryError> {
    Address::from_hex(value)
        .map_err(|e| DirectoryError::InvalidInput(format!("invalid {} [{}]: {}", field, value, e)))
}

fn parse_signature(value: &str) -> Result<Vec<u8>, DirectoryError> {
    decode_signature(value).map_err(|_| DirectoryError::InvalidInput("invalid signature".to_string()))
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Address, DirectoryError> {
    let token = bearer_token(headers)?;
    state.manager.authenticate(&token)
}

// ════════════════════════════════════════════════════════════════════════════
// API HANDLERS
// ════════════════════════════════════════════════════════════════════════════

async fn get_nonce(State(state): State<Arc<AppState>>) -> ApiResponse {
    let session = state.manager.create_session();
    info!(nonce = %session.nonce, "Created session");
    respond(Ok(NonceData {
        nonce: session.nonce,
        token: session.token,
    }))
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    respond((|| -> ApiResult<_> {
        let request: LoginRequest = decode_body(&body)?;
        let token = bearer_token(&headers)?;
        let address = parse_address(&request.address, "address")?;
        let signature = parse_signature(&request.signature)?;
        let token = state
            .manager
            .login(&token, &request.nonce, address, &signature)?;
        Ok(LoginData { token })
    })())
}

async fn register_node(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResponse {
    respond_message(
        (|| -> ApiResult<_> {
            let request: RegisterNodeRequest = decode_body(&body)?;
            let address = parse_address(&request.node_address, "node address")?;
            let signature = parse_signature(&request.signature)?;
            state
                .manager
                .register_node(&request.email, address, &signature)
        })(),
        "node registered",
    )
}

async fn upload_deposit_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    respond_message(
        (|| -> ApiResult<_> {
            let node = authenticate(&state, &headers)?;
            let data: Vec<ExtendedDepositData> = decode_body(&body)?;
            state.manager.handle_deposit_data_upload(&node, &data)
        })(),
        "deposit data uploaded",
    )
}

async fn get_deposit_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> ApiResponse {
    respond((|| -> ApiResult<_> {
        authenticate(&state, &headers)?;
        let network = required(&params, "network")?;
        let vault = parse_address(required(&params, "vault")?, "vault")?;
        let (version, deposit_data) = state.manager.deposit_data_set(&vault, network)?;
        Ok(DepositDataData {
            version,
            deposit_data,
        })
    })())
}

async fn deposit_data_meta(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> ApiResponse {
    respond((|| -> ApiResult<_> {
        authenticate(&state, &headers)?;
        let network = required(&params, "network")?;
        let vault = parse_address(required(&params, "vault")?, "vault")?;
        let version = state.manager.deposit_data_version(&vault, network)?;
        Ok(DepositDataMetaData { version })
    })())
}

async fn get_validators(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> ApiResponse {
    respond((|| -> ApiResult<_> {
        let node = authenticate(&state, &headers)?;
        let network = required(&params, "network")?;
        let validators = state.manager.validator_statuses(&node, network)?;
        Ok(ValidatorsData { validators })
    })())
}

async fn upload_signed_exits(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
    body: Bytes,
) -> ApiResponse {
    respond_message(
        (|| -> ApiResult<_> {
            let node = authenticate(&state, &headers)?;
            let network = required(&params, "network")?;
            let exits: Vec<ExitData> = decode_body(&body)?;
            state.manager.handle_signed_exit_upload(&node, network, &exits)
        })(),
        "signed exits uploaded",
    )
}

// ════════════════════════════════════════════════════════════════════════════
// ADMIN HANDLERS
// ════════════════════════════════════════════════════════════════════════════

async fn add_user(State(state): State<Arc<AppState>>, Query(params): Params) -> ApiResponse {
    respond_message(
        required(&params, "email").and_then(|email| state.manager.add_user(email)),
        "user added",
    )
}

async fn whitelist_node(State(state): State<Arc<AppState>>, Query(params): Params) -> ApiResponse {
    respond_message(
        (|| -> ApiResult<_> {
            let email = required(&params, "email")?;
            let address = parse_address(required(&params, "address")?, "address")?;
            state.manager.whitelist_node(email, address)
        })(),
        "node whitelisted",
    )
}

async fn add_vault(State(state): State<Arc<AppState>>, Query(params): Params) -> ApiResponse {
    respond_message(
        (|| -> ApiResult<_> {
            let address = parse_address(required(&params, "address")?, "address")?;
            let network = required(&params, "network")?;
            state.manager.add_stakewise_vault(address, network)
        })(),
        "vault added",
    )
}

async fn snapshot(State(state): State<Arc<AppState>>, Query(params): Params) -> ApiResponse {
    respond_message(
        required(&params, "name").map(|name| state.manager.take_snapshot(name)),
        "snapshot taken",
    )
}

async fn revert(State(state): State<Arc<AppState>>, Query(params): Params) -> ApiResponse {
    respond_message(
        required(&params, "name").and_then(|name| state.manager.revert_to_snapshot(name)),
        "reverted to snapshot",
    )
}

async fn cycle_set(State(state): State<Arc<AppState>>, Query(params): Params) -> ApiResponse {
    respond((|| -> ApiResult<_> {
        let vault = parse_address(required(&params, "vault")?, "vault")?;
        let network = required(&params, "network")?;
        let raw_limit = required(&params, "user-limit")?;
        let limit: usize = raw_limit.parse().map_err(|_| {
            DirectoryError::InvalidInput(format!("invalid user-limit [{}]", raw_limit))
        })?;
        let version = state.manager.cycle_deposit_data_set(&vault, network, limit)?;
        Ok(DepositDataMetaData { version })
    })())
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
