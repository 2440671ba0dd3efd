//! Axum router and HTTP handlers.
//!
//! Thin translation layer: every handler parses the request, calls one
//! [`NodeApi`] method, and wraps the outcome in the `{success, msg}`
//! envelope peers and wallets expect.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use sudokoin_core::records::{BlockRecord, TxRecord};

use crate::api::NodeApi;

pub fn router(api: Arc<NodeApi>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chain/mine", post(mine))
        .route("/chain/template", get(template))
        .route("/chain/add_block", post(add_block))
        .route("/chain/tx_create", post(tx_create))
        .route("/chain/transaction", post(transaction))
        .route("/chain/sync", get(sync))
        .route("/chain/head", get(head))
        .route("/chain/status", get(status))
        .route("/chain/get_amount", get(get_amount))
        .route("/chain/get_unspent_tx", get(get_unspent))
        .route("/chain/wallet", post(create_wallet))
        .with_state(api)
        .layer(cors)
}

#[derive(Deserialize)]
struct MineRequest {
    block: BlockRecord,
    /// Solution override; falls back to the one inside the block record.
    puzzle_solution: Option<String>,
}

/// `POST /chain/mine` — submit a solved candidate block.
async fn mine(State(api): State<Arc<NodeApi>>, Json(req): Json<MineRequest>) -> impl IntoResponse {
    let solution = req
        .puzzle_solution
        .clone()
        .unwrap_or_else(|| req.block.puzzle_solution.clone());
    let result = api.submit_solution(&req.block, &solution);
    let code = if result.accepted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (
        code,
        Json(json!({
            "success": result.accepted,
            "block_hash": result.block_hash,
            "msg": result.reason,
        })),
    )
}

#[derive(Deserialize)]
struct TemplateQuery {
    address: String,
}

/// `GET /chain/template?address=<b64 pubkey>` — candidate block + puzzle.
async fn template(
    State(api): State<Arc<NodeApi>>,
    Query(query): Query<TemplateQuery>,
) -> impl IntoResponse {
    match api.force_block(query.address.trim()) {
        Ok(job) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "block": job.block,
                "puzzle": job.puzzle,
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "msg": e.to_string()})),
        ),
    }
}

/// `POST /chain/add_block` — block ingress from a peer.
async fn add_block(
    State(api): State<Arc<NodeApi>>,
    Json(record): Json<BlockRecord>,
) -> impl IntoResponse {
    let result = api.add_block(&record);
    let code = if result.accepted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (
        code,
        Json(json!({
            "success": result.accepted,
            "reorg": result.reorg,
            "msg": result.reason,
        })),
    )
}

/// `POST /chain/tx_create` — transaction ingress from a peer.
async fn tx_create(
    State(api): State<Arc<NodeApi>>,
    Json(record): Json<TxRecord>,
) -> impl IntoResponse {
    let result = api.add_tx(&record);
    let code = if result.accepted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (
        code,
        Json(json!({"success": result.accepted, "msg": result.reason})),
    )
}

#[derive(Deserialize)]
struct PaymentRequest {
    private_key: String,
    address_to: String,
    amount: u64,
    #[serde(default)]
    fee: u64,
}

/// `POST /chain/transaction` — build, sign, and submit a payment.
async fn transaction(
    State(api): State<Arc<NodeApi>>,
    Json(req): Json<PaymentRequest>,
) -> impl IntoResponse {
    let result = api.create_payment(&req.private_key, req.address_to.trim(), req.amount, req.fee);
    let code = if result.accepted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (
        code,
        Json(json!({"success": result.accepted, "msg": result.reason})),
    )
}

#[derive(Deserialize)]
struct SyncQuery {
    from_block: usize,
    #[serde(default = "default_sync_limit")]
    limit: usize,
}

fn default_sync_limit() -> usize {
    20
}

/// `GET /chain/sync?from_block=N&limit=M` — serve a chain slice for sync.
async fn sync(
    State(api): State<Arc<NodeApi>>,
    Query(query): Query<SyncQuery>,
) -> impl IntoResponse {
    Json(api.get_chain(query.from_block, query.limit.min(100)))
}

/// `GET /chain/head` — the head block, or `{}` for an empty chain.
async fn head(State(api): State<Arc<NodeApi>>) -> impl IntoResponse {
    match api.get_head() {
        Some(record) => Json(json!(record)),
        None => Json(json!({})),
    }
}

/// `GET /chain/status` — compact head summary.
async fn status(State(api): State<Arc<NodeApi>>) -> impl IntoResponse {
    Json(api.get_status())
}

#[derive(Deserialize)]
struct AddressQuery {
    address: String,
}

/// `GET /chain/get_amount?address=...` — balance in grains.
async fn get_amount(
    State(api): State<Arc<NodeApi>>,
    Query(query): Query<AddressQuery>,
) -> impl IntoResponse {
    let address = query.address.trim();
    Json(json!({
        "address": address,
        "amount": api.get_user_balance(address),
    }))
}

/// `GET /chain/get_unspent_tx?address=...` — spendable outputs.
async fn get_unspent(
    State(api): State<Arc<NodeApi>>,
    Query(query): Query<AddressQuery>,
) -> impl IntoResponse {
    let address = query.address.trim();
    Json(json!({
        "address": address,
        "tx": api.get_user_unspent(address),
    }))
}

/// `POST /chain/wallet` — generate a key pair. Nothing is stored.
async fn create_wallet() -> impl IntoResponse {
    Json(NodeApi::generate_wallet())
}
