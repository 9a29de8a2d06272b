//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the custody node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                           | Description                        |
//! |--------|--------------------------------|------------------------------------|
//! | GET    | `/health`                      | Liveness probe                     |
//! | GET    | `/status`                      | Node status summary                |
//! | GET    | `/stats`                       | Aggregate ledger counters          |
//! | GET    | `/ws`                          | WebSocket for live vault events    |
//! | POST   | `/faucet`                      | Credit an external balance (devnet)|
//! | GET    | `/accounts/:account`           | External balance and vault flag    |
//! | POST   | `/vaults`                      | Open a vault                       |
//! | GET    | `/vaults/:account`             | Vault state                        |
//! | POST   | `/vaults/:account/deposit`     | Top up a vault                     |
//! | POST   | `/vaults/:account/withdraw`    | Withdraw after unlock              |
//! | POST   | `/vaults/:account/emergency`   | Emergency release with penalty     |
//! | POST   | `/vaults/:account/claim`       | Beneficiary claim after grace      |
//! | PUT    | `/vaults/:account/beneficiary` | Redirect the beneficiary           |
//! | POST   | `/vaults/:account/extend`      | Push the unlock time out           |
//! | GET    | `/vaults/:account/history`     | Full transaction history           |
//! | POST   | `/admin/authorize`             | Owner-only: authorize an account   |
//! | POST   | `/admin/revoke`                | Owner-only: revoke an account      |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vesta_ledger::account::AccountId;
use vesta_ledger::notify::VaultEvent;
use vesta_ledger::treasury::Treasury;
use vesta_ledger::vault::{AccessError, VaultError, VaultRegistry};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Deployment identifier (e.g., "devnet", "prod").
    pub network: String,
    /// Wall-clock instant the node started, for uptime reporting.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// The custody registry. All vault operations go through here.
    pub registry: Arc<VaultRegistry>,
    /// The external funds rail, exposed for the faucet and balance lookups.
    pub treasury: Arc<Treasury>,
    /// Broadcast channel for live vault event notifications.
    pub event_tx: broadcast::Sender<VaultEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured API port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/stats", get(stats_handler))
        .route("/ws", get(ws_handler))
        .route("/faucet", post(faucet_handler))
        .route("/accounts/:account", get(account_handler))
        .route("/vaults", post(create_vault_handler))
        .route("/vaults/:account", get(vault_info_handler))
        .route("/vaults/:account/deposit", post(deposit_handler))
        .route("/vaults/:account/withdraw", post(withdraw_handler))
        .route("/vaults/:account/emergency", post(emergency_handler))
        .route("/vaults/:account/claim", post(claim_handler))
        .route("/vaults/:account/beneficiary", put(update_beneficiary_handler))
        .route("/vaults/:account/extend", post(extend_lock_handler))
        .route("/vaults/:account/history", get(history_handler))
        .route("/admin/authorize", post(authorize_handler))
        .route("/admin/revoke", post(revoke_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Request body for `POST /vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateVaultRequest {
    /// Account opening the vault.
    pub account: String,
    /// Display name for the vault.
    pub name: String,
    /// Lock duration in days.
    pub lock_days: u32,
    /// Optional beneficiary; the owner becomes their own when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary: Option<String>,
    /// Initial deposit in embers.
    pub deposit: u64,
}

/// Request body for deposit and withdrawal endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct AmountRequest {
    /// Embers to move.
    pub amount: u64,
}

/// Request body for `POST /vaults/:account/claim`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// The account claiming; must match the vault's beneficiary.
    pub claimant: String,
}

/// Request body for `PUT /vaults/:account/beneficiary`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BeneficiaryRequest {
    /// The new beneficiary account.
    pub beneficiary: String,
}

/// Request body for `POST /vaults/:account/extend`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtendRequest {
    /// Days to push the unlock time out by.
    pub additional_days: u32,
}

/// Request body for `POST /faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetRequest {
    /// Account to credit.
    pub account: String,
    /// Embers to mint into the external balance.
    pub amount: u64,
}

/// Request body for the owner-only admin endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminRequest {
    /// Who is asking. Must be the registry owner.
    pub caller: String,
    /// The account being authorized or revoked.
    pub account: String,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Deployment identifier.
    pub network: String,
    /// Seconds since the node started.
    pub uptime_secs: i64,
    /// Vaults ever created.
    pub total_vaults: u64,
    /// Currently active vaults.
    pub active_vaults: u64,
    /// Embers locked across all active vaults.
    pub total_locked: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:account`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    /// The account id echoed back.
    pub account: String,
    /// Embers held outside custody, spendable into a vault.
    pub external_balance: u64,
    /// Whether the account has a vault on record, active or drained.
    pub has_vault: bool,
}

/// Response payload for `POST /vaults/:account/deposit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// The vault owner.
    pub account: String,
    /// The vault balance after the operation.
    pub balance: u64,
}

/// Response payload for `POST /vaults/:account/claim`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Who received the funds.
    pub claimant: String,
    /// Whose vault was claimed.
    pub vault_owner: String,
    /// Embers paid out.
    pub amount: u64,
}

/// Response payload for `PUT /vaults/:account/beneficiary`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BeneficiaryResponse {
    /// The vault owner.
    pub account: String,
    /// The beneficiary now on record.
    pub beneficiary: String,
}

/// Response payload for `POST /vaults/:account/extend`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtendResponse {
    /// The vault owner.
    pub account: String,
    /// The unlock time after the extension.
    pub unlock_time: chrono::DateTime<chrono::Utc>,
}

/// Response payload for `POST /faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetResponse {
    /// The credited account.
    pub account: String,
    /// The external balance after the credit.
    pub balance: u64,
}

/// Response payload for the admin endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminResponse {
    /// The affected account.
    pub account: String,
    /// True when the authorized set actually changed.
    pub changed: bool,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Maps a ledger error to the HTTP status it deserves.
///
/// Input problems are 400, unknown accounts 404, state conflicts 409,
/// time and authorization gates 403, and funds-rail refusals 502 since
/// the failure happened downstream of the ledger.
fn vault_error_status(err: &VaultError) -> StatusCode {
    match err {
        VaultError::ZeroAmount
        | VaultError::LockOutOfRange { .. }
        | VaultError::EmptyName
        | VaultError::EmptyBeneficiary => StatusCode::BAD_REQUEST,
        VaultError::UnknownAccount(_) => StatusCode::NOT_FOUND,
        VaultError::AlreadyActive(_)
        | VaultError::VaultInactive(_)
        | VaultError::EmptyVault(_)
        | VaultError::InsufficientBalance { .. }
        | VaultError::Overflow { .. } => StatusCode::CONFLICT,
        VaultError::StillLocked { .. }
        | VaultError::GraceNotElapsed { .. }
        | VaultError::NotBeneficiary { .. } => StatusCode::FORBIDDEN,
        VaultError::Transfer(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Renders a [`VaultError`] as a JSON error response.
fn vault_error_response(err: VaultError) -> Response {
    let status = vault_error_status(&err);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Renders an [`AccessError`] as a JSON error response. Always 403: the
/// only access failure is a non-owner calling an owner-only endpoint.
fn access_error_response(err: AccessError) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not check internal subsystem health; that
/// belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns node status summary with live ledger counters.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.registry.stats();
    let now = chrono::Utc::now();

    let resp = StatusResponse {
        version: state.version.clone(),
        network: state.network.clone(),
        uptime_secs: (now - state.started_at).num_seconds(),
        total_vaults: stats.total_vaults,
        active_vaults: state.registry.active_vaults() as u64,
        total_locked: stats.total_locked,
        timestamp: now.to_rfc3339(),
    };
    Json(resp)
}

/// `GET /stats` — the raw aggregate snapshot, straight off the registry.
async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.stats())
}

/// `GET /ws` — WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`VaultEvent`] messages for every vault
/// lifecycle change. The connection is read-only from the server's
/// perspective; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            // Client disconnected.
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {
                        // Client messages are ignored; this is a push-only channel.
                    }
                    _ => break, // Disconnected or error.
                }
            }
        }
    }
}

/// `POST /faucet` — credits an account's external balance.
///
/// Devnet convenience so demo accounts have something to lock up. A real
/// deployment would replace the treasury with a settlement integration
/// and drop this route.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> impl IntoResponse {
    let account = AccountId::new(req.account);
    match state.treasury.credit_external(&account, req.amount) {
        Ok(balance) => (
            StatusCode::OK,
            Json(FaucetResponse {
                account: account.to_string(),
                balance,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// `GET /accounts/:account` — external balance plus a vault-presence flag.
///
/// Never 404s: an account that has not been seen simply has balance zero
/// and no vault.
async fn account_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    let resp = AccountResponse {
        external_balance: state.treasury.external_balance(&id),
        has_vault: state.registry.vault_info(&id).is_ok(),
        account: id.to_string(),
    };
    Json(resp)
}

/// `POST /vaults` — opens a vault. Returns 201 with the vault state.
async fn create_vault_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateVaultRequest>,
) -> impl IntoResponse {
    let owner = AccountId::new(req.account);
    let beneficiary = req.beneficiary.map(AccountId::new);

    match state
        .registry
        .create_vault(&owner, &req.name, req.lock_days, beneficiary, req.deposit)
    {
        Ok(info) => (StatusCode::CREATED, Json(info)).into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `GET /vaults/:account` — the vault's current state, drained or not.
async fn vault_info_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    match state.registry.vault_info(&id) {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `POST /vaults/:account/deposit` — tops up an active vault.
async fn deposit_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    match state.registry.deposit(&id, req.amount) {
        Ok(balance) => (
            StatusCode::OK,
            Json(BalanceResponse {
                account: id.to_string(),
                balance,
            }),
        )
            .into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `POST /vaults/:account/withdraw` — withdraws from an unlocked vault.
async fn withdraw_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<AmountRequest>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    match state.registry.withdraw(&id, req.amount) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `POST /vaults/:account/emergency` — drains immediately, penalty applied.
async fn emergency_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    match state.registry.emergency_withdraw(&id) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `POST /vaults/:account/claim` — the named beneficiary collects after
/// the grace period.
async fn claim_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> impl IntoResponse {
    let owner = AccountId::new(account);
    let claimant = AccountId::new(req.claimant);

    match state.registry.claim_as_beneficiary(&claimant, &owner) {
        Ok(amount) => (
            StatusCode::OK,
            Json(ClaimResponse {
                claimant: claimant.to_string(),
                vault_owner: owner.to_string(),
                amount,
            }),
        )
            .into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `PUT /vaults/:account/beneficiary` — points the vault at a new
/// beneficiary.
async fn update_beneficiary_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<BeneficiaryRequest>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    let beneficiary = AccountId::new(req.beneficiary);

    match state
        .registry
        .update_beneficiary(&id, beneficiary.clone())
    {
        Ok(()) => (
            StatusCode::OK,
            Json(BeneficiaryResponse {
                account: id.to_string(),
                beneficiary: beneficiary.to_string(),
            }),
        )
            .into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `POST /vaults/:account/extend` — pushes the unlock time further out.
async fn extend_lock_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ExtendRequest>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    match state.registry.extend_lock(&id, req.additional_days) {
        Ok(unlock_time) => (
            StatusCode::OK,
            Json(ExtendResponse {
                account: id.to_string(),
                unlock_time,
            }),
        )
            .into_response(),
        Err(e) => vault_error_response(e),
    }
}

/// `GET /vaults/:account/history` — the full ordered audit history.
///
/// Returns an empty array rather than 404 for accounts with no records,
/// mirroring the registry's own behavior.
async fn history_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let id = AccountId::new(account);
    Json(state.registry.history(&id))
}

/// `POST /admin/authorize` — owner-only; adds to the authorized set.
async fn authorize_handler(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> impl IntoResponse {
    let caller = AccountId::new(req.caller);
    let target = AccountId::new(req.account);

    match state.registry.authorize_account(&caller, target.clone()) {
        Ok(changed) => (
            StatusCode::OK,
            Json(AdminResponse {
                account: target.to_string(),
                changed,
            }),
        )
            .into_response(),
        Err(e) => access_error_response(e),
    }
}

/// `POST /admin/revoke` — owner-only; removes from the authorized set.
async fn revoke_handler(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> impl IntoResponse {
    let caller = AccountId::new(req.caller);
    let target = AccountId::new(req.account);

    match state.registry.revoke_account(&caller, &target) {
        Ok(changed) => (
            StatusCode::OK,
            Json(AdminResponse {
                account: target.to_string(),
                changed,
            }),
        )
            .into_response(),
        Err(e) => access_error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
