// POS Account Hierarchy - API Server
// Read-only JSON API over the account tree; imports and review
// resolutions happen through the CLI

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use pos_hierarchy::db::{
    count_decisions_by_status, count_records, load_aliases, load_decisions_by_status, load_tree,
    setup_database,
};
use pos_hierarchy::{
    AccountNode, AccountTree, AliasBook, Classifier, DecisionStatus, MatchCandidate, Settings,
};

const MAX_BATCH: usize = 20;

/// Everything a handler needs, behind one lock
struct ServerState {
    conn: Connection,
    tree: AccountTree,
    aliases: AliasBook,
    classifier: Classifier,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<ServerState>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: &str) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.to_string()),
        }
    }
}

/// One ranked match, with the node's full path resolved
#[derive(Serialize, Clone)]
struct CandidateResponse {
    node_id: String,
    name: String,
    path: String,
    matched_text: String,
    score: f64,
    kind: String,
    confidence: String,
}

impl CandidateResponse {
    fn from_candidate(candidate: &MatchCandidate, tree: &AccountTree) -> Self {
        let path = tree
            .get(&candidate.node_id)
            .map(|n| tree.path_string(n))
            .unwrap_or_else(|| candidate.node_name.clone());

        Self {
            node_id: candidate.node_id.clone(),
            name: candidate.node_name.clone(),
            path,
            matched_text: candidate.matched_text.clone(),
            score: candidate.score,
            kind: candidate.kind.as_str().to_string(),
            confidence: candidate.confidence.as_str().to_string(),
        }
    }
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    best: Option<CandidateResponse>,
    candidates: Vec<CandidateResponse>,
    total: usize,
    high_confidence: bool,
}

#[derive(Deserialize)]
struct BatchSearchRequest {
    names: Vec<String>,
}

#[derive(Serialize)]
struct AccountResponse {
    id: String,
    name: String,
    parent_id: Option<String>,
    path: String,
    depth: usize,
    record_count: u64,
    total_revenue: f64,
    rolled_up_records: u64,
    rolled_up_revenue: f64,
}

impl AccountResponse {
    fn from_node(node: &AccountNode, tree: &AccountTree) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            parent_id: node.parent_id.clone(),
            path: tree.path_string(node),
            depth: tree.depth(node),
            record_count: node.record_count,
            total_revenue: node.total_revenue,
            rolled_up_records: tree.rolled_up_records(&node.id),
            rolled_up_revenue: tree.rolled_up_revenue(&node.id),
        }
    }
}

#[derive(Serialize)]
struct AccountDetailResponse {
    account: AccountResponse,
    children: Vec<AccountResponse>,
}

#[derive(Serialize)]
struct ReviewItemResponse {
    decision_id: String,
    raw_name: String,
    score: f64,
    source_file: String,
    line_number: usize,
    decided_at: String,
    suggestions: Vec<CandidateResponse>,
}

#[derive(Serialize)]
struct StatsResponse {
    accounts: usize,
    aliases: usize,
    records: i64,
    auto_accepted: i64,
    pending_review: i64,
    rejected: i64,
    unclassified_accounts: usize,
    total_records_attached: u64,
    total_revenue: f64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
/// Deliberately NOT wrapped in ApiResponse: clients read the bare
/// status field and fall back to "Disconnected" on anything else
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let state = state.inner.lock().unwrap();
    let pending = count_decisions_by_status(&state.conn, DecisionStatus::PendingReview).unwrap_or(0);

    Json(serde_json::json!({
        "status": "ok",
        "accounts": state.tree.len(),
        "pending_reviews": pending,
    }))
}

fn build_search_response(state: &ServerState, query: &str) -> SearchResponse {
    let candidates = state
        .classifier
        .search(query, &state.tree, &state.aliases);
    let high_confidence = candidates
        .first()
        .map(|c| c.score >= state.classifier.auto_accept_threshold)
        .unwrap_or(false);

    let mapped: Vec<CandidateResponse> = candidates
        .iter()
        .map(|c| CandidateResponse::from_candidate(c, &state.tree))
        .collect();

    SearchResponse {
        query: query.to_string(),
        best: mapped.first().cloned(),
        total: mapped.len(),
        candidates: mapped,
        high_confidence,
    }
}

/// GET /api/search/:name - Rank matching accounts for one customer name
async fn search_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    // Decode URL-encoded name
    let decoded = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    let state = state.inner.lock().unwrap();
    let response = build_search_response(&state, &decoded);

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// POST /api/search/batch - Rank matches for up to MAX_BATCH names at once
async fn search_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchSearchRequest>,
) -> impl IntoResponse {
    if request.names.len() > MAX_BATCH {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(&format!(
                "Batch is limited to {} names, got {}",
                MAX_BATCH,
                request.names.len()
            ))),
        )
            .into_response();
    }

    let state = state.inner.lock().unwrap();
    let results: Vec<SearchResponse> = request
        .names
        .iter()
        .map(|name| build_search_response(&state, name))
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(results))).into_response()
}

/// GET /api/accounts - The whole hierarchy, parents before children
async fn list_accounts(State(state): State<AppState>) -> impl IntoResponse {
    let state = state.inner.lock().unwrap();

    let accounts: Vec<AccountResponse> = state
        .tree
        .all_nodes()
        .iter()
        .map(|node| AccountResponse::from_node(node, &state.tree))
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(accounts))).into_response()
}

/// GET /api/accounts/:id - One account with its children and roll-ups
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let state = state.inner.lock().unwrap();

    match state.tree.get(&id) {
        Some(node) => {
            let detail = AccountDetailResponse {
                account: AccountResponse::from_node(node, &state.tree),
                children: state
                    .tree
                    .children(&id)
                    .iter()
                    .map(|child| AccountResponse::from_node(child, &state.tree))
                    .collect(),
            };
            (StatusCode::OK, Json(ApiResponse::ok(detail))).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(&format!("Account not found: {}", id))),
        )
            .into_response(),
    }
}

/// GET /api/review - Pending classifications with fresh suggestions
async fn list_reviews(State(state): State<AppState>) -> impl IntoResponse {
    let state = state.inner.lock().unwrap();

    match load_decisions_by_status(&state.conn, DecisionStatus::PendingReview) {
        Ok(pending) => {
            let items: Vec<ReviewItemResponse> = pending
                .iter()
                .map(|decision| {
                    let suggestions = state
                        .classifier
                        .search(&decision.raw_name, &state.tree, &state.aliases)
                        .iter()
                        .map(|c| CandidateResponse::from_candidate(c, &state.tree))
                        .collect();

                    ReviewItemResponse {
                        decision_id: decision.id.clone(),
                        raw_name: decision.raw_name.clone(),
                        score: decision.score,
                        source_file: decision.source_file.clone(),
                        line_number: decision.line_number,
                        decided_at: decision.decided_at.to_rfc3339(),
                        suggestions,
                    }
                })
                .collect();

            (StatusCode::OK, Json(ApiResponse::ok(items))).into_response()
        }
        Err(e) => {
            eprintln!("Error loading review queue: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Failed to load review queue")),
            )
                .into_response()
        }
    }
}

fn collect_stats(state: &ServerState) -> Result<StatsResponse> {
    let tree = &state.tree;

    Ok(StatsResponse {
        accounts: tree.len(),
        aliases: state.aliases.len(),
        records: count_records(&state.conn)?,
        auto_accepted: count_decisions_by_status(&state.conn, DecisionStatus::AutoAccepted)?,
        pending_review: count_decisions_by_status(&state.conn, DecisionStatus::PendingReview)?,
        rejected: count_decisions_by_status(&state.conn, DecisionStatus::Rejected)?,
        unclassified_accounts: tree.children(tree.unclassified_id()).len(),
        total_records_attached: tree.rolled_up_records(tree.root_id()),
        total_revenue: tree.rolled_up_revenue(tree.root_id()),
    })
}

/// GET /api/stats - Classification and hierarchy totals
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let state = state.inner.lock().unwrap();

    match collect_stats(&state) {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::ok(stats))).into_response(),
        Err(e) => {
            eprintln!("Error collecting stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("Failed to collect stats")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 POS Account Hierarchy - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let settings = Settings::from_env();

    if !settings.db_path.exists() {
        println!(
            "⚠️  No database at {}; starting with an empty hierarchy",
            settings.db_path.display()
        );
        println!("   Run `pos-hierarchy seed` or `pos-hierarchy import <file>` to fill it");
    }

    let conn = Connection::open(&settings.db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to set up schema");
    let tree = load_tree(&conn).expect("Failed to load account tree");
    let aliases = load_aliases(&conn).expect("Failed to load aliases");
    println!("✓ Database opened: {}", settings.db_path.display());
    println!("✓ {} accounts, {} aliases", tree.len(), aliases.len());

    let classifier = Classifier::from_settings(&settings);

    let state = AppState {
        inner: Arc::new(Mutex::new(ServerState {
            conn,
            tree,
            aliases,
            classifier,
        })),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/search/:name", get(search_account))
        .route("/search/batch", post(search_batch))
        .route("/accounts", get(list_accounts))
        .route("/accounts/:id", get(get_account))
        .route("/review", get(list_reviews))
        .route("/stats", get(get_stats))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = settings.server_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   Health: http://{}/api/health", addr);
    println!("   Search: http://{}/api/search/<name>", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
