use crate::{
    AssemblyStats, Board, CategorySource, GameConfig, HttpCategorySource, RevealError,
    RevealState, Session, SessionStatus, SourceConfig, row_display_value,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedSession<S> = Arc<Session<S>>;

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub game: GameConfig,
    pub source: SourceConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            game: GameConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid game config: {0}")]
    Config(#[from] crate::ConfigError),
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let source = HttpCategorySource::new(&config.source)?;
    let session = Arc::new(Session::new(source, config.game.clone())?);
    spawn_assembly(Arc::clone(&session), false);
    let router = build_router(session);
    info!(
        %config.addr,
        api = %config.source.base_url,
        categories = config.game.num_categories,
        clues = config.game.clues_per_category,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

/// Runs `start()` or `restart()` in the background; a newer call supersedes it.
fn spawn_assembly<S>(session: SharedSession<S>, restart: bool)
where
    S: CategorySource + 'static,
{
    tokio::spawn(async move {
        let result = if restart {
            session.restart().await
        } else {
            session.start().await
        };
        if let Err(err) = result {
            warn!(error = %err, "background assembly ended without a board");
        }
    });
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<RevealError> for ApiError {
    fn from(err: RevealError) -> Self {
        match err {
            RevealError::OutOfBounds { .. } => Self::not_found(err.to_string()),
            RevealError::InvalidTransition { .. } | RevealError::NoBoard => {
                Self::conflict(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router<S>(session: SharedSession<S>) -> Router
where
    S: CategorySource + 'static,
{
    Router::new()
        .route("/api/board", get(api_board::<S>))
        .route("/api/status", get(api_status::<S>))
        .route("/api/restart", post(api_restart::<S>))
        .route("/api/board/:category/:row/reveal", post(api_reveal::<S>))
        .route("/healthz", get(health))
        .with_state(session)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "jeopardy-web" }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusPayload {
    status: SessionStatus,
    stats: Option<AssemblyStats>,
}

async fn api_status<S: CategorySource + 'static>(
    State(session): State<SharedSession<S>>,
) -> Json<StatusPayload> {
    Json(StatusPayload {
        status: session.status(),
        stats: session.stats(),
    })
}

/// A cell as the browser may see it: faces stay withheld until revealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellPayload {
    row: usize,
    value: u32,
    state: RevealState,
    question: Option<String>,
    answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnPayload {
    id: u32,
    title: String,
    clues: Vec<CellPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoardPayload {
    categories: Vec<ColumnPayload>,
}

impl BoardPayload {
    fn from_board(board: &Board, max_value: u32) -> Self {
        let rows = board.rows();
        let categories = board
            .categories()
            .iter()
            .map(|category| ColumnPayload {
                id: category.id,
                title: category.title.clone(),
                clues: category
                    .clues
                    .iter()
                    .enumerate()
                    .map(|(row, clue)| {
                        let state = clue.reveal_state();
                        CellPayload {
                            row,
                            value: row_display_value(row, rows, max_value),
                            state,
                            question: (state != RevealState::Hidden)
                                .then(|| clue.question.clone()),
                            answer: (state == RevealState::Answer).then(|| clue.answer.clone()),
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { categories }
    }
}

async fn api_board<S: CategorySource + 'static>(
    State(session): State<SharedSession<S>>,
) -> Result<Json<BoardPayload>, ApiError> {
    let board = session
        .board()
        .ok_or_else(|| ApiError::conflict(format!("board not ready: {:?}", session.status())))?;
    Ok(Json(BoardPayload::from_board(
        &board,
        session.config().max_clue_value,
    )))
}

async fn api_restart<S: CategorySource + 'static>(
    State(session): State<SharedSession<S>>,
) -> impl IntoResponse {
    spawn_assembly(Arc::clone(&session), true);
    (StatusCode::ACCEPTED, Json(json!({ "status": "loading" })))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RevealPayload {
    category: usize,
    row: usize,
    state: RevealState,
    question: Option<String>,
    answer: Option<String>,
}

async fn api_reveal<S: CategorySource + 'static>(
    State(session): State<SharedSession<S>>,
    Path((category, row)): Path<(usize, usize)>,
) -> Result<Json<RevealPayload>, ApiError> {
    let clue = session.reveal(category, row)?;
    let state = clue.reveal_state();
    Ok(Json(RevealPayload {
        category,
        row,
        state,
        question: Some(clue.question),
        answer: (state == RevealState::Answer).then_some(clue.answer),
    }))
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::fetch::scripted::ScriptedSource;
    use axum::{body, body::Body, http::Request};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_session() -> SharedSession<ScriptedSource> {
        let config = GameConfig {
            seed: Some(5),
            ..GameConfig::default()
        };
        Arc::new(Session::new(ScriptedSource::valid(5), config).unwrap())
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn board_is_conflict_until_ready() {
        let router = build_router(test_session());
        let response = router
            .oneshot(Request::get("/api/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn board_hides_unrevealed_faces() {
        let session = test_session();
        session.start().await.unwrap();
        let router = build_router(session);
        let response = router
            .oneshot(Request::get("/api/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload: BoardPayload = json_body(response).await;
        assert_eq!(payload.categories.len(), 6);
        let values: Vec<u32> = payload.categories[0].clues.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![200, 400, 600, 800, 1000]);
        assert!(
            payload
                .categories
                .iter()
                .flat_map(|c| c.clues.iter())
                .all(|cell| cell.question.is_none() && cell.answer.is_none())
        );
    }

    #[tokio::test]
    async fn reveal_advances_then_conflicts() {
        let session = test_session();
        session.start().await.unwrap();
        let router = build_router(Arc::clone(&session));

        let reveal = || {
            Request::post("/api/board/1/2/reveal")
                .body(Body::empty())
                .unwrap()
        };
        let first: RevealPayload = json_body(router.clone().oneshot(reveal()).await.unwrap()).await;
        assert_eq!(first.state, RevealState::Question);
        assert!(first.question.is_some());
        assert!(first.answer.is_none());

        let second: RevealPayload =
            json_body(router.clone().oneshot(reveal()).await.unwrap()).await;
        assert_eq!(second.state, RevealState::Answer);
        let board = session.board().unwrap();
        let clue = board.clue(1, 2).unwrap();
        assert_eq!(second.question.as_deref(), Some(clue.question.as_str()));
        assert_eq!(second.answer.as_deref(), Some(clue.answer.as_str()));

        let third = router.clone().oneshot(reveal()).await.unwrap();
        assert_eq!(third.status(), StatusCode::CONFLICT);

        let missing = router
            .oneshot(
                Request::post("/api/board/9/0/reveal")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn restart_rebuilds_in_background() {
        let session = test_session();
        session.start().await.unwrap();
        session.reveal(0, 0).unwrap();
        let router = build_router(Arc::clone(&session));

        let response = router
            .oneshot(Request::post("/api/restart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let rebuilt = |session: &Session<ScriptedSource>| {
            session.board().is_some_and(|board| {
                board.clue(0, 0).map(|c| c.reveal_state()) == Some(RevealState::Hidden)
            })
        };
        for _ in 0..100 {
            if rebuilt(session.as_ref()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(rebuilt(session.as_ref()));
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.stats().unwrap().accepted, 6);
    }

    #[tokio::test]
    async fn status_reports_stats() {
        let session = test_session();
        session.start().await.unwrap();
        let router = build_router(session);
        let response = router
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let payload: StatusPayload = json_body(response).await;
        assert_eq!(payload.status, SessionStatus::Ready);
        assert_eq!(payload.stats.unwrap().attempts, 6);
    }
}
