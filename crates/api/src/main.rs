use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockbrief_core::domain::{SessionState, TimeFrame};
use stockbrief_core::{SelectionHandler, StockError};

const APP_TITLE: &str = "Stock Analysis Application";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockbrief_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let handler = match SelectionHandler::from_settings(&settings) {
        Ok(handler) => handler,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to configure providers");
            return Err(e);
        }
    };

    let app = router(AppState::new(handler));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// One session per process. Handler runs and reads both take the lock, so a
/// reader only ever sees state between completed selections.
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<SessionState>>,
    handler: Arc<SelectionHandler>,
}

impl AppState {
    fn new(handler: SelectionHandler) -> Self {
        Self {
            session: Arc::new(Mutex::new(SessionState::new())),
            handler: Arc::new(handler),
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/timeframes", get(get_timeframes))
        .route("/state", get(get_state))
        .route("/selection", post(post_selection))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct TimeFrameOption {
    code: TimeFrame,
    label: &'static str,
}

async fn get_timeframes() -> Json<Vec<TimeFrameOption>> {
    Json(
        TimeFrame::ALL
            .into_iter()
            .map(|tf| TimeFrameOption {
                code: tf,
                label: tf.label(),
            })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
struct StateView {
    app_title: &'static str,
    #[serde(flatten)]
    state: SessionState,
}

async fn get_state(State(app): State<AppState>) -> Json<StateView> {
    let session = app.session.lock().await;
    Json(StateView {
        app_title: APP_TITLE,
        state: session.clone(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelectionRequest {
    ticker: String,
    time_frame: String,
}

/// Always 200: the outcome travels in `status_message`.
async fn post_selection(
    State(app): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Json<StateView> {
    let mut session = app.session.lock().await;
    if let Err(err) = app
        .handler
        .handle_selection(&mut session, &req.ticker, &req.time_frame)
        .await
    {
        report(&err);
    }

    Json(StateView {
        app_title: APP_TITLE,
        state: session.clone(),
    })
}

fn report(err: &StockError) {
    match err {
        StockError::Upstream { .. } => {
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
            tracing::error!(kind = err.kind(), error = %err, "selection failed");
        }
        StockError::Validation(_) | StockError::DataUnavailable { .. } => {
            tracing::info!(kind = err.kind(), error = %err, "selection rejected");
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockbrief_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
