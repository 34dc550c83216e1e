use std::net::SocketAddr;
use axum::{Router, routing::get};
use tokio::sync::broadcast::error::RecvError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::store::StoreEvent;
use crate::{assessments, auth, directory, gaps};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1",
              Router::new()
                  .merge(auth::router())
                  .merge(directory::router())
                  .merge(assessments::router())
                  .merge(gaps::router())
                  .route("/health", get(|| async { "ok" }))
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Traces store change notifications until the store goes away.
pub fn spawn_change_logger(state: &AppState) {
    let mut rx = state.store.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StoreEvent::Changed { collection, id, kind }) => {
                    tracing::debug!(table = collection.table(), %id, ?kind, "store changed");
                }
                Ok(StoreEvent::Reloaded) => tracing::debug!("store reloaded"),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "change logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

pub async fn serve(app: Router, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
        .parse()?;

    tracing::info!(remote = state.store.is_remote(), "listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // drain queued remote writes before exiting
    state.store.flush().await;
    Ok(())
}
