//! HTTP surface of the exporter.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::exporter::Exporter;

/// Path of the JSON snapshot endpoint.
pub const INVERTER_PATH: &str = "/inverter";

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Builds the exporter routes.
///
/// `telemetry_path` must start with `/` and differ from [`INVERTER_PATH`].
pub fn router(exporter: Arc<Exporter>, telemetry_path: &str) -> Router {
    Router::new()
        .route(telemetry_path, get(metrics))
        .route(INVERTER_PATH, get(inverter))
        .with_state(exporter)
}

async fn metrics(State(exporter): State<Arc<Exporter>>) -> Response {
    match exporter.render() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn inverter(State(exporter): State<Arc<Exporter>>) -> impl IntoResponse {
    Json(exporter.latest())
}

/// Serves `app` on `listen` until `cancel` fires.
pub async fn serve(listen: &str, app: Router, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|source| Error::Bind {
            address: listen.to_owned(),
            source,
        })?;

    tracing::info!("exporter listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
