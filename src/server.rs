use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use log::{error, info};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::clients::{
    LocalStorage,
    entities::SongRecord,
    errors::{Error, Result},
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<LocalStorage>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Query path failure, rendered as a non-2xx JSON body
pub struct ApiError(pub Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(storage: Arc<LocalStorage>) -> Router {
    Router::new()
        .route("/billboard", get(billboard))
        .with_state(AppState { storage })
}

async fn billboard(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<SongRecord>>, ApiError> {
    match state.storage.list_songs().await {
        Ok(songs) => Ok(Json(songs)),
        Err(e) => {
            error!("Failed to read songs: {e}");
            Err(ApiError(e))
        }
    }
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind {addr}: {e}")))
}

pub async fn serve(listener: TcpListener, storage: Arc<LocalStorage>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server starting on {addr} and route /billboard");
    }
    axum::serve(listener, router(storage))
        .await
        .map_err(|e| Error::Server(format!("HTTP server stopped: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_service_unavailable() {
        let response =
            ApiError(Error::StoreUnavailable("database is locked".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn unreadable_store_answers_503_with_error_body() {
        let storage = LocalStorage::in_memory().await.unwrap();
        // a songs table without the record column makes every scan fail
        storage
            .execute_batch("CREATE TABLE songs (name TEXT PRIMARY KEY);".to_string())
            .await
            .unwrap();

        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, Arc::new(storage)));

        let response = reqwest::get(format!("http://{addr}/billboard")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = response.json().await.unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Storage error:"), "{message}");
    }

    #[tokio::test]
    async fn bad_listen_address_is_a_server_error() {
        let err = bind("not-an-address").await.unwrap_err();
        assert!(matches!(err, Error::Server(ref msg) if msg.starts_with("Failed to bind not-an-address")));
    }

    #[test]
    fn other_failures_are_internal_errors() {
        let response = ApiError(Error::Decode("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
