use crate::{
    error::AppError,
    exposition::{
        self,
        Exporter,
    },
};
use axum::{
    extract::State,
    http::header,
    response::{
        Html,
        IntoResponse,
    },
    routing::get,
    Router,
};
use queue_it_collector::Transport;
use std::sync::Arc;

pub struct AppState<T> {
    pub exporter: Arc<Exporter<T>>,
    pub index: Arc<str>,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            exporter: self.exporter.clone(),
            index: self.index.clone(),
        }
    }
}

pub fn create_router<T: Transport>(exporter: Arc<Exporter<T>>, metrics_path: &str, healthz_path: &str) -> Router {
    let state = AppState {
        exporter,
        index: index_page(metrics_path, healthz_path).into(),
    };

    Router::new()
        .route("/", get(index::<T>))
        .route(healthz_path, get(healthz))
        .route(metrics_path, get(metrics::<T>))
        .with_state(state)
}

fn index_page(metrics_path: &str, healthz_path: &str) -> String {
    format!(
        "<html>\n<head><title>Queue-it Exporter</title></head>\n<body>\n<h1>Queue-it Exporter</h1>\n\
         <p><a href=\"{metrics_path}\">Metrics</a></p>\n<p><a href=\"{healthz_path}\">Health</a></p>\n\
         </body>\n</html>\n"
    )
}

async fn index<T: Transport>(State(state): State<AppState<T>>) -> Html<String> {
    Html(state.index.to_string())
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics<T: Transport>(State(state): State<AppState<T>>) -> Result<impl IntoResponse, AppError> {
    let body = state.exporter.scrape().await?;
    Ok(([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body))
}
