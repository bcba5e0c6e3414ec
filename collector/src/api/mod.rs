//! Client for the Queue-it REST API.
//!
//! [`QueueItClient`] knows the endpoints and how to read their responses, the
//! actual I/O happens behind the [`Transport`] trait so the parsing and the
//! collection logic can run against in-memory responses.

mod http;
mod rooms;
mod statistics;
#[cfg(test)]
pub(crate) mod testing;
mod types;

use crate::error::{
    body_excerpt,
    ParseFailure,
    QueueItError,
};
use bytes::Bytes;
pub use http::HttpTransport;
pub use rooms::drop_test_rooms;
pub use statistics::{
    parse_detail,
    parse_summary,
    TimeWindow,
};
use std::{
    future::Future,
    pin::Pin,
};
pub(crate) use types::coerce;
pub use types::*;

pub const CONTENT_TYPE: &str = "application/json;charset=utf-8";
pub const API_KEY_HEADER: &str = "Api-Key";

/// A call against one of the Queue-it endpoints the exporter uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// `POST /2_0/event/search`
    SearchEvents { filters: Vec<SearchFilter> },
    /// `GET /2_0/event/{id}/queue/statistics/summary`
    StatisticsSummary { event_id: String },
    /// `GET /2_0/event/{id}/queue/statistics/details/{metric}?from=…&to=…`
    StatisticsDetail {
        event_id: String,
        metric: &'static str,
        window: TimeWindow,
    },
}

impl ApiRequest {
    pub fn is_post(&self) -> bool {
        matches!(self, ApiRequest::SearchEvents { .. })
    }

    /// Path segments below the base URL.
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            ApiRequest::SearchEvents { .. } => vec!["2_0", "event", "search"],
            ApiRequest::StatisticsSummary { event_id } => {
                vec!["2_0", "event", event_id.as_str(), "queue", "statistics", "summary"]
            }
            ApiRequest::StatisticsDetail { event_id, metric, .. } => {
                vec!["2_0", "event", event_id.as_str(), "queue", "statistics", "details", *metric]
            }
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            ApiRequest::StatisticsDetail { window, .. } => vec![("from", window.from_param()), ("to", window.to_param())],
            _ => Vec::new(),
        }
    }

    pub fn body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        match self {
            ApiRequest::SearchEvents { filters } => serde_json::to_vec(filters).map(Some),
            _ => Ok(None),
        }
    }

    /// Path and query string, used for logging.
    pub fn path(&self) -> String {
        let mut path = format!("/{}", self.path_segments().join("/"));
        let query = self.query();
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            path.push('?');
            path.push_str(&encoded);
        }
        path
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to Queue-it and hands back the raw response.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: ApiRequest) -> Pin<Box<dyn Future<Output = Result<ApiResponse, QueueItError>> + Send + '_>>;
}

#[derive(Debug, Clone)]
pub struct QueueItClient<T> {
    transport: T,
}

impl<T: Transport> QueueItClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Turns a response into `T` via `parse`. If that fails the body is read as a
/// Queue-it error payload instead, and only if that fails too the first
/// parse failure is returned.
pub(crate) fn decode<T>(
    context: &'static str,
    response: &ApiResponse,
    parse: impl FnOnce(&[u8]) -> Result<T, ParseFailure>,
) -> Result<T, QueueItError> {
    let body = response.body.as_ref();

    if response.is_success() {
        let failure = match parse(body) {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };
        return match api_error(body) {
            Some(err) => Err(err),
            None => {
                info!(context, error = %failure, body = %body_excerpt(body), "unknown Queue-it API response");
                Err(QueueItError::parse(context, failure, body))
            }
        };
    }

    Err(api_error(body).unwrap_or_else(|| QueueItError::Api {
        code: 0,
        text: body_excerpt(body),
        http_status: response.status,
    }))
}

fn api_error(body: &[u8]) -> Option<QueueItError> {
    let payload = serde_json::from_slice::<ApiErrorPayload>(body).ok()?;
    debug!(code = payload.error_code, text = %payload.error_text, "Queue-it API error");
    Some(QueueItError::Api {
        code: payload.error_code,
        text: payload.error_text,
        http_status: payload.http_status_code,
    })
}
