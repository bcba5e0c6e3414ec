//! In-memory [`Transport`] used by the tests of this crate.

use super::{
    ApiRequest,
    ApiResponse,
    Transport,
};
use crate::{
    catalog::MetricDescriptor,
    error::QueueItError,
};
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Mutex,
    },
    time::Duration,
};

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    search: Option<ApiResponse>,
    summaries: HashMap<String, ApiResponse>,
    default_summary: Option<ApiResponse>,
    details: HashMap<(String, &'static str), ApiResponse>,
    default_detail: Option<ApiResponse>,
    statistics_delay: Option<Duration>,
    hang_statistics: bool,
    requests: Mutex<Vec<ApiRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_search(mut self, response: ApiResponse) -> Self {
        self.search = Some(response);
        self
    }

    pub(crate) fn with_summary(mut self, event_id: &str, response: ApiResponse) -> Self {
        self.summaries.insert(event_id.to_string(), response);
        self
    }

    pub(crate) fn with_default_summary(mut self, response: ApiResponse) -> Self {
        self.default_summary = Some(response);
        self
    }

    pub(crate) fn with_detail(mut self, event_id: &str, metric: &'static str, response: ApiResponse) -> Self {
        self.details.insert((event_id.to_string(), metric), response);
        self
    }

    pub(crate) fn with_default_detail(mut self, response: ApiResponse) -> Self {
        self.default_detail = Some(response);
        self
    }

    pub(crate) fn with_statistics_delay(mut self, delay: Duration) -> Self {
        self.statistics_delay = Some(delay);
        self
    }

    /// Statistics requests never complete.
    pub(crate) fn hanging_statistics(mut self) -> Self {
        self.hang_statistics = true;
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn statistics_requests(&self) -> usize {
        self.requests().iter().filter(|r| !r.is_post()).count()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn response_for(&self, request: &ApiRequest) -> Option<ApiResponse> {
        match request {
            ApiRequest::SearchEvents { .. } => self.search.clone(),
            ApiRequest::StatisticsSummary { event_id } => self
                .summaries
                .get(event_id)
                .or(self.default_summary.as_ref())
                .cloned(),
            ApiRequest::StatisticsDetail { event_id, metric, .. } => self
                .details
                .get(&(event_id.clone(), *metric))
                .or(self.default_detail.as_ref())
                .cloned(),
        }
    }

    async fn respond(&self, request: ApiRequest) -> Result<ApiResponse, QueueItError> {
        self.requests.lock().unwrap().push(request.clone());

        if !request.is_post() {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            if self.hang_statistics {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.statistics_delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        Ok(self.response_for(&request).unwrap_or(ApiResponse {
            status: 404,
            body: format!("no scripted response for {}", request.path()).into(),
        }))
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> Pin<Box<dyn Future<Output = Result<ApiResponse, QueueItError>> + Send + '_>> {
        Box::pin(self.respond(request))
    }
}

/// Summary body with every field of `metrics` set to `value`.
pub(crate) fn summary_body(metrics: &[MetricDescriptor], value: &str) -> ApiResponse {
    let body: serde_json::Map<_, _> = metrics
        .iter()
        .map(|m| (m.source_key.to_string(), serde_json::Value::from(value)))
        .collect();
    ApiResponse::ok(serde_json::to_vec(&body).unwrap())
}

/// Detail body whose entries carry the given sums.
pub(crate) fn detail_body(sums: &[&str]) -> ApiResponse {
    let entries: Vec<_> = sums
        .iter()
        .map(|sum| serde_json::json!({ "Sum": sum, "MinMinute": "0", "MaxMinute": "0" }))
        .collect();
    let body = serde_json::json!({
        "VersionTimestamp": "2024-03-01T10:00:00Z",
        "From": "2024-03-01T09:59:00Z",
        "To": "2024-03-01T10:00:00Z",
        "Interval": "1",
        "Entries": entries,
        "SumOffset": "0",
    });
    ApiResponse::ok(serde_json::to_vec(&body).unwrap())
}
