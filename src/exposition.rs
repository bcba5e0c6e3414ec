//! Turns one collector scrape into OpenMetrics text.
//!
//! The registry lives as long as the exporter. Each exported metric name gets
//! one gauge family labeled with `waiting_room_id`, registered the first time
//! the name shows up and cleared at the start of every scrape.

use prometheus_client::{
    encoding::{
        text::encode,
        EncodeLabelSet,
    },
    metrics::{
        family::Family,
        gauge::Gauge,
    },
    registry::Registry,
};
use queue_it_collector::{
    Coordinator,
    Metric,
    Transport,
};
use std::{
    collections::HashMap,
    sync::atomic::AtomicU64,
    time::Instant,
};
use tokio::sync::Mutex;

pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

const UP: &str = "queue_it_up";
const COLLECT_DURATION: &str = "queue_it_collector_collect_duration_seconds";

type RoomGauges = Family<RoomLabels, Gauge<f64, AtomicU64>>;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RoomLabels {
    waiting_room_id: String,
}

struct Metrics {
    registry: Registry,
    up: Gauge,
    collect_duration: Gauge<f64, AtomicU64>,
    families: HashMap<&'static str, RoomGauges>,
}

impl Metrics {
    fn new() -> Self {
        let mut registry = Registry::default();

        let up = Gauge::default();
        registry.register(UP, "Whether the last scrape of the Queue-it API succeeded", up.clone());

        let collect_duration = Gauge::<f64, AtomicU64>::default();
        registry.register(
            COLLECT_DURATION,
            "Duration of the last scrape of the Queue-it API in seconds",
            collect_duration.clone(),
        );

        Self {
            registry,
            up,
            collect_duration,
            families: HashMap::new(),
        }
    }

    fn family(&mut self, metric: &Metric) -> &RoomGauges {
        let registry = &mut self.registry;
        self.families.entry(metric.exported_name()).or_insert_with(|| {
            debug!(name = metric.exported_name(), "registering gauge family");
            let family = RoomGauges::default();
            registry.register(metric.exported_name(), metric.description(), family.clone());
            family
        })
    }

    fn publish(&mut self, metrics: &[Metric]) {
        for metric in metrics {
            let labels = RoomLabels {
                waiting_room_id: metric.waiting_room_id.clone(),
            };
            self.family(metric).get_or_create(&labels).set(metric.value);
        }
    }
}

/// Prometheus side of the exporter. Scrapes are serialized.
pub struct Exporter<T> {
    coordinator: Coordinator<T>,
    metrics: Mutex<Metrics>,
}

impl<T: Transport> Exporter<T> {
    pub fn new(coordinator: Coordinator<T>) -> Self {
        Self {
            coordinator,
            metrics: Mutex::new(Metrics::new()),
        }
    }

    pub fn coordinator(&self) -> &Coordinator<T> {
        &self.coordinator
    }

    /// Runs one collection and encodes the registry.
    ///
    /// A failed collection is reported through `queue_it_up`, only encoding
    /// the registry can fail.
    pub async fn scrape(&self) -> Result<String, std::fmt::Error> {
        let mut metrics = self.metrics.lock().await;
        for family in metrics.families.values() {
            family.clear();
        }

        let started = Instant::now();
        let result = self.coordinator.collect().await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(collected) => {
                metrics.publish(&collected);
                metrics.up.set(1);
            }
            Err(err) => {
                error!(error = %err, "Queue-it scrape failed");
                metrics.up.set(0);
            }
        }
        metrics.collect_duration.set(elapsed);

        let mut body = String::new();
        encode(&mut body, &metrics.registry)?;
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use queue_it_collector::{
        api::{
            ApiRequest,
            ApiResponse,
        },
        catalog::SUMMARY_METRICS,
        Catalog,
        CollectorSettings,
        QueueItClient,
        QueueItError,
    };
    use std::{
        future::Future,
        pin::Pin,
        sync::atomic::{
            AtomicBool,
            Ordering,
        },
    };

    /// Answers every request with healthy data for the given rooms until it is
    /// told to fail.
    pub(crate) struct FakeQueueIt {
        rooms: Vec<&'static str>,
        failing: AtomicBool,
    }

    impl FakeQueueIt {
        pub(crate) fn new(rooms: Vec<&'static str>) -> Self {
            Self {
                rooms,
                failing: AtomicBool::new(false),
            }
        }

        pub(crate) fn fail(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }

        fn respond(&self, request: ApiRequest) -> ApiResponse {
            if self.failing.load(Ordering::SeqCst) {
                return ApiResponse {
                    status: 503,
                    body: "maintenance".into(),
                };
            }

            let body = match request {
                ApiRequest::SearchEvents { .. } => {
                    let rooms: Vec<_> = self
                        .rooms
                        .iter()
                        .map(|id| serde_json::json!({ "EventId": id, "IsTest": "False" }))
                        .collect();
                    serde_json::Value::from(rooms)
                }
                ApiRequest::StatisticsSummary { .. } => SUMMARY_METRICS
                    .iter()
                    .map(|m| (m.source_key.to_string(), serde_json::Value::from("7")))
                    .collect::<serde_json::Map<_, _>>()
                    .into(),
                ApiRequest::StatisticsDetail { .. } => serde_json::json!({
                    "Entries": [{ "Sum": "1.5", "MinMinute": "0", "MaxMinute": "0" }]
                }),
            };
            ApiResponse::ok(body.to_string())
        }
    }

    impl Transport for FakeQueueIt {
        fn send(
            &self,
            request: ApiRequest,
        ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, QueueItError>> + Send + '_>> {
            let response = self.respond(request);
            Box::pin(async move { Ok(response) })
        }
    }

    pub(crate) fn exporter(rooms: Vec<&'static str>) -> Exporter<FakeQueueIt> {
        let coordinator = Coordinator::new(
            QueueItClient::new(FakeQueueIt::new(rooms)),
            Catalog::default(),
            CollectorSettings::default(),
        );
        Exporter::new(coordinator)
    }

    #[tokio::test]
    async fn successful_scrape_publishes_room_samples() {
        let exporter = exporter(vec!["sale"]);

        let body = exporter.scrape().await.unwrap();
        assert!(body.contains("queue_it_up 1\n"), "{body}");
        assert!(body.contains(COLLECT_DURATION), "{body}");
        assert!(body.contains(r#"queue_it_total_queue_count{waiting_room_id="sale"} 7.0"#), "{body}");
        assert!(body.contains(r#"queue_it_queue_inflow_count{waiting_room_id="sale"} 1.5"#), "{body}");
        assert!(body.ends_with("# EOF\n"));
    }

    #[tokio::test]
    async fn failed_scrape_reports_down_without_samples() {
        let exporter = exporter(vec!["sale"]);
        exporter.coordinator().client().transport().fail();

        let body = exporter.scrape().await.unwrap();
        assert!(body.contains("queue_it_up 0\n"), "{body}");
        assert!(body.contains(COLLECT_DURATION), "{body}");
        assert!(!body.contains("waiting_room_id"), "{body}");
    }

    #[tokio::test]
    async fn samples_do_not_survive_into_the_next_scrape() {
        let exporter = exporter(vec!["sale"]);
        let first = exporter.scrape().await.unwrap();
        assert!(first.contains(r#"waiting_room_id="sale""#));

        exporter.coordinator().client().transport().fail();
        let second = exporter.scrape().await.unwrap();
        assert!(second.contains("queue_it_up 0\n"), "{second}");
        assert!(!second.contains(r#"waiting_room_id="sale""#), "{second}");
    }

    #[tokio::test]
    async fn no_rooms_is_up() {
        let body = exporter(vec![]).scrape().await.unwrap();
        assert!(body.contains("queue_it_up 1\n"), "{body}");
        assert!(!body.contains("waiting_room_id"), "{body}");
    }
}
