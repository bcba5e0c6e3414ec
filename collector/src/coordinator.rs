//! Fan-out/fan-in of one scrape over all active waiting rooms.
//!
//! A scrape walks through the phases of [`ScrapePhase`]: it lists the active
//! rooms, spawns one summary task per room plus one task per detail metric and
//! room, and then drains exactly [`Catalog::expected_count`] results from a
//! channel sized to that count. The first failure ends the scrape and drops
//! everything collected so far, there is no partial result.

use crate::{
    api::{
        QueueItClient,
        TimeWindow,
        Transport,
        WaitingRoom,
    },
    catalog::{
        Catalog,
        MetricDescriptor,
    },
    error::{
        CollectError,
        QueueItError,
    },
    metric::Metric,
};
use chrono::Utc;
use std::{
    sync::Arc,
    time::Duration,
};
use strum::Display;
use tokio::{
    sync::{
        mpsc,
        Semaphore,
    },
    task::JoinSet,
    time::{
        timeout_at,
        Instant,
    },
};
use tracing::Instrument as _;

const SUMMARY_FETCH: &str = "statistics summary";

#[derive(Debug, Clone, Copy)]
pub struct CollectorSettings {
    pub omit_test_rooms: bool,
    /// Upper bound of Queue-it requests in flight at the same time.
    pub max_concurrent_requests: usize,
    /// Deadline for a whole scrape, room discovery included.
    pub scrape_timeout: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            omit_test_rooms: true,
            max_concurrent_requests: 32,
            scrape_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum ScrapePhase {
    Idle,
    Discovering,
    FanningOut,
    FanningIn,
    Succeeded,
    Failed,
}

/// A failed fetch task, as sent through the fan-in channel.
#[derive(Debug)]
struct FetchFailure {
    room_id: String,
    metric: &'static str,
    error: QueueItError,
}

impl From<FetchFailure> for CollectError {
    fn from(failure: FetchFailure) -> Self {
        CollectError::Fetch {
            room_id: failure.room_id,
            metric: failure.metric,
            source: failure.error,
        }
    }
}

type Signal = Result<Metric, FetchFailure>;

/// Book-keeping of a single scrape.
struct Scrape {
    phase: ScrapePhase,
    started: Instant,
    deadline: Instant,
    timeout: Duration,
}

impl Scrape {
    fn start(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            phase: ScrapePhase::Idle,
            started,
            deadline: started + timeout,
            timeout,
        }
    }

    fn enter(&mut self, phase: ScrapePhase) {
        debug!(from = %self.phase, to = %phase, elapsed = ?self.started.elapsed(), "scrape phase");
        self.phase = phase;
    }

    fn deadline_exceeded(&self, received: usize, expected: usize) -> CollectError {
        warn!(phase = %self.phase, received, expected, timeout = ?self.timeout, "scrape deadline exceeded");
        CollectError::DeadlineExceeded {
            timeout: self.timeout,
            received,
            expected,
        }
    }
}

/// Collects the metrics of all active waiting rooms, one scrape per call.
pub struct Coordinator<T> {
    client: Arc<QueueItClient<T>>,
    catalog: Catalog,
    settings: CollectorSettings,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(client: QueueItClient<T>, catalog: Catalog, settings: CollectorSettings) -> Self {
        Self {
            client: Arc::new(client),
            catalog,
            settings,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn client(&self) -> &QueueItClient<T> {
        &self.client
    }

    /// Runs one scrape and returns either every metric of every active room or
    /// a single error.
    #[instrument(level = "debug", name = "scrape", skip(self))]
    pub async fn collect(&self) -> Result<Vec<Metric>, CollectError> {
        let mut scrape = Scrape::start(self.settings.scrape_timeout);
        let result = self.run(&mut scrape).await;

        match &result {
            Ok(metrics) => {
                scrape.enter(ScrapePhase::Succeeded);
                debug!(count = metrics.len(), "done getting metrics");
            }
            Err(error) => {
                scrape.enter(ScrapePhase::Failed);
                debug!(%error, "scrape failed");
            }
        }

        result
    }

    async fn run(&self, scrape: &mut Scrape) -> Result<Vec<Metric>, CollectError> {
        scrape.enter(ScrapePhase::Discovering);
        let rooms = timeout_at(scrape.deadline, self.client.list_active_rooms(self.settings.omit_test_rooms))
            .await
            .map_err(|_| scrape.deadline_exceeded(0, 0))?
            .map_err(CollectError::Directory)?;

        if rooms.is_empty() {
            info!("did not find any waiting room");
            return Ok(Vec::new());
        }

        let expected = self.catalog.expected_count(rooms.len());
        debug!(rooms = rooms.len(), expected, "calculated expected number of metrics");
        if expected == 0 {
            return Ok(Vec::new());
        }

        scrape.enter(ScrapePhase::FanningOut);
        let (tx, mut rx) = mpsc::channel::<Signal>(expected);
        // Dropping the set on any early return aborts the outstanding fetches.
        let _tasks = self.fan_out(&rooms, tx);

        scrape.enter(ScrapePhase::FanningIn);
        let mut metrics = Vec::with_capacity(expected);
        while metrics.len() < expected {
            let signal = match timeout_at(scrape.deadline, rx.recv()).await {
                Ok(Some(signal)) => signal,
                Ok(None) => {
                    return Err(CollectError::Incomplete {
                        received: metrics.len(),
                        expected,
                    })
                }
                Err(_) => return Err(scrape.deadline_exceeded(metrics.len(), expected)),
            };

            match signal {
                Ok(metric) => {
                    trace!(
                        waiting_room_id = %metric.waiting_room_id,
                        metric = metric.exported_name(),
                        value = metric.value,
                        "received metric"
                    );
                    metrics.push(metric);
                }
                Err(failure) => {
                    debug!(
                        received = metrics.len(),
                        expected, "discarding collected metrics after failed fetch"
                    );
                    return Err(failure.into());
                }
            }
        }

        Ok(metrics)
    }

    fn fan_out(&self, rooms: &[WaitingRoom], tx: mpsc::Sender<Signal>) -> JoinSet<()> {
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrent_requests.max(1)));
        let window = TimeWindow::last_minute(Utc::now());
        let mut tasks = JoinSet::new();

        for room in rooms {
            tasks.spawn(
                fetch_summary(
                    self.client.clone(),
                    permits.clone(),
                    tx.clone(),
                    room.event_id.clone(),
                    self.catalog.summary(),
                )
                .in_current_span(),
            );

            for metric in self.catalog.detail() {
                tasks.spawn(
                    fetch_detail(
                        self.client.clone(),
                        permits.clone(),
                        tx.clone(),
                        room.event_id.clone(),
                        metric,
                        window,
                    )
                    .in_current_span(),
                );
            }
        }

        tasks
    }
}

async fn fetch_summary<T: Transport>(
    client: Arc<QueueItClient<T>>,
    permits: Arc<Semaphore>,
    tx: mpsc::Sender<Signal>,
    room_id: String,
    metrics: &'static [MetricDescriptor],
) {
    let Ok(_permit) = permits.acquire_owned().await else {
        return;
    };

    match client.fetch_summary(&room_id, metrics).await {
        Ok(metrics) => {
            for metric in metrics {
                if tx.send(Ok(metric)).await.is_err() {
                    return;
                }
            }
        }
        Err(error) => {
            info!(waiting_room_id = %room_id, %error, "failed to fetch statistics summary");
            let _ = tx
                .send(Err(FetchFailure {
                    room_id,
                    metric: SUMMARY_FETCH,
                    error,
                }))
                .await;
        }
    }
}

async fn fetch_detail<T: Transport>(
    client: Arc<QueueItClient<T>>,
    permits: Arc<Semaphore>,
    tx: mpsc::Sender<Signal>,
    room_id: String,
    metric: &'static MetricDescriptor,
    window: TimeWindow,
) {
    let Ok(_permit) = permits.acquire_owned().await else {
        return;
    };

    let result = client.fetch_detail(&room_id, metric, window).await;
    let signal = result.map_err(|error| {
        info!(waiting_room_id = %room_id, metric = metric.source_key, %error, "failed to fetch statistics detail");
        FetchFailure {
            room_id,
            metric: metric.source_key,
            error,
        }
    });

    let _ = tx.send(signal).await;
}
