use super::{
    coerce,
    decode,
    ApiRequest,
    ApiResponse,
    QueueItClient,
    StatisticsDetail,
    Transport,
};
use crate::{
    catalog::MetricDescriptor,
    error::{
        ParseFailure,
        QueueItError,
    },
    metric::Metric,
};
use chrono::{
    DateTime,
    SecondsFormat,
    Utc,
};
use serde_json::{
    Map,
    Value,
};

/// Time range the statistics detail endpoint aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn last_minute(now: DateTime<Utc>) -> Self {
        Self {
            from: now - chrono::Duration::minutes(1),
            to: now,
        }
    }

    pub fn from_param(&self) -> String {
        self.from.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn to_param(&self) -> String {
        self.to.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl<T: Transport> QueueItClient<T> {
    /// Fetches all summary statistics of a waiting room in one request.
    pub async fn fetch_summary(
        &self,
        room_id: &str,
        metrics: &'static [MetricDescriptor],
    ) -> Result<Vec<Metric>, QueueItError> {
        let response = self
            .transport()
            .send(ApiRequest::StatisticsSummary {
                event_id: room_id.to_string(),
            })
            .await?;

        parse_summary(room_id, metrics, &response)
    }

    /// Fetches one statistics detail metric of a waiting room for `window`.
    pub async fn fetch_detail(
        &self,
        room_id: &str,
        metric: &'static MetricDescriptor,
        window: TimeWindow,
    ) -> Result<Metric, QueueItError> {
        debug!(
            waiting_room_id = room_id,
            metric = metric.source_key,
            from = %window.from,
            to = %window.to,
            "getting statistics details"
        );

        let response = self
            .transport()
            .send(ApiRequest::StatisticsDetail {
                event_id: room_id.to_string(),
                metric: metric.source_key,
                window,
            })
            .await?;

        parse_detail(room_id, metric, &response)
    }
}

/// Reads one metric per entry of `metrics` from a statistics summary response.
///
/// Values arrive as numeric strings; every catalog field has to be present and
/// numeric, fields unknown to the catalog are ignored.
pub fn parse_summary(
    room_id: &str,
    metrics: &'static [MetricDescriptor],
    response: &ApiResponse,
) -> Result<Vec<Metric>, QueueItError> {
    decode("statistics summary", response, |body| {
        let fields: Map<String, Value> = serde_json::from_slice(body)?;
        metrics
            .iter()
            .map(|descriptor| {
                let value = summary_value(&fields, descriptor.source_key)?;
                Ok(Metric::new(descriptor, room_id, value))
            })
            .collect()
    })
}

fn summary_value(fields: &Map<String, Value>, field: &'static str) -> Result<f64, ParseFailure> {
    let not_numeric = |value: &Value| ParseFailure::NotNumeric {
        field,
        value: value.to_string(),
    };

    match fields.get(field) {
        None => Err(ParseFailure::MissingField { field }),
        Some(value @ Value::String(s)) => coerce::parse_f64(s).ok_or_else(|| not_numeric(value)),
        Some(value @ Value::Number(n)) => n.as_f64().ok_or_else(|| not_numeric(value)),
        Some(value) => Err(not_numeric(value)),
    }
}

/// Reads the value of a statistics detail response: the sum of the first
/// entry, or `0` if the window has no entries.
pub fn parse_detail(
    room_id: &str,
    metric: &'static MetricDescriptor,
    response: &ApiResponse,
) -> Result<Metric, QueueItError> {
    let detail: StatisticsDetail = decode("statistics detail", response, |body| {
        serde_json::from_slice(body).map_err(ParseFailure::from)
    })?;

    let value = match detail.entries.first() {
        Some(entry) => entry.sum,
        None => {
            info!(
                waiting_room_id = room_id,
                metric = metric.source_key,
                "statistics detail metric has no value"
            );
            0.0
        }
    };

    Ok(Metric::new(metric, room_id, value))
}
