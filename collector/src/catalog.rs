//! Static tables of the Queue-it statistics exported per waiting room.
//!
//! The summary table lists the fields read from the single statistics summary
//! response of a room. The detail table lists the statistics that each need
//! their own request against the details endpoint. Both tables also serve as
//! the fan-out plan of the [`Coordinator`](crate::Coordinator), so the number
//! of expected results always matches the number of requests.

use strum::Display;

#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum MetricGroup {
    Summary,
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    /// Field name (summary) or path segment (detail) used by the Queue-it API.
    pub source_key: &'static str,
    pub exported_name: &'static str,
    pub description: &'static str,
    pub group: MetricGroup,
}

impl MetricDescriptor {
    pub const fn summary(source_key: &'static str, exported_name: &'static str, description: &'static str) -> Self {
        Self {
            source_key,
            exported_name,
            description,
            group: MetricGroup::Summary,
        }
    }

    pub const fn detail(source_key: &'static str, exported_name: &'static str, description: &'static str) -> Self {
        Self {
            source_key,
            exported_name,
            description,
            group: MetricGroup::Detail,
        }
    }
}

/// Immutable set of metric tables, passed by reference into the collector.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    summary: &'static [MetricDescriptor],
    detail: &'static [MetricDescriptor],
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(SUMMARY_METRICS, DETAIL_METRICS)
    }
}

impl Catalog {
    pub const fn new(summary: &'static [MetricDescriptor], detail: &'static [MetricDescriptor]) -> Self {
        Self { summary, detail }
    }

    pub fn summary(&self) -> &'static [MetricDescriptor] {
        self.summary
    }

    pub fn detail(&self) -> &'static [MetricDescriptor] {
        self.detail
    }

    pub fn metrics_per_room(&self) -> usize {
        self.summary.len() + self.detail.len()
    }

    /// Number of results a scrape over `rooms` waiting rooms has to deliver.
    pub fn expected_count(&self, rooms: usize) -> usize {
        rooms * self.metrics_per_room()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static MetricDescriptor> {
        self.summary.iter().chain(self.detail.iter())
    }
}

pub static SUMMARY_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor::summary("TotalQueueCount", "queue_it_total_queue_count", "Total queue count"),
    MetricDescriptor::summary(
        "TotalQueueCountBeforeStart",
        "queue_it_total_queue_count_before_start",
        "Total queue count before start",
    ),
    MetricDescriptor::summary(
        "TotalWaitingInQueueCount",
        "queue_it_total_waiting_in_queue_count",
        "Total waiting in queue count",
    ),
    MetricDescriptor::summary(
        "TotalLeftQueueCount",
        "queue_it_total_left_queue_count",
        "Total left queue count",
    ),
    MetricDescriptor::summary(
        "NoOfRedirectsLastMinute",
        "queue_it_no_of_redirects_last_minute",
        "Number of redirects in the last minute",
    ),
    MetricDescriptor::summary(
        "NoOfUniqueRedirectsLastMinute",
        "queue_it_no_of_unique_redirects_last_minute",
        "Number of unique redirects in the last minute",
    ),
    MetricDescriptor::summary(
        "SafetyNetRedirectedCount",
        "queue_it_safety_net_redirected_count",
        "Safety net redirected count",
    ),
    MetricDescriptor::summary(
        "RedirectorRedirectedCount",
        "queue_it_redirector_redirected_count",
        "Redirector redirected count",
    ),
    MetricDescriptor::summary(
        "TotalRedirectedCount",
        "queue_it_total_redirected_count",
        "Total redirected count",
    ),
    MetricDescriptor::summary("TotalEmailCount", "queue_it_total_email_count", "Total email count"),
    MetricDescriptor::summary(
        "TotalEmailNotificationCount",
        "queue_it_total_email_notification_count",
        "Total email notification count",
    ),
    MetricDescriptor::summary(
        "TotalOldQueueNumbers",
        "queue_it_total_old_queue_numbers",
        "Total old queue numbers",
    ),
    MetricDescriptor::summary(
        "TotalExceededMaxRedirectCount",
        "queue_it_total_exceeded_max_redirect_count",
        "Total exceeded max redirect count",
    ),
];

pub static DETAIL_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor::detail(
        "queuebeforeeventinflow",
        "queue_it_queue_before_event_inflow_count",
        "The amount of users who have joined the pre-queue",
    ),
    MetricDescriptor::detail(
        "queueinflow",
        "queue_it_queue_inflow_count",
        "Users who have joined either the pre-queue or the queue",
    ),
    MetricDescriptor::detail(
        "queueuniqueoutflow",
        "queue_it_queue_unique_outflow_count",
        "The number of initial queue redirects per minute (first redirect of the queue ID)",
    ),
    MetricDescriptor::detail(
        "queueoutflow",
        "queue_it_queue_outflow_count",
        "The amount of queue numbers which have been redirected from the queue",
    ),
    MetricDescriptor::detail(
        "safetynetoutflow",
        "queue_it_safety_net_outflow_count",
        "Redirected queue numbers which were redirected without having waited in the queue",
    ),
    MetricDescriptor::detail(
        "queueidsinqueue",
        "queue_it_queue_ids_in_queue_count",
        "The amount of Queue IDs currently waiting in line",
    ),
    MetricDescriptor::detail(
        "queueuniqueinflow",
        "queue_it_queue_unique_inflow_count",
        "The amount of new (unique) Queue IDs entering the queue per minute",
    ),
    MetricDescriptor::detail(
        "queueidscanceled",
        "queue_it_queue_ids_canceled_count",
        "The amount of Queue IDs which have been canceled by Cancel Action or API",
    ),
    MetricDescriptor::detail(
        "notificationfirst",
        "queue_it_notification_first_count",
        "The amount of users who received the first email notification upon signing up",
    ),
    MetricDescriptor::detail(
        "notificationyourturn",
        "queue_it_notification_your_turn_count",
        "The amount of users who received the It's Your Turn email notification",
    ),
    MetricDescriptor::detail(
        "exceededmaxredirectcount",
        "queue_it_exceeded_max_redirect_count",
        "The amount of visitors who pass through the waiting room more times than they are allowed",
    ),
    MetricDescriptor::detail(
        "maxoutflow",
        "queue_it_max_out_flow",
        "The highest amount of Queue IDs which are allowed to be redirected to your site per minute",
    ),
    MetricDescriptor::detail(
        "queueexpectedwaittime",
        "queue_it_queue_expected_wait_time",
        "For users arriving at a given time, this is the predicted wait time",
    ),
    MetricDescriptor::detail(
        "queueactualwaittime",
        "queue_it_queue_actual_wait_time",
        "The actual amount of minutes wait time in the queue",
    ),
    MetricDescriptor::detail(
        "returningqueueitemsinlessthan30s",
        "queue_it_returning_queue_items_in_less_than_30s",
        "Queue IDs returning to the queue less than 30 seconds after being redirected to the target site",
    ),
    MetricDescriptor::detail(
        "oldqueuenumbers",
        "queue_it_old_queue_numbers_count",
        "The amount of Queue IDs who have been first in line and did not choose to be redirected to the target site",
    ),
    MetricDescriptor::detail(
        "redirectedpercentage",
        "queue_it_redirected_percentage",
        "Percent of users who took their turn within a minute",
    ),
];
