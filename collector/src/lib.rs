//! # Queue-it collector
//!
//! Collects waiting room statistics from the Queue-it REST API.
//!
//! - **`api`**: endpoints, response shapes and the [`Transport`] seam
//! - **`catalog`**: the summary and detail metrics exported per waiting room
//! - **`coordinator`**: one scrape, fanned out over all active rooms and
//!   fanned back in under an exact result count

#[macro_use]
extern crate tracing;

pub mod api;
pub mod catalog;
pub mod coordinator;
pub mod error;
mod metric;

pub use api::{
    HttpTransport,
    QueueItClient,
    Transport,
    WaitingRoom,
};
pub use catalog::{
    Catalog,
    MetricDescriptor,
    MetricGroup,
};
pub use coordinator::{
    CollectorSettings,
    Coordinator,
    ScrapePhase,
};
pub use error::{
    CollectError,
    QueueItError,
};
pub use metric::Metric;
