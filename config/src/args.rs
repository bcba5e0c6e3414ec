use clap::Parser;
use std::path::PathBuf;

/// Prometheus exporter for Queue-it waiting room statistics
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Optional YAML file with configuration values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address on which to expose metrics and web interface.
    #[arg(long = "web.listen-address", value_name = "ADDRESS")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub metrics_path: Option<String>,

    /// Path under which to run healthchecks.
    #[arg(long = "web.healthcheck-path", value_name = "PATH")]
    pub healthz_path: Option<String>,

    /// Base URL of your Queue-it API, e.g. `https://customer.queue-it.net`.
    #[arg(long = "config.queue-it-base-url", value_name = "URL")]
    pub queue_it_base_url: Option<String>,

    /// Path of a file containing the Queue-it API key.
    #[arg(long = "config.queue-it-api-key-path", value_name = "FILE")]
    pub queue_it_api_key_path: Option<PathBuf>,

    /// Queue-it API key, used when no key file is given.
    #[arg(
        long = "config.queue-it-api-key",
        env = "QUEUE_IT_API_KEY",
        hide_env_values = true,
        value_name = "KEY"
    )]
    pub api_key: Option<String>,

    /// Whether to filter out the metrics of test waiting rooms.
    #[arg(long = "config.omit-test-waiting-rooms", value_name = "BOOL")]
    pub omit_test_waiting_rooms: Option<bool>,

    /// Maximum number of concurrent requests against the Queue-it API.
    #[arg(long = "config.max-concurrent-requests", value_name = "N")]
    pub max_concurrent_requests: Option<u64>,

    /// Deadline for collecting all metrics of one scrape.
    #[arg(long = "config.scrape-timeout-seconds", value_name = "SECONDS")]
    pub scrape_timeout_seconds: Option<u64>,

    /// Timeout of a single Queue-it API request.
    #[arg(long = "config.request-timeout-seconds", value_name = "SECONDS")]
    pub request_timeout_seconds: Option<u64>,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(address) = &self.listen_address {
                cache.insert("listen_address".to_string(), address.clone().into());
            }
            if let Some(path) = &self.metrics_path {
                cache.insert("metrics_path".to_string(), path.clone().into());
            }
            if let Some(path) = &self.healthz_path {
                cache.insert("healthz_path".to_string(), path.clone().into());
            }
            if let Some(url) = &self.queue_it_base_url {
                cache.insert("queue_it_base_url".to_string(), url.clone().into());
            }
            if let Some(path) = &self.queue_it_api_key_path {
                cache.insert(
                    "queue_it_api_key_path".to_string(),
                    path.to_string_lossy().into_owned().into(),
                );
            }
            if let Some(key) = &self.api_key {
                cache.insert("api_key".to_string(), key.clone().into());
            }
            if let Some(omit) = self.omit_test_waiting_rooms {
                cache.insert("omit_test_waiting_rooms".to_string(), omit.into());
            }
            if let Some(n) = self.max_concurrent_requests {
                cache.insert("max_concurrent_requests".to_string(), n.into());
            }
            if let Some(seconds) = self.scrape_timeout_seconds {
                cache.insert("scrape_timeout_seconds".to_string(), seconds.into());
            }
            if let Some(seconds) = self.request_timeout_seconds {
                cache.insert("request_timeout_seconds".to_string(), seconds.into());
            }
            Ok(cache)
        }
    }
}
