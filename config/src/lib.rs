#[macro_use]
extern crate tracing;

mod args;

pub use args::Args;
use eyre::{
    bail,
    eyre,
    Context as _,
    Result,
};
use serde::{
    de::Error as _,
    Deserialize,
    Deserializer,
    Serialize,
};
use std::{
    fmt,
    net::SocketAddr,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const ENV_PREFIX: &str = "QUEUE_IT_EXPORTER";

/// Raw configuration as assembled from defaults, config file, environment
/// and command line. Use [`Config::resolve`] to obtain validated [`Settings`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "listen_address")]
    pub listen_address: SocketAddr,
    pub metrics_path: String,
    pub healthz_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_it_base_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_it_api_key_path: Option<PathBuf>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub omit_test_waiting_rooms: bool,
    pub max_concurrent_requests: usize,
    pub scrape_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_address", &self.listen_address)
            .field("metrics_path", &self.metrics_path)
            .field("healthz_path", &self.healthz_path)
            .field("queue_it_base_url", &self.queue_it_base_url)
            .field("queue_it_api_key_path", &self.queue_it_api_key_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("omit_test_waiting_rooms", &self.omit_test_waiting_rooms)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("scrape_timeout_seconds", &self.scrape_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Yaml,
        ));

        if let Some(path) = &args.config {
            debug!(?path, "Loading config file");
            builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml));
        }

        builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .add_source(args);

        builder.build()?.try_deserialize()
    }

    /// Checks the configuration and loads the API key.
    pub fn resolve(&self) -> Result<Settings> {
        self.validate()?;

        let queue_it_base_url = self
            .queue_it_base_url
            .clone()
            .ok_or_else(|| eyre!("please provide a Queue-it API endpoint as config.queue-it-base-url"))?;

        Ok(Settings {
            listen_address: self.listen_address,
            metrics_path: self.metrics_path.clone(),
            healthz_path: self.healthz_path.clone(),
            queue_it_base_url,
            api_key: self.api_key()?,
            omit_test_waiting_rooms: self.omit_test_waiting_rooms,
            max_concurrent_requests: self.max_concurrent_requests,
            scrape_timeout: Duration::from_secs(self.scrape_timeout_seconds),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        })
    }

    pub fn validate(&self) -> Result<()> {
        match &self.queue_it_base_url {
            None => bail!("please provide a Queue-it API endpoint as config.queue-it-base-url"),
            Some(url) if !matches!(url.scheme(), "http" | "https") => {
                bail!("config.queue-it-base-url must be an http(s) URL, got {url}")
            }
            Some(_) => {}
        }

        for (name, path) in [("web.telemetry-path", &self.metrics_path), ("web.healthcheck-path", &self.healthz_path)] {
            if !path.starts_with('/') || path == "/" {
                bail!("{name} must be an absolute path below `/`, got {path:?}");
            }
        }
        if self.metrics_path == self.healthz_path {
            bail!("web.telemetry-path and web.healthcheck-path must differ");
        }

        if self.max_concurrent_requests == 0 {
            bail!("config.max-concurrent-requests must be at least 1");
        }
        if self.scrape_timeout_seconds == 0 || self.request_timeout_seconds == 0 {
            bail!("timeouts must be at least one second");
        }

        Ok(())
    }

    /// The API key, read from `queue_it_api_key_path` if set, otherwise taken
    /// from `api_key` (`QUEUE_IT_API_KEY`).
    pub fn api_key(&self) -> Result<ApiKey> {
        let key = match &self.queue_it_api_key_path {
            Some(path) => read_api_key(path)?,
            None => self.api_key.as_deref().unwrap_or_default().trim().to_string(),
        };

        if key.is_empty() {
            bail!(
                "please provide a Queue-it API key as the environment variable QUEUE_IT_API_KEY or a mounted file \
                 with its path set to --config.queue-it-api-key-path"
            );
        }

        Ok(ApiKey(key))
    }
}

/// Accepts Go-style listen addresses such as `:8000` from any layer.
fn listen_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SocketAddr, D::Error> {
    let address = String::deserialize(deserializer)?;
    normalize_listen_address(&address)
        .parse()
        .map_err(|e| D::Error::custom(format!("invalid listen address {address:?}: {e}")))
}

fn normalize_listen_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => address.to_string(),
    }
}

fn read_api_key(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read file from config.queue-it-api-key-path: {}", path.display()))?;
    Ok(content.trim().to_string())
}

/// Validated configuration the exporter runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_address: SocketAddr,
    pub metrics_path: String,
    pub healthz_path: String,
    pub queue_it_base_url: Url,
    pub api_key: ApiKey,
    pub omit_test_waiting_rooms: bool,
    pub max_concurrent_requests: usize,
    pub scrape_timeout: Duration,
    pub request_timeout: Duration,
}

/// Queue-it API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid() -> Config {
        Config {
            queue_it_base_url: Some(Url::parse("https://customer.queue-it.net").unwrap()),
            api_key: Some("from-env".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.listen_address, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.healthz_path, "/healthz");
        assert!(config.omit_test_waiting_rooms);
        assert_eq!(config.max_concurrent_requests, 32);
        assert_eq!(config.queue_it_base_url, None);
    }

    #[test]
    fn args_override_defaults() {
        let args = Args {
            queue_it_base_url: Some("https://customer.queue-it.net".to_string()),
            listen_address: Some(":9100".to_string()),
            omit_test_waiting_rooms: Some(false),
            scrape_timeout_seconds: Some(5),
            ..Args::default()
        };

        let config = Config::new(args).unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:9100".parse().unwrap());
        assert!(!config.omit_test_waiting_rooms);
        assert_eq!(config.scrape_timeout_seconds, 5);
        assert_eq!(config.metrics_path, "/metrics");
    }

    #[test]
    fn config_file_is_layered_below_args() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("exporter.yaml");
        std::fs::write(
            &path,
            "queue_it_base_url: https://file.queue-it.net\nmetrics_path: /queue-it/metrics\nmax_concurrent_requests: 4\n",
        )
        .unwrap();

        let args = Args {
            config: Some(path),
            max_concurrent_requests: Some(8),
            ..Args::default()
        };

        let config = Config::new(args).unwrap();
        assert_eq!(config.queue_it_base_url.unwrap().as_str(), "https://file.queue-it.net/");
        assert_eq!(config.metrics_path, "/queue-it/metrics");
        assert_eq!(config.max_concurrent_requests, 8);
    }

    #[test]
    fn go_style_listen_address_from_config_file() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("exporter.yaml");
        std::fs::write(&path, "listen_address: \":9200\"\n").unwrap();

        let config = Config::new(Args {
            config: Some(path),
            ..Args::default()
        })
        .unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:9200".parse().unwrap());

        assert_eq!(normalize_listen_address("127.0.0.1:8000"), "127.0.0.1:8000");
        assert!(serde_yml::from_str::<Config>(&DEFAULT_CONFIG.replace("0.0.0.0:8000", "nowhere")).is_err());
    }

    #[test]
    fn key_file_wins_and_is_trimmed() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("api-key");
        std::fs::write(&path, "  secret-from-file\n").unwrap();

        let config = Config {
            queue_it_api_key_path: Some(path),
            ..valid()
        };
        assert_eq!(config.api_key().unwrap().expose(), "secret-from-file");
    }

    #[test]
    fn env_key_is_used_without_key_file() {
        assert_eq!(valid().api_key().unwrap().expose(), "from-env");
    }

    #[test]
    fn missing_or_unreadable_keys_are_rejected() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..valid()
        };
        assert!(config.api_key().is_err());

        let config = Config {
            queue_it_api_key_path: Some(PathBuf::from("/definitely/not/here")),
            ..valid()
        };
        assert!(config.api_key().is_err());
    }

    #[test]
    fn validation() {
        assert!(valid().validate().is_ok());

        let missing_url = Config {
            queue_it_base_url: None,
            ..valid()
        };
        assert!(missing_url.validate().is_err());

        let ftp = Config {
            queue_it_base_url: Some(Url::parse("ftp://customer.queue-it.net").unwrap()),
            ..valid()
        };
        assert!(ftp.validate().is_err());

        let no_concurrency = Config {
            max_concurrent_requests: 0,
            ..valid()
        };
        assert!(no_concurrency.validate().is_err());

        let same_paths = Config {
            healthz_path: "/metrics".to_string(),
            ..valid()
        };
        assert!(same_paths.validate().is_err());

        let relative = Config {
            metrics_path: "metrics".to_string(),
            ..valid()
        };
        assert!(relative.validate().is_err());
    }

    #[test]
    fn resolve_and_redaction() {
        let settings = valid().resolve().unwrap();
        assert_eq!(settings.scrape_timeout, Duration::from_secs(30));
        assert_eq!(settings.request_timeout, Duration::from_secs(10));

        assert!(!format!("{settings:?}").contains("from-env"));
        assert!(!format!("{:?}", valid()).contains("from-env"));
    }
}
