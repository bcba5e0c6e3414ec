use std::time::Duration;

/// Maximum number of body bytes kept in errors for diagnostics.
const BODY_EXCERPT_LEN: usize = 512;

/// Failure of a single request against the Queue-it API.
#[derive(thiserror::Error, Debug)]
pub enum QueueItError {
    #[error("request to the Queue-it API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Queue-it answers failed calls with a well-formed error payload, often
    /// with a `200 OK` status.
    #[error("Queue-it API error {code} (http status {http_status}): {text}")]
    Api { code: i64, text: String, http_status: u16 },

    #[error("base URL {0} cannot carry request paths")]
    InvalidBaseUrl(url::Url),

    #[error("cannot encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cannot parse {context} response: {source}")]
    Parse {
        context: &'static str,
        #[source]
        source: ParseFailure,
        body: String,
    },
}

impl QueueItError {
    pub(crate) fn parse(context: &'static str, source: impl Into<ParseFailure>, body: &[u8]) -> Self {
        Self::Parse {
            context,
            source: source.into(),
            body: body_excerpt(body),
        }
    }
}

/// The reason a response body could not be turned into metrics.
#[derive(thiserror::Error, Debug)]
pub enum ParseFailure {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("field {field:?} is missing")]
    MissingField { field: &'static str },
    #[error("field {field:?} is not numeric: {value:?}")]
    NotNumeric { field: &'static str, value: String },
}

/// Failure of a whole scrape. Only one of these is surfaced per collection,
/// regardless of how many individual requests went wrong.
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error("failed to list active waiting rooms: {0}")]
    Directory(#[source] QueueItError),

    #[error("failed to fetch {metric} for waiting room {room_id}: {source}")]
    Fetch {
        room_id: String,
        metric: &'static str,
        #[source]
        source: QueueItError,
    },

    #[error("scrape did not finish within {timeout:?} ({received}/{expected} results received)")]
    DeadlineExceeded {
        timeout: Duration,
        received: usize,
        expected: usize,
    },

    #[error("all fetches finished after only {received}/{expected} results")]
    Incomplete { received: usize, expected: usize },
}

pub(crate) fn body_excerpt(body: &[u8]) -> String {
    let body = String::from_utf8_lossy(body);
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.into_owned(),
    }
}
