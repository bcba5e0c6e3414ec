use super::{
    ApiRequest,
    ApiResponse,
    Transport,
    API_KEY_HEADER,
    CONTENT_TYPE,
};
use crate::error::QueueItError;
use reqwest::{
    header,
    Client,
    Method,
};
use std::{
    fmt,
    future::Future,
    pin::Pin,
    time::Duration,
};
use url::Url;

/// [`Transport`] talking to the Queue-it API over HTTPS.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl HttpTransport {
    pub fn new(base_url: Url, api_key: impl Into<String>, request_timeout: Duration) -> Result<Self, QueueItError> {
        if base_url.cannot_be_a_base() {
            return Err(QueueItError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(request.path_segments());
        }
        let query = request.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    fn request(&self, request: &ApiRequest) -> Result<reqwest::Request, QueueItError> {
        let method = if request.is_post() { Method::POST } else { Method::GET };

        let mut builder = self
            .client
            .request(method, self.url_for(request))
            .header(API_KEY_HEADER, &self.api_key)
            .header(header::CONTENT_TYPE, CONTENT_TYPE);
        if let Some(body) = request.body().map_err(QueueItError::Encode)? {
            builder = builder.body(body);
        }

        Ok(builder.build()?)
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, QueueItError> {
        let http_request = self.request(&request)?;
        trace!(method = %http_request.method(), path = %request.path(), "sending Queue-it request");

        let response = self.client.execute(http_request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(ApiResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> Pin<Box<dyn Future<Output = Result<ApiResponse, QueueItError>> + Send + '_>> {
        Box::pin(self.execute(request))
    }
}
