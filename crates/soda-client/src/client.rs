//! Dataset client: request construction, execution and callback delivery.

use crate::classify::classify_response;
use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, InlineDispatcher};
use crate::error::{Result, SodaError};
use crate::params::{self, Parameters};
use crate::query::QueryBuilder;
use crate::transport::{request_headers, DatasetRequest, HttpTransport, Transport};
use crate::types::{DatasetResult, Page, RowResult};
use reqwest::header::HeaderMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use url::Url;

/// Client for one SODA domain.
///
/// Cloning is cheap and clones share the same transport. A client never
/// changes after construction, so it can be used from any number of tasks
/// at once.
#[derive(Clone)]
pub struct DatasetClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl DatasetClient {
    /// Create a client that talks HTTP through `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::from_validated(config, Arc::new(transport))
    }

    /// Create a client on top of a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Self::from_validated(config, transport)
    }

    fn from_validated(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let headers = request_headers(&config.app_token)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                headers,
                transport,
                dispatcher: Arc::new(InlineDispatcher),
            }),
        })
    }

    /// A copy of this client whose callbacks run through `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config: self.inner.config.clone(),
                headers: self.inner.headers.clone(),
                transport: self.inner.transport.clone(),
                dispatcher,
            }),
        }
    }

    pub fn domain(&self) -> &str {
        &self.inner.config.domain
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Start a fluent query against `dataset` with no parameters set.
    pub fn query_dataset(&self, dataset: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(self.clone(), dataset.into())
    }

    /// URL for `dataset` with `params` as its query string.
    ///
    /// A dataset starting with `/` is taken as the full path; anything else
    /// is escaped as a single segment of `/resource/<dataset>.json`.
    pub fn dataset_url(&self, dataset: &str, params: &Parameters) -> Result<Url> {
        let path = if dataset.starts_with('/') {
            dataset.to_string()
        } else {
            format!("/resource/{}.json", urlencoding::encode(dataset))
        };
        self.url_for(&path, params)
    }

    /// URL of one row: `/resource/<dataset>/<row_id>.json`, each id escaped.
    pub fn row_url(&self, row_id: &str, dataset: &str) -> Result<Url> {
        let path = if dataset.starts_with('/') {
            format!("{}/{}", dataset, urlencoding::encode(row_id))
        } else {
            format!(
                "/resource/{}/{}.json",
                urlencoding::encode(dataset),
                urlencoding::encode(row_id)
            )
        };
        self.url_for(&path, &Parameters::new())
    }

    fn url_for(&self, path: &str, params: &Parameters) -> Result<Url> {
        let mut url = format!("{}{}", self.inner.config.origin(), path);
        let query = params.to_query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        Url::parse(&url).map_err(|e| SodaError::InvalidUrl(format!("{}: {}", url, e)))
    }

    // =========================================================================
    // Awaitable fetches
    // =========================================================================

    /// Fetch `dataset` with a raw parameter set and classify the response.
    pub async fn fetch_dataset(&self, dataset: &str, params: &Parameters) -> DatasetResult {
        let url = self.dataset_url(dataset, params)?;
        self.fetch_url(dataset, url).await
    }

    async fn fetch_url(&self, dataset: &str, url: Url) -> DatasetResult {
        let start = Instant::now();

        tracing::debug!(dataset = %dataset, url = %url, "Sending request");

        let request = DatasetRequest {
            url,
            headers: self.inner.headers.clone(),
        };

        let response = match self.inner.transport.get(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    dataset = %dataset,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %err,
                    "Request failed"
                );
                return Err(err);
            }
        };

        tracing::debug!(
            dataset = %dataset,
            status = %response.status,
            bytes = response.body.len(),
            duration_ms = %start.elapsed().as_millis(),
            "Received response"
        );

        let result = classify_response(&response);
        match &result {
            Ok(rows) => tracing::debug!(dataset = %dataset, rows = rows.len(), "Dataset decoded"),
            Err(err) => tracing::warn!(
                dataset = %dataset,
                status = %response.status,
                domain = %err.domain(),
                error = %err,
                "Request failed"
            ),
        }
        result
    }

    /// Fetch `dataset` filtered by column equality, one page at a time.
    pub async fn fetch_dataset_with_filters(
        &self,
        dataset: &str,
        filters: Parameters,
        page: Page,
    ) -> DatasetResult {
        let params = paged(filters, page);
        self.fetch_dataset(dataset, &params).await
    }

    /// Fetch a single row by its identifier.
    ///
    /// An empty response is reported as [`SodaError::RowNotFound`].
    pub async fn fetch_row(&self, row_id: &str, dataset: &str) -> RowResult {
        let url = self.row_url(row_id, dataset)?;
        let rows = self.fetch_url(dataset, url).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SodaError::RowNotFound {
                dataset: dataset.to_string(),
                row_id: row_id.to_string(),
            })
    }

    // =========================================================================
    // Callback fetches
    // =========================================================================
    //
    // These return immediately. The request runs on the current Tokio runtime
    // and the callback is invoked exactly once through the client's dispatcher.
    // They panic if called outside a Tokio runtime, like `tokio::spawn`.

    /// Low-level callback fetch with a raw parameter set.
    pub fn get_dataset<F>(
        &self,
        dataset: impl Into<String>,
        params: Parameters,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(DatasetResult) + Send + 'static,
    {
        let client = self.clone();
        let dataset = dataset.into();
        self.spawn_delivery(
            async move { client.fetch_dataset(&dataset, &params).await },
            callback,
        )
    }

    /// Callback form of [`fetch_dataset_with_filters`](Self::fetch_dataset_with_filters).
    pub fn get_dataset_with_filters<F>(
        &self,
        dataset: impl Into<String>,
        filters: Parameters,
        page: Page,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(DatasetResult) + Send + 'static,
    {
        self.get_dataset(dataset, paged(filters, page), callback)
    }

    /// Callback form of [`fetch_row`](Self::fetch_row).
    pub fn get_row<F>(
        &self,
        row_id: impl Into<String>,
        dataset: impl Into<String>,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(RowResult) + Send + 'static,
    {
        let client = self.clone();
        let row_id = row_id.into();
        let dataset = dataset.into();
        self.spawn_delivery(
            async move { client.fetch_row(&row_id, &dataset).await },
            callback,
        )
    }

    fn spawn_delivery<T, Fut, F>(&self, fetch: Fut, callback: F) -> JoinHandle<()>
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let dispatcher = self.inner.dispatcher.clone();
        tokio::spawn(async move {
            let result = fetch.await;
            dispatcher.dispatch(Box::new(move || callback(result)));
        })
    }
}

/// `filters` plus `$limit`/`$offset` from `page`.
fn paged(mut filters: Parameters, page: Page) -> Parameters {
    filters.insert(params::LIMIT, page.limit.to_string());
    filters.insert(params::OFFSET, page.offset.to_string());
    filters
}

impl fmt::Debug for DatasetClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
