//! Fluent SoQL query builder.
//!
//! Every chain method borrows the builder and returns a new one with a
//! single parameter set or replaced, so a builder can be shared, cloned and
//! reused as the base of several queries:
//!
//! ```rust,ignore
//! let films = client.query_dataset("wwmu-gmzc").order_ascending("title");
//! let recent = films.filter("release_year > 2000");
//! let page_two = films.limit(50).offset(50);
//! ```
//!
//! Arguments are passed through untouched. Quoting string literals inside
//! `filter` expressions is the caller's job, and `filter_column` with a `$`
//! key replaces the matching SoQL parameter.

use crate::client::DatasetClient;
use crate::error::Result;
use crate::params::{self, Parameters};
use crate::types::{DatasetResult, RowResult};
use tokio::task::JoinHandle;
use url::Url;

/// Immutable query against one dataset.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    client: DatasetClient,
    dataset: String,
    parameters: Parameters,
}

impl QueryBuilder {
    pub(crate) fn new(client: DatasetClient, dataset: String) -> Self {
        Self {
            client,
            dataset,
            parameters: Parameters::new(),
        }
    }

    fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            dataset: self.dataset.clone(),
            parameters: self.parameters.with(key, value),
        }
    }

    /// `$select`. Use `AS` to rename output columns.
    #[must_use]
    pub fn select(&self, select: impl Into<String>) -> Self {
        self.with(params::SELECT, select)
    }

    /// `$where`. Strings inside the expression must be single-quoted.
    #[must_use]
    pub fn filter(&self, filter: impl Into<String>) -> Self {
        self.with(params::WHERE, filter)
    }

    /// Simple `column=value` equality filter. Several may be combined.
    #[must_use]
    pub fn filter_column(&self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(column, value)
    }

    /// `$q`, multi-column full text search.
    #[must_use]
    pub fn full_text(&self, text: impl Into<String>) -> Self {
        self.with(params::FULL_TEXT, text)
    }

    #[must_use]
    pub fn order_ascending(&self, column: impl AsRef<str>) -> Self {
        self.with(params::ORDER, format!("{} ASC", column.as_ref()))
    }

    #[must_use]
    pub fn order_descending(&self, column: impl AsRef<str>) -> Self {
        self.with(params::ORDER, format!("{} DESC", column.as_ref()))
    }

    /// `$group`. Pair with an aggregate in [`select`](Self::select).
    #[must_use]
    pub fn group(&self, column: impl Into<String>) -> Self {
        self.with(params::GROUP, column)
    }

    /// `$limit`. The server default is 1000.
    #[must_use]
    pub fn limit(&self, limit: i64) -> Self {
        self.with(params::LIMIT, limit.to_string())
    }

    #[must_use]
    pub fn offset(&self, offset: i64) -> Self {
        self.with(params::OFFSET, offset.to_string())
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn client(&self) -> &DatasetClient {
        &self.client
    }

    /// The URL this query will request.
    pub fn url(&self) -> Result<Url> {
        self.client.dataset_url(&self.dataset, &self.parameters)
    }

    /// Run the query and wait for the classified result.
    pub async fn fetch(&self) -> DatasetResult {
        self.client
            .fetch_dataset(&self.dataset, &self.parameters)
            .await
    }

    /// Run the query in the background and pass the result to `callback`.
    pub fn get<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(DatasetResult) + Send + 'static,
    {
        self.client
            .get_dataset(self.dataset.clone(), self.parameters.clone(), callback)
    }

    /// Run the query in the background and pass each row to `iterator`.
    ///
    /// Rows arrive in response order, in one burst once the whole response
    /// is decoded. On failure `iterator` is called once with the error.
    pub fn each<F>(&self, mut iterator: F) -> JoinHandle<()>
    where
        F: FnMut(RowResult) + Send + 'static,
    {
        self.get(move |result| match result {
            Ok(rows) => {
                for row in rows {
                    iterator(Ok(row));
                }
            }
            Err(err) => iterator(Err(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use proptest::prelude::*;

    fn test_client() -> DatasetClient {
        let config = ClientConfig::builder("data.sfgov.org", "token")
            .build()
            .unwrap();
        DatasetClient::new(config).unwrap()
    }

    #[test]
    fn test_query_starts_empty() {
        let query = test_client().query_dataset("wwmu-gmzc");

        assert_eq!(query.dataset(), "wwmu-gmzc");
        assert!(query.parameters().is_empty());
        assert_eq!(query.client().domain(), "data.sfgov.org");
    }

    #[test]
    fn test_chain_sets_soql_parameters() {
        let query = test_client()
            .query_dataset("wwmu-gmzc")
            .select("title, locations")
            .filter("release_year > 1990")
            .full_text("bridge")
            .group("title")
            .limit(25)
            .offset(50)
            .filter_column("director", "Alfred Hitchcock");

        let p = query.parameters();
        assert_eq!(p.get("$select"), Some("title, locations"));
        assert_eq!(p.get("$where"), Some("release_year > 1990"));
        assert_eq!(p.get("$q"), Some("bridge"));
        assert_eq!(p.get("$group"), Some("title"));
        assert_eq!(p.get("$limit"), Some("25"));
        assert_eq!(p.get("$offset"), Some("50"));
        assert_eq!(p.get("director"), Some("Alfred Hitchcock"));
        assert_eq!(p.len(), 7);
    }

    #[test]
    fn test_chain_does_not_touch_receiver() {
        let base = test_client().query_dataset("wwmu-gmzc").limit(10);
        let derived = base.filter("title = 'Vertigo'");

        assert_eq!(base.parameters().len(), 1);
        assert_eq!(base.parameters().get("$where"), None);
        assert_eq!(derived.parameters().len(), 2);
    }

    #[test]
    fn test_last_order_wins() {
        let query = test_client()
            .query_dataset("wwmu-gmzc")
            .order_ascending("title")
            .order_descending("release_year");

        assert_eq!(query.parameters().get("$order"), Some("release_year DESC"));
        assert_eq!(query.parameters().len(), 1);
    }

    #[test]
    fn test_filter_column_overwrites_reserved_key() {
        let query = test_client()
            .query_dataset("wwmu-gmzc")
            .filter("a = 1")
            .filter_column("$where", "b = 2");

        assert_eq!(query.parameters().get("$where"), Some("b = 2"));
    }

    #[test]
    fn test_limit_passes_through_non_positive() {
        let query = test_client().query_dataset("wwmu-gmzc").limit(-1).offset(0);

        assert_eq!(query.parameters().get("$limit"), Some("-1"));
        assert_eq!(query.parameters().get("$offset"), Some("0"));
    }

    #[test]
    fn test_url() {
        let url = test_client()
            .query_dataset("wwmu-gmzc")
            .order_ascending("title")
            .url()
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://data.sfgov.org/resource/wwmu-gmzc.json?%24order=title%20ASC"
        );
    }

    #[derive(Debug, Clone)]
    enum Step {
        Select(String),
        Filter(String),
        Column(String, String),
        FullText(String),
        Ascending(String),
        Descending(String),
        Group(String),
        Limit(i64),
        Offset(i64),
    }

    impl Step {
        fn apply(&self, query: &QueryBuilder) -> (QueryBuilder, String, String) {
            match self {
                Step::Select(s) => (query.select(s.as_str()), "$select".into(), s.clone()),
                Step::Filter(s) => (query.filter(s.as_str()), "$where".into(), s.clone()),
                Step::Column(k, v) => (query.filter_column(k.as_str(), v.as_str()), k.clone(), v.clone()),
                Step::FullText(s) => (query.full_text(s.as_str()), "$q".into(), s.clone()),
                Step::Ascending(c) => (query.order_ascending(c), "$order".into(), format!("{} ASC", c)),
                Step::Descending(c) => (query.order_descending(c), "$order".into(), format!("{} DESC", c)),
                Step::Group(s) => (query.group(s.as_str()), "$group".into(), s.clone()),
                Step::Limit(n) => (query.limit(*n), "$limit".into(), n.to_string()),
                Step::Offset(n) => (query.offset(*n), "$offset".into(), n.to_string()),
            }
        }
    }

    fn step() -> impl Strategy<Value = Step> {
        let text = "[a-z ]{0,8}";
        prop_oneof![
            text.prop_map(Step::Select),
            text.prop_map(Step::Filter),
            ("[a-z$]{1,6}", text).prop_map(|(k, v)| Step::Column(k, v)),
            text.prop_map(Step::FullText),
            text.prop_map(Step::Ascending),
            text.prop_map(Step::Descending),
            text.prop_map(Step::Group),
            any::<i64>().prop_map(Step::Limit),
            any::<i64>().prop_map(Step::Offset),
        ]
    }

    proptest! {
        #[test]
        fn prop_each_step_changes_exactly_one_key(steps in proptest::collection::vec(step(), 0..12)) {
            let mut query = test_client().query_dataset("wwmu-gmzc");
            for step in &steps {
                let before = query.parameters().clone();
                let (next, key, value) = step.apply(&query);

                prop_assert_eq!(query.parameters(), &before);
                prop_assert_eq!(next.parameters(), &before.with(key, value));
                query = next;
            }
        }
    }
}
