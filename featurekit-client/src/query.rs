//! Download query options.

use crate::client::pair;
use crate::protocol::SpatialFilter;

/// Which records to download and how.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) where_clause: String,
    pub(crate) spatial_filter: Option<SpatialFilter>,
    pub(crate) keep_querying: bool,
    pub(crate) degree_of_parallelism: Option<usize>,
    pub(crate) extra_params: Vec<(String, String)>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            where_clause: "1=1".to_string(),
            spatial_filter: None,
            keep_querying: false,
            degree_of_parallelism: None,
            extra_params: Vec::new(),
        }
    }
}

impl Query {
    /// Matches every record; one page only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = clause.into();
        self
    }

    pub fn spatial_filter(mut self, filter: SpatialFilter) -> Self {
        self.spatial_filter = Some(filter);
        self
    }

    /// Keeps fetching past the server's page size until every matching
    /// record has been returned.
    pub fn keep_querying(mut self, keep: bool) -> Self {
        self.keep_querying = keep;
        self
    }

    /// Maximum concurrent batch fetches while paging. Values below 1 count as 1.
    pub fn degree_of_parallelism(mut self, dop: usize) -> Self {
        self.degree_of_parallelism = Some(dop);
        self
    }

    /// Adds a raw protocol parameter.
    pub fn extra_param(mut self, key: &str, value: impl ToString) -> Self {
        self.extra_params.push(pair(key, value));
        self
    }

    pub(crate) fn parallelism_or(&self, default: usize) -> usize {
        self.degree_of_parallelism.unwrap_or(default).max(1)
    }

    /// Spatial filter and extra parameters, as sent with every query.
    pub(crate) fn filter_params(&self) -> Vec<(String, String)> {
        let mut params = self
            .spatial_filter
            .as_ref()
            .map(SpatialFilter::params)
            .unwrap_or_default();
        params.extend(self.extra_params.iter().cloned());
        params
    }
}
