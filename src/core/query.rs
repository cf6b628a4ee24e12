//! Query parameters and pagination utilities

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts, Query};
use axum::http::{Uri, request::Parts};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_PER_PAGE: usize = 10;
pub const DEFAULT_MAX_PER_PAGE: usize = 100;

/// Query parameters for pagination, filtering and sorting
///
/// Every parameter is kept as raw text so that a malformed value never
/// rejects the request: anything that is not a positive integer falls back
/// to the default. As an extractor it never fails; a repeated key keeps its
/// first value.
///
/// # Example
/// ```rust,ignore
/// // In handler:
/// pub async fn list_mechanics(params: QueryParams) -> Json<Page<Mechanic>> {
///     // params.page() defaults to 1
///     // params.per_page() defaults to 10, capped at the configured maximum
/// }
///
/// // Usage:
/// GET /api/mechanics?page=2&per_page=5
/// GET /api/mechanics?filter={"specialty": "Brakes"}
/// GET /api/mechanics?sort=name:desc
/// ```
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// Page number (starts at 1)
    pub page: Option<String>,

    /// Number of items per page
    pub per_page: Option<String>,

    /// Exact-match filters as a JSON object
    ///
    /// ```text
    /// filter={"specialty": "Brakes", "email": "m1@shop.com"}
    /// ```
    pub filter: Option<String>,

    /// Sort field and direction (`field`, `field:asc` or `field:desc`)
    pub sort: Option<String>,

    /// Upper bound for `per_page`
    pub max_per_page: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: None,
            per_page: None,
            filter: None,
            sort: None,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }
}

/// The configured `per_page` ceiling, read from the router state
#[derive(Debug, Clone, Copy)]
pub struct PageLimit(pub usize);

/// Decode a query string, keeping the first value of each key
///
/// Undecodable input yields no values rather than an error.
pub fn first_values(uri: &Uri) -> HashMap<String, String> {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();

    let mut values = HashMap::new();
    for (key, value) in pairs {
        values.entry(key).or_insert(value);
    }
    values
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
    PageLimit: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut values = first_values(&parts.uri);
        Ok(Self {
            page: values.remove("page"),
            per_page: values.remove("per_page"),
            filter: values.remove("filter"),
            sort: values.remove("sort"),
            max_per_page: PageLimit::from_ref(state).0,
        })
    }
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

impl QueryParams {
    /// Build params for a given page and page size
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: Some(page.to_string()),
            per_page: Some(per_page.to_string()),
            ..Default::default()
        }
    }

    /// Get page number, falling back to 1
    pub fn page(&self) -> usize {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    /// Get page size, falling back to 10 and capped at `max_per_page`
    pub fn per_page(&self) -> usize {
        positive_or(self.per_page.as_deref(), DEFAULT_PER_PAGE).min(self.max_per_page.max(1))
    }

    /// Parse the filter into field/value pairs
    ///
    /// Malformed JSON or a non-object filter is ignored.
    pub fn filters(&self) -> Vec<(String, String)> {
        let Some(Value::Object(map)) = self
            .filter
            .as_ref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
        else {
            return Vec::new();
        };

        map.into_iter()
            .map(|(field, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (field, value)
            })
            .collect()
    }

    /// Copy of these params with one more exact-match filter
    ///
    /// Used to scope a listing to the caller, e.g. a customer's own tickets.
    pub fn with_filter(&self, field: &str, value: &str) -> Self {
        let mut map = match self
            .filter
            .as_ref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
        {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(field.to_string(), Value::String(value.to_string()));

        Self {
            filter: Some(Value::Object(map).to_string()),
            ..self.clone()
        }
    }

    /// Parse the sort parameter into a field name and a descending flag
    pub fn sort_order(&self) -> Option<SortOrder> {
        let raw = self.sort.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let (field, descending) = match raw.split_once(':') {
            Some((field, dir)) => (field, dir.eq_ignore_ascii_case("desc")),
            None => (raw, false),
        };
        Some(SortOrder {
            field: field.to_string(),
            descending,
        })
    }
}

/// A parsed `sort` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub descending: bool,
}

/// One page of a list result, plus metadata about the whole set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Number of items in the full (filtered) result set
    pub total: usize,

    /// Total number of pages
    pub pages: usize,

    /// The page that was served
    pub current_page: usize,
}

impl<T> Page<T> {
    /// Convert every item, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pages: self.pages,
            current_page: self.current_page,
        }
    }
}

/// Slice an ordered result set into the requested page
///
/// A page beyond the last one yields no items but still reports the totals.
pub fn paginate<T>(items: Vec<T>, params: &QueryParams) -> Page<T> {
    let page = params.page();
    let per_page = params.per_page();
    let total = items.len();
    let pages = total.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);

    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        total,
        pages,
        current_page: page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: &str, per_page: &str) -> QueryParams {
        QueryParams {
            page: Some(page.to_string()),
            per_page: Some(per_page.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_params_defaults() {
        let params = QueryParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 10);
    }

    #[test]
    fn test_malformed_params_fall_back() {
        for (page, per_page) in [("0", "0"), ("-3", "-1"), ("abc", "ten"), ("", "1.5")] {
            let p = params(page, per_page);
            assert_eq!(p.page(), 1, "page={page}");
            assert_eq!(p.per_page(), 10, "per_page={per_page}");
        }
    }

    #[test]
    fn test_per_page_is_capped() {
        assert_eq!(params("1", "1000000000").per_page(), DEFAULT_MAX_PER_PAGE);
        let small = QueryParams {
            max_per_page: 5,
            ..params("1", "50")
        };
        assert_eq!(small.per_page(), 5);
    }

    #[test]
    fn test_first_values_keeps_first_occurrence() {
        let uri: Uri = "/mechanics?page=1&page=2&per_page=x&sort=name"
            .parse()
            .unwrap();
        let values = first_values(&uri);
        assert_eq!(values.get("page").map(String::as_str), Some("1"));
        assert_eq!(values.get("per_page").map(String::as_str), Some("x"));
        assert_eq!(values.get("sort").map(String::as_str), Some("name"));

        let bare: Uri = "/mechanics".parse().unwrap();
        assert!(first_values(&bare).is_empty());
    }

    #[tokio::test]
    async fn test_extractor_never_rejects() {
        let request = axum::http::Request::get("/mechanics?page=1&page=2&per_page=500&filter=%7B")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let Ok(params) = QueryParams::from_request_parts(&mut parts, &PageLimit(20)).await;

        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 20);
        assert!(params.filters().is_empty());
    }

    #[test]
    fn test_paginate_slices() {
        let items: Vec<u32> = (1..=25).collect();
        let page = paginate(items, &params("2", "10"));
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 2);
    }

    #[test]
    fn test_paginate_beyond_last_page() {
        let items: Vec<u32> = (1..=7).collect();
        let page = paginate(items, &params("4", "3"));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 7);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 4);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), &QueryParams::default());
        assert_eq!(page.total, 0);
        assert_eq!(page.pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_filters_and_sort() {
        let p = QueryParams {
            filter: Some(r#"{"specialty": "Brakes", "salary": 50000}"#.to_string()),
            sort: Some("name:desc".to_string()),
            ..Default::default()
        };
        let mut filters = p.filters();
        filters.sort();
        assert_eq!(
            filters,
            vec![
                ("salary".to_string(), "50000".to_string()),
                ("specialty".to_string(), "Brakes".to_string()),
            ]
        );
        assert_eq!(
            p.sort_order(),
            Some(SortOrder {
                field: "name".to_string(),
                descending: true
            })
        );

        let scoped = p.with_filter("specialty", "Engines");
        assert!(scoped
            .filters()
            .contains(&("specialty".to_string(), "Engines".to_string())));
        assert_eq!(scoped.filters().len(), 2);

        let broken = QueryParams {
            filter: Some("{not json".to_string()),
            ..Default::default()
        };
        assert!(broken.filters().is_empty());
        assert!(broken.sort_order().is_none());
    }
}
