//! Fluent query builder for one table round trip.
//!
//! Filters accumulate as query-string pairs in the PostgREST dialect
//! (`id=eq.7`, `or=(a.eq.1,b.eq.2)`, `expression=ilike.*sin*`). Row windows
//! travel as `Range` headers and exact totals come back in `Content-Range`.

use reqwest::header::{self, HeaderMap};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use super::{StorageClient, StorageError};

/// Rows returned by a select, plus the total row count when the backend
/// reported one.
#[derive(Debug)]
pub struct RowSet {
    /// Decoded rows within the requested window.
    pub rows: Vec<Value>,
    /// Exact total across the whole filtered table, when requested.
    pub total: Option<u64>,
}

/// Builder for a single query against one table.
#[must_use]
pub struct QueryBuilder<'a> {
    client: &'a StorageClient,
    table: &'static str,
    columns: &'static str,
    filters: Vec<(String, String)>,
    window: Option<(u64, u64)>,
    count_exact: bool,
}

impl<'a> QueryBuilder<'a> {
    pub(super) fn new(client: &'a StorageClient, table: &'static str) -> Self {
        Self {
            client,
            table,
            columns: "*",
            filters: Vec::new(),
            window: None,
            count_exact: false,
        }
    }

    /// Restrict the selected columns (supports embedded joins such as
    /// `role_id,roles(name)`).
    pub fn columns(mut self, columns: &'static str) -> Self {
        self.columns = columns;
        self
    }

    /// Exact-match filter on one column.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// `column >= value` filter.
    pub fn gte(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_owned(), format!("gte.{value}")));
        self
    }

    /// `column <= value` filter.
    pub fn lte(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_owned(), format!("lte.{value}")));
        self
    }

    /// Case-insensitive substring match on one column.
    pub fn ilike_contains(mut self, column: &str, needle: &str) -> Self {
        self.filters
            .push((column.to_owned(), format!("ilike.*{needle}*")));
        self
    }

    /// Disjunction of exact matches: any listed column equals `value`.
    pub fn or_eq(mut self, columns: &[&str], value: &str) -> Self {
        let clauses = columns
            .iter()
            .map(|column| format!("{column}.eq.{value}"))
            .collect::<Vec<_>>()
            .join(",");
        self.filters.push(("or".to_owned(), format!("({clauses})")));
        self
    }

    /// Disjunction of substring matches: any listed column contains
    /// `needle`, case-insensitively.
    pub fn or_ilike_contains(mut self, columns: &[&str], needle: &str) -> Self {
        let clauses = columns
            .iter()
            .map(|column| format!("{column}.ilike.*{needle}*"))
            .collect::<Vec<_>>()
            .join(",");
        self.filters.push(("or".to_owned(), format!("({clauses})")));
        self
    }

    /// Inclusive `[start, end]` row window.
    pub fn window(mut self, start: u64, end: u64) -> Self {
        self.window = Some((start, end));
        self
    }

    /// Ask the backend for an exact total alongside the rows.
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Fetch the matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on transport failure, a non-success status,
    /// or an undecodable body.
    pub async fn select(self) -> Result<RowSet, StorageError> {
        let mut pairs = vec![("select".to_owned(), self.columns.to_owned())];
        pairs.extend(self.filters.clone());
        let request = self.request(Method::GET)?.query(&pairs);
        let (headers, body) = execute(request).await?;
        Ok(RowSet {
            rows: decode_rows(&body)?,
            total: content_range_total(&headers),
        })
    }

    /// Fetch at most one matching row.
    ///
    /// Zero rows is `Ok(None)`; "not found" is the caller's policy call,
    /// never a storage error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on transport failure, a non-success status,
    /// or an undecodable body.
    pub async fn select_single(self) -> Result<Option<Value>, StorageError> {
        let mut pairs = vec![
            ("select".to_owned(), self.columns.to_owned()),
            ("limit".to_owned(), "1".to_owned()),
        ];
        pairs.extend(self.filters.clone());
        let request = self.request(Method::GET)?.query(&pairs);
        let (_, body) = execute(request).await?;
        Ok(decode_rows(&body)?.into_iter().next())
    }

    /// Count the matching rows without transferring them.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on transport failure, a non-success status,
    /// or a missing `Content-Range` header.
    pub async fn count(self) -> Result<u64, StorageError> {
        let mut pairs = vec![("select".to_owned(), self.columns.to_owned())];
        pairs.extend(self.filters.clone());
        let request = self
            .request(Method::HEAD)?
            .query(&pairs)
            .header("Prefer", "count=exact");
        let (headers, _) = execute(request).await?;
        content_range_total(&headers)
            .ok_or_else(|| StorageError::decode("count response is missing Content-Range"))
    }

    /// Insert one row and return the stored representation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on transport failure, a non-success status,
    /// or an undecodable body.
    pub async fn insert(self, row: Value) -> Result<Vec<Value>, StorageError> {
        let request = self
            .request(Method::POST)?
            .header("Prefer", "return=representation")
            .json(&row);
        let (_, body) = execute(request).await?;
        decode_rows(&body)
    }

    /// Apply a patch to every matching row and return the updated rows.
    ///
    /// An empty result means no row matched the filters.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on transport failure, a non-success status,
    /// or an undecodable body.
    pub async fn update(self, patch: Value) -> Result<Vec<Value>, StorageError> {
        let request = self
            .request(Method::PATCH)?
            .query(&self.filters)
            .header("Prefer", "return=representation")
            .json(&patch);
        let (_, body) = execute(request).await?;
        decode_rows(&body)
    }

    /// Delete every matching row. Deleting zero rows is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on transport failure or a non-success
    /// status.
    pub async fn delete(self) -> Result<(), StorageError> {
        let request = self.request(Method::DELETE)?.query(&self.filters);
        execute(request).await?;
        Ok(())
    }

    fn request(&self, method: Method) -> Result<RequestBuilder, StorageError> {
        let url = self.client.table_url(self.table)?;
        let mut request = self
            .client
            .http()
            .request(method, url)
            .header("apikey", self.client.key())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.client.key()),
            );
        if let Some(range) = self.range_header() {
            request = request.header("Range-Unit", "items").header("Range", range);
        }
        if self.count_exact {
            request = request.header("Prefer", "count=exact");
        }
        Ok(request)
    }

    fn range_header(&self) -> Option<String> {
        self.window.map(|(start, end)| format!("{start}-{end}"))
    }

    #[cfg(test)]
    fn filter_pairs(&self) -> &[(String, String)] {
        &self.filters
    }
}

async fn execute(request: RequestBuilder) -> Result<(HeaderMap, Vec<u8>), StorageError> {
    let response = request.send().await.map_err(StorageError::transport)?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(StorageError::transport)?;
    if !status.is_success() {
        return Err(backend_error(status, &body));
    }
    Ok((headers, body.to_vec()))
}

fn backend_error(status: StatusCode, body: &[u8]) -> StorageError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("storage responded with status {}", status.as_u16())
    } else {
        preview
    };
    StorageError::Backend {
        status: status.as_u16(),
        message,
    }
}

/// Decode a response body into rows. The backend answers plain selects with
/// a JSON array; a bare object (or `null` from a no-content reply) still
/// maps to something callers can use.
fn decode_rows(body: &[u8]) -> Result<Vec<Value>, StorageError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let decoded: Value = serde_json::from_slice(body)
        .map_err(|err| StorageError::decode(format!("invalid JSON row payload: {err}")))?;
    match decoded {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row @ Value::Object(_) => Ok(vec![row]),
        other => Err(StorageError::decode(format!(
            "expected a JSON array of rows, got {other}"
        ))),
    }
}

/// Extract the exact total from a `Content-Range` header such as `0-9/57`
/// or `*/57`. An unreported total (`0-9/*`) is `None`.
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(header::CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = raw.rsplit_once('/')?;
    total.parse().ok()
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 280;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
