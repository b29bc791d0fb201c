//! Collaborator interfaces: the query execution service and the id resolver.

use std::future::Future;

// ─── Results ─────────────────────────────────────────────────────────────────

/// A tabular query result. Unbound cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
  rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
  pub fn new(rows: Vec<Vec<Option<String>>>) -> Self { Self { rows } }

  /// Build a result from fully bound rows.
  pub fn from_strings<R, S>(rows: impl IntoIterator<Item = R>) -> Self
  where
    R: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      rows: rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| Some(v.into())).collect())
        .collect(),
    }
  }

  pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
    self.rows.iter().map(|values| Row { values })
  }

  pub fn first(&self) -> Option<Row<'_>> { self.rows().next() }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

/// One result row with typed accessors.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
  values: &'a [Option<String>],
}

impl<'a> Row<'a> {
  pub fn column_count(&self) -> usize { self.values.len() }

  /// The raw cell; `None` when unbound or past the last column.
  pub fn value(&self, column: usize) -> Option<&'a str> {
    self.values.get(column).and_then(Option::as_deref)
  }

  /// The cell as a string; empty when unbound.
  pub fn string_value(&self, column: usize) -> &'a str {
    self.value(column).unwrap_or_default()
  }

  pub fn uint_value(&self, column: usize) -> Option<u32> {
    self.value(column).and_then(|v| v.trim().parse().ok())
  }

  /// The cell as an IRI; `None` when unbound or empty.
  pub fn url_value(&self, column: usize) -> Option<&'a str> {
    self.value(column).filter(|v| !v.is_empty())
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Executes query strings against the triple store.
///
/// A call may block until the store answers; timeouts are the service's
/// business.
pub trait QueryService: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn select<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<QueryResult, Self::Error>> + Send + 'a;
}

/// Maps resource IRIs to the store's numeric ids.
pub trait IdResolver: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// One entry per input IRI, `None` for IRIs the store does not know.
  fn resolve_ids<'a>(
    &'a self,
    iris: &'a [String],
  ) -> impl Future<Output = Result<Vec<Option<u32>>, Self::Error>> + Send + 'a;
}
