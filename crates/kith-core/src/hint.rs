//! Fetch hints: what the caller actually wants back.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchHint {
  /// Wanted detail names. Empty means every detail.
  pub detail_names:       Vec<String>,
  /// Wanted relationship types. Empty means every type.
  pub relationship_types: Vec<String>,
  /// Skip relationship decoding altogether.
  pub no_relationships:   bool,
  /// Upper bound on the number of contacts returned.
  pub max_count:          Option<usize>,
}

impl FetchHint {
  pub fn details<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      detail_names: names.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  pub fn with_max_count(mut self, max_count: usize) -> Self {
    self.max_count = Some(max_count);
    self
  }

  pub fn without_relationships(mut self) -> Self {
    self.no_relationships = true;
    self
  }

  /// `true` when relationships of `relationship_type` should be fetched.
  pub fn wants_relationship(&self, relationship_type: &str) -> bool {
    !self.no_relationships
      && (self.relationship_types.is_empty()
        || self.relationship_types.iter().any(|t| t == relationship_type))
  }
}
