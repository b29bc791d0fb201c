//! Memoised mapping between resource IRIs and the store's numeric ids.
//!
//! The cache is owned by the engine and handed by reference to the filter
//! translator (which binds instance values to ids) and to the decoder (which
//! maps id lists back to classes and instances).

use std::collections::HashMap;

use oxrdf::NamedNode;

use crate::{
  Error, Result,
  service::IdResolver,
};

#[derive(Debug, Clone, Default)]
pub struct ResourceCache {
  ids:  HashMap<String, u32>,
  iris: HashMap<u32, String>,
}

impl ResourceCache {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, iri: impl Into<String>, id: u32) {
    let iri = iri.into();
    if let Some(previous) = self.ids.insert(iri.clone(), id) {
      self.iris.remove(&previous);
    }
    self.iris.insert(id, iri);
  }

  pub fn id(&self, iri: &str) -> Option<u32> { self.ids.get(iri).copied() }

  pub fn iri(&self, id: u32) -> Option<&str> { self.iris.get(&id).map(String::as_str) }

  pub fn len(&self) -> usize { self.ids.len() }

  pub fn is_empty(&self) -> bool { self.ids.is_empty() }

  /// Forget every mapping. The next [`ResourceCache::resolve`] refetches.
  pub fn clear(&mut self) {
    self.ids.clear();
    self.iris.clear();
  }

  /// Ask `resolver` for every IRI not cached yet. IRIs unknown to the store
  /// stay unmapped.
  pub async fn resolve<R: IdResolver>(
    &mut self,
    resolver: &R,
    iris: &[NamedNode],
  ) -> Result<()> {
    let missing: Vec<String> = iris
      .iter()
      .map(|iri| iri.as_str())
      .filter(|iri| !self.ids.contains_key(*iri))
      .map(str::to_owned)
      .collect();

    if missing.is_empty() {
      return Ok(());
    }

    let ids = resolver
      .resolve_ids(&missing)
      .await
      .map_err(|e| Error::Resolution(Box::new(e)))?;

    for (iri, id) in missing.into_iter().zip(ids) {
      match id {
        Some(id) => self.insert(iri, id),
        None => tracing::debug!(%iri, "resource unknown to the store"),
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_both_directions_and_clears() {
    let mut cache = ResourceCache::new();
    cache.insert("urn:a", 1);
    cache.insert("urn:b", 2);
    assert_eq!(cache.id("urn:a"), Some(1));
    assert_eq!(cache.iri(2), Some("urn:b"));

    // Re-mapping an IRI drops the stale reverse entry.
    cache.insert("urn:a", 3);
    assert_eq!(cache.iri(1), None);
    assert_eq!(cache.iri(3), Some("urn:a"));

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.id("urn:b"), None);
  }
}
